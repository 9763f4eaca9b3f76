use chrono::{DateTime, Utc};
use quiz_core::time::seconds_left;

/// Result of polling the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    /// Not started, stopped, or already expired.
    Idle,
    Running { remaining_secs: u64 },
    /// The deadline was reached on this tick. Reported once per `start`.
    Expired,
}

/// Wall-clock countdown towards an absolute deadline.
///
/// Remaining time is recomputed from `now` on every poll instead of being
/// decremented, so sleep, slow ticks and a deadline restored from storage are
/// all handled the same way. The deadline itself is decided by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountdownTimer {
    deadline: Option<DateTime<Utc>>,
    running: bool,
}

impl CountdownTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer. Calling `start` again replaces the deadline and re-arms
    /// expiry.
    pub fn start(&mut self, deadline: DateTime<Utc>) {
        self.deadline = Some(deadline);
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Whole seconds left, rounded up, never negative.
    #[must_use]
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.deadline
            .map_or(0, |deadline| seconds_left(deadline, now))
    }

    /// Poll the countdown. Reaching zero reports `Expired` once and stops the timer.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TimerTick {
        if !self.running {
            return TimerTick::Idle;
        }

        let remaining_secs = self.remaining_seconds(now);
        if remaining_secs == 0 {
            self.running = false;
            return TimerTick::Expired;
        }
        TimerTick::Running { remaining_secs }
    }
}
