use chrono::{DateTime, Duration, Utc};

/// Where the exam reads the current time from.
///
/// Deadlines are absolute instants and every tick compares them with
/// `now()`, so a frozen clock makes expiry deterministic in tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Frozen(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn frozen_at(at: DateTime<Utc>) -> Self {
        Self::Frozen(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Frozen(at) => *at,
        }
    }

    /// Move a frozen clock forward. The system clock cannot be moved.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Frozen(at) = self {
            *at += delta;
        }
    }

    /// Deadline of an attempt window of `duration` opened now.
    #[must_use]
    pub fn deadline_after(&self, duration: Duration) -> DateTime<Utc> {
        self.now() + duration
    }

    #[must_use]
    pub fn seconds_until(&self, deadline: DateTime<Utc>) -> u64 {
        seconds_left(deadline, self.now())
    }
}

/// Whole seconds from `now` to `deadline`, rounded up, zero once it has passed.
///
/// Rounding up keeps `00:00` off the screen until the deadline is actually reached.
#[must_use]
pub fn seconds_left(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    u64::try_from(millis).map_or(0, |millis| millis.div_ceil(1000))
}

/// 2023-11-14T22:13:20Z, the instant frozen test clocks start at.
pub const TEST_EPOCH_SECS: i64 = 1_700_000_000;

#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(TEST_EPOCH_SECS)
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::frozen_at(fixed_now())
}
