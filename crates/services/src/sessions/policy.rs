use std::time::Duration as StdDuration;

use chrono::Duration;

/// Length of one attempt, measured from its first start.
pub const DEFAULT_ATTEMPT_SECS: i64 = 5 * 60;
/// How often the countdown is polled.
pub const DEFAULT_TICK_MILLIS: u64 = 500;
/// Number of visibility violations that forces submission.
pub const DEFAULT_VIOLATION_LIMIT: u32 = 2;

/// Tunables for a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    pub attempt_duration: Duration,
    pub tick_interval: StdDuration,
    pub violation_limit: u32,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            attempt_duration: Duration::seconds(DEFAULT_ATTEMPT_SECS),
            tick_interval: StdDuration::from_millis(DEFAULT_TICK_MILLIS),
            violation_limit: DEFAULT_VIOLATION_LIMIT,
        }
    }
}

/// How the session reacts to the n-th visibility violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityDecision {
    Warn { remaining: u32 },
    ForceSubmit,
}

impl SessionPolicy {
    #[must_use]
    pub fn with_attempt_duration(mut self, duration: Duration) -> Self {
        self.attempt_duration = duration;
        self
    }

    #[must_use]
    pub fn with_tick_interval(mut self, interval: StdDuration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// A limit of zero is treated as one: the first violation submits.
    #[must_use]
    pub fn with_violation_limit(mut self, limit: u32) -> Self {
        self.violation_limit = limit.max(1);
        self
    }

    #[must_use]
    pub fn decide(&self, violations: u32) -> IntegrityDecision {
        if violations >= self.violation_limit {
            IntegrityDecision::ForceSubmit
        } else {
            IntegrityDecision::Warn {
                remaining: self.violation_limit - violations,
            }
        }
    }
}
