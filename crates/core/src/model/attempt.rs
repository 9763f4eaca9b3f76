use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{OptionId, QuestionId};
use crate::time::Clock;

/// Answers chosen so far, keyed by question.
pub type AnswerMap = BTreeMap<QuestionId, OptionId>;

/// Durable copy of an in-progress attempt.
///
/// Persisted as `{ answers, currentIndex, endTime }` with `endTime` in epoch
/// milliseconds. Every field is optional on read so a partially written or
/// older snapshot still restores whatever it does carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSnapshot {
    #[serde(default)]
    pub answers: AnswerMap,
    #[serde(default)]
    pub current_index: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
}

impl AttemptSnapshot {
    #[must_use]
    pub fn new(answers: AnswerMap, current_index: usize, deadline: DateTime<Utc>) -> Self {
        Self {
            answers,
            current_index: i64::try_from(current_index).ok(),
            end_time: Some(deadline.timestamp_millis()),
        }
    }

    /// The persisted deadline, if present and representable.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.end_time.and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Pick the deadline for a (possibly resumed) attempt.
///
/// A persisted deadline always wins, even when it already lies in the past:
/// an expired attempt stays expired. Only a missing deadline starts a fresh
/// window of `duration` on `clock`.
#[must_use]
pub fn resume_deadline(
    persisted: Option<DateTime<Utc>>,
    clock: &Clock,
    duration: Duration,
) -> DateTime<Utc> {
    persisted.unwrap_or_else(|| clock.deadline_after(duration))
}
