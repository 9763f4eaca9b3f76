use serde::{Deserialize, Serialize};

use crate::model::QuestionId;

/// Per-question verdict returned by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub question_text: String,
    pub is_correct: bool,
    #[serde(default)]
    pub correct_answer_text: String,
}

/// Final score for one attempt.
///
/// Field names follow the evaluator's wire format so the report can be stored
/// in the handoff slot exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub total_questions: u32,
    #[serde(rename = "correct_answers")]
    pub correct_count: u32,
    #[serde(rename = "wrong_answers")]
    pub wrong_count: u32,
    #[serde(rename = "score")]
    pub score_percent: f64,
    #[serde(default)]
    pub results: Vec<QuestionResult>,
}

impl ScoreReport {
    /// Questions the evaluator counted as neither correct nor wrong.
    #[must_use]
    pub fn unanswered_count(&self) -> u32 {
        self.total_questions
            .saturating_sub(self.correct_count)
            .saturating_sub(self.wrong_count)
    }
}
