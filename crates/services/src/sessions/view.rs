use quiz_core::model::{OptionId, Question, QuizId};

use super::controller::SessionState;
use super::progress::NavigatorProgress;

/// Everything a view needs to draw the session, detached from the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub quiz_id: QuizId,
    pub state: SessionState,
    pub index: usize,
    pub total: usize,
    pub question: Option<Question>,
    pub selected: Option<OptionId>,
    /// One flag per question, in order: has it been answered.
    pub answered: Vec<bool>,
    pub progress: NavigatorProgress,
    pub remaining_secs: u64,
    pub violations: u32,
    pub violation_limit: u32,
    pub error: Option<String>,
    pub is_last: bool,
}

impl SessionView {
    /// Submit is only offered on the last question of a non-empty quiz.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.is_last && self.total > 0 && self.state == SessionState::InProgress
    }
}

/// Render whole seconds as `mm:ss`.
#[must_use]
pub fn format_clock(total_secs: u64) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
