use quiz_core::model::{AnswerMap, OptionId, Question, QuestionId};

use super::progress::NavigatorProgress;

/// Ordered question list, current position and chosen answers.
///
/// Every index-moving operation clamps to `[0, len - 1]` (or `0` when the
/// list is empty) instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionNavigator {
    questions: Vec<Question>,
    current: usize,
    answers: AnswerMap,
}

impl QuestionNavigator {
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            current: 0,
            answers: AnswerMap::new(),
        }
    }

    /// Restore answers and position from a persisted attempt.
    ///
    /// A negative or too large index is clamped onto the fetched question list.
    #[must_use]
    pub fn restored(questions: Vec<Question>, answers: AnswerMap, index: Option<i64>) -> Self {
        let mut navigator = Self::new(questions);
        navigator.answers = answers;
        if let Some(index) = index {
            let index = usize::try_from(index.max(0)).unwrap_or(usize::MAX);
            navigator.jump_to(index);
        }
        navigator
    }

    #[must_use]
    pub fn current(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|question| question.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn go_next(&mut self) {
        self.jump_to(self.current.saturating_add(1));
    }

    pub fn go_prev(&mut self) {
        self.jump_to(self.current.saturating_sub(1));
    }

    pub fn jump_to(&mut self, index: usize) {
        self.current = index.min(self.last_index());
    }

    /// Last write wins; recording the same pair twice is a no-op.
    pub fn record_answer(&mut self, question_id: QuestionId, option_id: OptionId) {
        self.answers.insert(question_id, option_id);
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<OptionId> {
        self.answers.get(&question_id).copied()
    }

    #[must_use]
    pub fn is_answered(&self, question_id: QuestionId) -> bool {
        self.answers.contains_key(&question_id)
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current >= self.last_index()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn progress(&self) -> NavigatorProgress {
        let answered = self
            .questions
            .iter()
            .filter(|question| self.is_answered(question.id()))
            .count();
        NavigatorProgress {
            total: self.questions.len(),
            answered,
            remaining: self.questions.len() - answered,
        }
    }

    fn last_index(&self) -> usize {
        self.questions.len().saturating_sub(1)
    }
}
