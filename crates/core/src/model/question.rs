use std::collections::HashSet;

use thiserror::Error;

use crate::model::{OptionId, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {question} repeats option {option}")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },
}

/// One selectable answer of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOption {
    id: OptionId,
    text: String,
}

impl QuizOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> OptionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A multiple-choice question as served by the question bank.
///
/// Immutable once built; option order is the order the server returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<QuizOption>,
}

impl Question {
    /// Build a question, checking that it has options and that option ids are unique.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::NoOptions` for an empty option list and
    /// `QuestionError::DuplicateOption` when two options share an id.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<QuizOption>,
    ) -> Result<Self, QuestionError> {
        if options.is_empty() {
            return Err(QuestionError::NoOptions(id));
        }

        let mut seen = HashSet::with_capacity(options.len());
        for option in &options {
            if !seen.insert(option.id()) {
                return Err(QuestionError::DuplicateOption {
                    question: id,
                    option: option.id(),
                });
            }
        }

        Ok(Self {
            id,
            text: text.into(),
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[QuizOption] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&QuizOption> {
        self.options.iter().find(|option| option.id() == id)
    }

    #[must_use]
    pub fn has_option(&self, id: OptionId) -> bool {
        self.option(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(id: u64, text: &str) -> QuizOption {
        QuizOption::new(OptionId::new(id), text)
    }

    #[test]
    fn builds_question_with_options() {
        let q = Question::new(
            QuestionId::new(1),
            "What does HTTP stand for?",
            vec![opt(10, "HyperText Transfer Protocol"), opt(11, "High Transfer")],
        )
        .unwrap();

        assert_eq!(q.options().len(), 2);
        assert!(q.has_option(OptionId::new(11)));
        assert!(!q.has_option(OptionId::new(12)));
        assert_eq!(q.option(OptionId::new(10)).unwrap().text(), "HyperText Transfer Protocol");
    }

    #[test]
    fn rejects_empty_options() {
        let err = Question::new(QuestionId::new(2), "Empty", Vec::new()).unwrap_err();
        assert_eq!(err, QuestionError::NoOptions(QuestionId::new(2)));
    }

    #[test]
    fn rejects_duplicate_option_ids() {
        let err = Question::new(QuestionId::new(3), "Dup", vec![opt(1, "a"), opt(1, "b")])
            .unwrap_err();
        assert!(matches!(err, QuestionError::DuplicateOption { .. }));
    }
}
