//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{OptionId, QuestionError, QuestionId};

/// Errors emitted by the remote quiz API client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizApiError {
    #[error("quiz api request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("quiz api returned an invalid payload: {0}")]
    InvalidPayload(String),
}

/// Errors emitted by the quiz session.
///
/// None of these are fatal: the worst case is that the user retries an action.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("could not load questions")]
    Load(#[source] QuizApiError),
    #[error("failed to submit quiz")]
    Submit(#[source] QuizApiError),
    #[error(transparent)]
    InvalidQuestion(#[from] QuestionError),
    #[error("cannot {action} while the session is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },
    #[error("the quiz has no questions")]
    NoQuestions,
    #[error("question {0} is not part of this quiz")]
    UnknownQuestion(QuestionId),
    #[error("option {option} does not belong to question {question}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
}

impl SessionError {
    /// Text shown to the user for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Load(_) | SessionError::InvalidQuestion(_) => {
                "Could not load questions".to_string()
            }
            SessionError::Submit(_) => "Failed to submit quiz. Please try again.".to_string(),
            other => other.to_string(),
        }
    }
}
