mod attempt;
mod ids;
mod question;
mod score;

pub use attempt::{AnswerMap, AttemptSnapshot, resume_deadline};
pub use ids::{OptionId, ParseIdError, QuestionId, QuizId, SessionId};
pub use question::{Question, QuestionError, QuizOption};
pub use score::{QuestionResult, ScoreReport};
