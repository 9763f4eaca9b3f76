#![forbid(unsafe_code)]

pub mod error;
pub mod quiz_api;
pub mod results;
pub mod routes;
pub mod session_store;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::{QuizApiError, SessionError};
pub use quiz_api::{HttpQuizApi, QuizApi, QuizApiConfig};
pub use results::ResultsService;
pub use routes::Route;
pub use session_store::SessionStore;

pub use sessions::{
    IntegrityMonitor, QuizSession, SessionCommand, SessionController, SessionEvent,
    SessionOutcome, SessionPolicy, SessionState, SessionView, VisibilityEvent,
};
