mod controller;
mod integrity;
mod navigator;
mod policy;
mod progress;
mod runner;
mod timer;
mod view;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{
    Effect, Notice, SessionController, SessionState, SubmitRequest, SubmitTrigger, Termination,
};
pub use integrity::{
    IntegrityMonitor, IntegritySignal, UNLOAD_PROMPT, VisibilityEvent, VisibilitySource,
};
pub use navigator::QuestionNavigator;
pub use policy::{
    DEFAULT_ATTEMPT_SECS, DEFAULT_TICK_MILLIS, DEFAULT_VIOLATION_LIMIT, IntegrityDecision,
    SessionPolicy,
};
pub use progress::NavigatorProgress;
pub use runner::{QuizSession, SessionCommand, SessionEvent, SessionOutcome};
pub use timer::{CountdownTimer, TimerTick};
pub use view::{SessionView, format_clock};
