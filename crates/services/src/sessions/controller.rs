use std::fmt;

use chrono::{DateTime, Utc};
use quiz_core::model::{
    AnswerMap, AttemptSnapshot, OptionId, Question, QuestionId, QuizId, ScoreReport, SessionId,
    resume_deadline,
};

use crate::Clock;
use crate::error::{QuizApiError, SessionError};

use super::integrity::{IntegritySignal, UNLOAD_PROMPT};
use super::navigator::QuestionNavigator;
use super::policy::{IntegrityDecision, SessionPolicy};
use super::progress::NavigatorProgress;
use super::timer::{CountdownTimer, TimerTick};
use super::view::SessionView;

//
// ─── STATES ────────────────────────────────────────────────────────────────────
//

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    Expired,
    Integrity,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The user submitted and the evaluator accepted.
    Submitted,
    /// Submission was forced by the deadline or by integrity violations.
    Forced(SubmitTrigger),
    /// The user abandoned the attempt; nothing was evaluated.
    Cancelled,
}

/// Public, copyable view of the controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    InProgress,
    Submitting(SubmitTrigger),
    Terminated(Termination),
}

impl SessionState {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Loading => "loading",
            SessionState::InProgress => "in progress",
            SessionState::Submitting(_) => "submitting",
            SessionState::Terminated(_) => "terminated",
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Terminated(_))
    }
}

//
// ─── EFFECTS ───────────────────────────────────────────────────────────────────
//

/// User-facing messages produced by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoadFailed,
    SubmitFailed,
    IntegrityWarning { count: u32, limit: u32 },
    IntegrityForcedSubmit,
    TimeExpired,
    UnloadPrompt,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::LoadFailed => f.write_str("Could not load questions"),
            Notice::SubmitFailed => f.write_str("Failed to submit quiz. Please try again."),
            Notice::IntegrityWarning { count, limit } => write!(
                f,
                "Warning: you have left the quiz ({count}/{limit}). \
                 Leaving again will submit the quiz automatically."
            ),
            Notice::IntegrityForcedSubmit => {
                f.write_str("You have left the quiz again. It will now be submitted automatically.")
            }
            Notice::TimeExpired => f.write_str("Time is up. Submitting your answers."),
            Notice::UnloadPrompt => f.write_str(UNLOAD_PROMPT),
        }
    }
}

/// Payload of the single evaluation call of an attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub quiz_id: QuizId,
    pub answers: AnswerMap,
    pub trigger: SubmitTrigger,
}

/// Side effects requested by a transition, performed by the caller afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Save the snapshot (best effort).
    Persist(AttemptSnapshot),
    /// Send the answers to the evaluator and report back via `submit_finished`.
    Evaluate(SubmitRequest),
    Notify(Notice),
    /// Write the report to the handoff slot, erase the attempt, show results.
    HandOff(ScoreReport),
    /// Erase the attempt and return to the landing view.
    Discard,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct QuizAttempt {
    session_id: SessionId,
    deadline: DateTime<Utc>,
    navigator: QuestionNavigator,
    timer: CountdownTimer,
    violations: u32,
}

impl QuizAttempt {
    fn snapshot(&self) -> AttemptSnapshot {
        AttemptSnapshot::new(
            self.navigator.answers().clone(),
            self.navigator.current_index(),
            self.deadline,
        )
    }
}

enum Phase {
    Idle,
    Loading,
    InProgress(QuizAttempt),
    Submitting {
        attempt: QuizAttempt,
        trigger: SubmitTrigger,
    },
    Terminated(Termination),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// State machine for one quiz attempt.
///
/// Every method is synchronous and decides the next state plus the effects to
/// run; the caller performs those effects afterwards. In particular the move
/// to `Submitting` and the creation of the evaluation request happen in the
/// same call, so no trigger can slip in between the check and the set.
pub struct SessionController {
    quiz_id: QuizId,
    policy: SessionPolicy,
    clock: Clock,
    phase: Phase,
    error: Option<String>,
}

impl SessionController {
    #[must_use]
    pub fn new(quiz_id: QuizId, policy: SessionPolicy) -> Self {
        Self {
            quiz_id,
            policy,
            clock: Clock::system(),
            phase: Phase::Idle,
            error: None,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    /// Last user-facing error, cleared by the next successful start or submit.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        match &self.phase {
            Phase::Idle => SessionState::Idle,
            Phase::Loading => SessionState::Loading,
            Phase::InProgress(_) => SessionState::InProgress,
            Phase::Submitting { trigger, .. } => SessionState::Submitting(*trigger),
            Phase::Terminated(termination) => SessionState::Terminated(*termination),
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.attempt().map(|attempt| &attempt.session_id)
    }

    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.attempt().map(|attempt| attempt.deadline)
    }

    #[must_use]
    pub fn navigator(&self) -> Option<&QuestionNavigator> {
        self.attempt().map(|attempt| &attempt.navigator)
    }

    #[must_use]
    pub fn violations(&self) -> u32 {
        self.attempt().map_or(0, |attempt| attempt.violations)
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<AttemptSnapshot> {
        self.attempt().map(QuizAttempt::snapshot)
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u64 {
        self.attempt()
            .map_or(0, |attempt| attempt.timer.remaining_seconds(self.clock.now()))
    }

    // ─── Loading ──────────────────────────────────────────────────────────────

    /// `Idle -> Loading`. Allowed again after a failed load.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `Idle`.
    pub fn begin_load(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::Idle) {
            return Err(self.invalid("start"));
        }
        self.phase = Phase::Loading;
        self.error = None;
        tracing::info!(quiz_id = %self.quiz_id, "loading questions");
        Ok(())
    }

    /// `Loading -> Idle` with a retryable error. Nothing is persisted.
    pub fn load_failed(&mut self, err: &SessionError) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Loading) {
            return Vec::new();
        }
        tracing::warn!(quiz_id = %self.quiz_id, error = %err, "question load failed");
        self.phase = Phase::Idle;
        self.error = Some(err.user_message());
        vec![Effect::Notify(Notice::LoadFailed)]
    }

    /// `Loading -> InProgress`, restoring a prior snapshot when there is one.
    ///
    /// A restored deadline is kept even if it has passed; the first tick then
    /// submits the attempt.
    pub fn loaded(
        &mut self,
        session_id: SessionId,
        questions: Vec<Question>,
        snapshot: Option<AttemptSnapshot>,
    ) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Loading) {
            return Vec::new();
        }

        let (navigator, persisted_deadline) = match snapshot {
            Some(snapshot) => {
                let deadline = snapshot.deadline();
                (
                    QuestionNavigator::restored(
                        questions,
                        snapshot.answers,
                        snapshot.current_index,
                    ),
                    deadline,
                )
            }
            None => (QuestionNavigator::new(questions), None),
        };
        let resumed = persisted_deadline.is_some();
        let deadline = resume_deadline(persisted_deadline, &self.clock, self.policy.attempt_duration);

        let mut timer = CountdownTimer::new();
        timer.start(deadline);

        let attempt = QuizAttempt {
            session_id,
            deadline,
            navigator,
            timer,
            violations: 0,
        };
        tracing::info!(
            quiz_id = %self.quiz_id,
            session_id = %attempt.session_id,
            questions = attempt.navigator.len(),
            resumed,
            %deadline,
            "attempt in progress"
        );

        let snapshot = attempt.snapshot();
        self.phase = Phase::InProgress(attempt);
        vec![Effect::Persist(snapshot)]
    }

    // ─── Answering and navigation ─────────────────────────────────────────────

    /// Record an answer for `question_id`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` outside `InProgress`, `UnknownQuestion` or
    /// `UnknownOption` when the pair does not exist in this quiz.
    pub fn select_option(
        &mut self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<Vec<Effect>, SessionError> {
        let attempt = self.attempt_in_progress("answer")?;
        let question = attempt
            .navigator
            .question(question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        if !question.has_option(option_id) {
            return Err(SessionError::UnknownOption {
                question: question_id,
                option: option_id,
            });
        }

        attempt.navigator.record_answer(question_id, option_id);
        Ok(vec![Effect::Persist(attempt.snapshot())])
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `InProgress`.
    pub fn go_next(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.navigate("move", QuestionNavigator::go_next)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `InProgress`.
    pub fn go_prev(&mut self) -> Result<Vec<Effect>, SessionError> {
        self.navigate("move", QuestionNavigator::go_prev)
    }

    /// Jump to a 0-based position; out-of-range values are clamped.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidState` outside `InProgress`.
    pub fn jump_to(&mut self, index: usize) -> Result<Vec<Effect>, SessionError> {
        self.navigate("move", |navigator| navigator.jump_to(index))
    }

    fn navigate(
        &mut self,
        action: &'static str,
        step: impl FnOnce(&mut QuestionNavigator),
    ) -> Result<Vec<Effect>, SessionError> {
        let attempt = self.attempt_in_progress(action)?;
        let before = attempt.navigator.current_index();
        step(&mut attempt.navigator);
        if attempt.navigator.current_index() == before {
            return Ok(Vec::new());
        }
        Ok(vec![Effect::Persist(attempt.snapshot())])
    }

    // ─── Timer and integrity ──────────────────────────────────────────────────

    /// Poll the countdown. Expiry starts a forced submission.
    pub fn tick(&mut self) -> Vec<Effect> {
        let now = self.clock.now();
        let Phase::InProgress(attempt) = &mut self.phase else {
            return Vec::new();
        };

        match attempt.timer.tick(now) {
            TimerTick::Expired => {
                tracing::info!(quiz_id = %self.quiz_id, "deadline reached");
                let mut effects = vec![Effect::Notify(Notice::TimeExpired)];
                effects.extend(self.request_submit(SubmitTrigger::Expired).map(Effect::Evaluate));
                effects
            }
            TimerTick::Running { remaining_secs } => {
                tracing::trace!(remaining_secs, "tick");
                Vec::new()
            }
            TimerTick::Idle => Vec::new(),
        }
    }

    /// React to an integrity signal. Ignored unless the attempt is in progress,
    /// so focus lost while loading or submitting never counts as a violation.
    pub fn on_integrity(&mut self, signal: IntegritySignal) -> Vec<Effect> {
        let Phase::InProgress(attempt) = &mut self.phase else {
            return Vec::new();
        };

        match signal {
            IntegritySignal::UnloadAttempt => vec![Effect::Notify(Notice::UnloadPrompt)],
            IntegritySignal::Hidden => {
                attempt.violations = attempt.violations.saturating_add(1);
                let count = attempt.violations;
                match self.policy.decide(count) {
                    IntegrityDecision::Warn { .. } => {
                        tracing::warn!(quiz_id = %self.quiz_id, count, "integrity warning");
                        vec![Effect::Notify(Notice::IntegrityWarning {
                            count,
                            limit: self.policy.violation_limit,
                        })]
                    }
                    IntegrityDecision::ForceSubmit => {
                        tracing::warn!(quiz_id = %self.quiz_id, count, "integrity limit reached");
                        let mut effects = vec![Effect::Notify(Notice::IntegrityForcedSubmit)];
                        effects.extend(
                            self.request_submit(SubmitTrigger::Integrity)
                                .map(Effect::Evaluate),
                        );
                        effects
                    }
                }
            }
        }
    }

    // ─── Submission ───────────────────────────────────────────────────────────

    /// Manual submission.
    ///
    /// A second submit while one is outstanding is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` before the attempt started or after it ended, and
    /// `NoQuestions` for an empty quiz.
    pub fn submit(&mut self) -> Result<Vec<Effect>, SessionError> {
        match self.state() {
            SessionState::InProgress => {
                if self.navigator().is_some_and(QuestionNavigator::is_empty) {
                    return Err(SessionError::NoQuestions);
                }
                Ok(self
                    .request_submit(SubmitTrigger::Manual)
                    .map(Effect::Evaluate)
                    .into_iter()
                    .collect())
            }
            SessionState::Submitting(_) => Ok(Vec::new()),
            _ => Err(self.invalid("submit")),
        }
    }

    /// The one check-and-set guarding evaluation: `InProgress -> Submitting`.
    ///
    /// Returns `None` when the attempt is not in progress, which makes every
    /// later trigger a no-op.
    fn request_submit(&mut self, trigger: SubmitTrigger) -> Option<SubmitRequest> {
        match std::mem::replace(&mut self.phase, Phase::Loading) {
            Phase::InProgress(mut attempt) => {
                attempt.timer.stop();
                let request = SubmitRequest {
                    quiz_id: self.quiz_id,
                    answers: attempt.navigator.answers().clone(),
                    trigger,
                };
                tracing::info!(
                    quiz_id = %self.quiz_id,
                    ?trigger,
                    answers = request.answers.len(),
                    "submitting"
                );
                self.error = None;
                self.phase = Phase::Submitting { attempt, trigger };
                Some(request)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Outcome of the evaluation call.
    ///
    /// Success terminates the attempt and hands the report off. Failure
    /// returns to `InProgress` with the answers untouched so the user can retry.
    pub fn submit_finished(
        &mut self,
        result: Result<ScoreReport, QuizApiError>,
    ) -> Vec<Effect> {
        let (mut attempt, trigger) = match std::mem::replace(&mut self.phase, Phase::Loading) {
            Phase::Submitting { attempt, trigger } => (attempt, trigger),
            other => {
                self.phase = other;
                tracing::debug!("ignoring evaluation result outside submitting");
                return Vec::new();
            }
        };

        match result {
            Ok(report) => {
                let termination = match trigger {
                    SubmitTrigger::Manual => Termination::Submitted,
                    forced => Termination::Forced(forced),
                };
                tracing::info!(
                    quiz_id = %self.quiz_id,
                    ?termination,
                    score = report.score_percent,
                    "attempt evaluated"
                );
                self.phase = Phase::Terminated(termination);
                vec![Effect::HandOff(report)]
            }
            Err(err) => {
                let err = SessionError::Submit(err);
                tracing::warn!(quiz_id = %self.quiz_id, error = ?err, "evaluation failed");
                self.error = Some(err.user_message());
                // Deadline unchanged: an expired attempt re-triggers on the next tick.
                attempt.timer.start(attempt.deadline);
                self.phase = Phase::InProgress(attempt);
                vec![Effect::Notify(Notice::SubmitFailed)]
            }
        }
    }

    /// User-confirmed exit. Erases the attempt without contacting the evaluator.
    pub fn abandon(&mut self) -> Vec<Effect> {
        if self.state().is_terminal() {
            return Vec::new();
        }
        tracing::info!(quiz_id = %self.quiz_id, "attempt abandoned");
        self.phase = Phase::Terminated(Termination::Cancelled);
        self.error = None;
        vec![Effect::Discard]
    }

    // ─── View ─────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn view(&self) -> SessionView {
        let state = self.state();
        let remaining_secs = self.remaining_seconds();
        let Some(attempt) = self.attempt() else {
            return SessionView {
                quiz_id: self.quiz_id,
                state,
                index: 0,
                total: 0,
                question: None,
                selected: None,
                answered: Vec::new(),
                progress: NavigatorProgress::default(),
                remaining_secs,
                violations: 0,
                violation_limit: self.policy.violation_limit,
                error: self.error.clone(),
                is_last: false,
            };
        };

        let navigator = &attempt.navigator;
        let question = navigator.current().cloned();
        let selected = question
            .as_ref()
            .and_then(|question| navigator.answer(question.id()));
        SessionView {
            quiz_id: self.quiz_id,
            state,
            index: navigator.current_index(),
            total: navigator.len(),
            question,
            selected,
            answered: navigator
                .questions()
                .iter()
                .map(|question| navigator.is_answered(question.id()))
                .collect(),
            progress: navigator.progress(),
            remaining_secs,
            violations: attempt.violations,
            violation_limit: self.policy.violation_limit,
            error: self.error.clone(),
            is_last: navigator.is_last(),
        }
    }

    // ─── Helpers ──────────────────────────────────────────────────────────────

    fn attempt(&self) -> Option<&QuizAttempt> {
        match &self.phase {
            Phase::InProgress(attempt) | Phase::Submitting { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    fn attempt_in_progress(
        &mut self,
        action: &'static str,
    ) -> Result<&mut QuizAttempt, SessionError> {
        let state = self.state().label();
        match &mut self.phase {
            Phase::InProgress(attempt) => Ok(attempt),
            _ => Err(SessionError::InvalidState { action, state }),
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidState {
            action,
            state: self.state().label(),
        }
    }
}
