use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use quiz_core::model::{OptionId, QuestionId, ScoreReport};

use crate::error::{QuizApiError, SessionError};
use crate::quiz_api::QuizApi;
use crate::session_store::SessionStore;

use super::controller::{Effect, Notice, SessionController, SubmitRequest};
use super::integrity::IntegrityMonitor;
use super::view::SessionView;

/// User actions delivered to a running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Retry loading after a failure.
    Start,
    Next,
    Prev,
    JumpTo(usize),
    Select {
        question_id: QuestionId,
        option_id: OptionId,
    },
    Submit,
    /// Confirmed exit; the view asks for confirmation before sending it.
    Exit,
}

/// Updates sent back to the view.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Updated(SessionView),
    /// Whole seconds left; sent only when the value changes.
    Remaining(u64),
    Notice(Notice),
    /// A command was refused; the text is meant for the user.
    Rejected(String),
}

/// Where the host should navigate once the session is over.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Evaluated; the report is also in the handoff slot.
    Results(ScoreReport),
    Abandoned,
    /// The view went away mid-attempt. Persisted state is kept for resume.
    Closed,
}

type EvaluationResult = Result<ScoreReport, QuizApiError>;

/// Drives a `SessionController` against real capabilities.
///
/// A single task owns the controller and multiplexes the tick interval,
/// integrity signals, user commands and the evaluation result. Evaluation
/// runs on its own task, so ticks and visibility changes keep arriving while
/// it is outstanding; the controller turns them into no-ops.
pub struct QuizSession {
    controller: SessionController,
    store: SessionStore,
    api: Arc<dyn QuizApi>,
}

impl QuizSession {
    #[must_use]
    pub fn new(controller: SessionController, store: SessionStore, api: Arc<dyn QuizApi>) -> Self {
        Self {
            controller,
            store,
            api,
        }
    }

    #[must_use]
    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Load (or reload) the question set and resume any persisted attempt.
    pub async fn start(&mut self) -> Vec<Effect> {
        if let Err(err) = self.controller.begin_load() {
            tracing::debug!(error = %err, "start ignored");
            return Vec::new();
        }

        let quiz_id = self.controller.quiz_id();
        let session_id = self.store.session_id(quiz_id).await;
        match self.api.fetch_questions(quiz_id, &session_id).await {
            Ok(questions) => {
                let snapshot = self.store.load_snapshot(quiz_id).await;
                self.controller.loaded(session_id, questions, snapshot)
            }
            Err(err) => self.controller.load_failed(&SessionError::Load(err)),
        }
    }

    /// Run until the session ends or the command channel closes.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut monitor: IntegrityMonitor,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> SessionOutcome {
        let (results_tx, mut results_rx) = mpsc::channel::<EvaluationResult>(1);
        let mut ticker = tokio::time::interval(self.controller.policy().tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_remaining = None;

        let effects = self.start().await;
        if let Some(outcome) = self.apply(effects, &results_tx, &events).await {
            monitor.unsubscribe();
            return outcome;
        }
        self.publish(&events);

        loop {
            let (effects, changed) = tokio::select! {
                _ = ticker.tick() => {
                    let effects = self.controller.tick();
                    let remaining = self.controller.remaining_seconds();
                    if last_remaining != Some(remaining) {
                        last_remaining = Some(remaining);
                        let _ = events.send(SessionEvent::Remaining(remaining));
                    }
                    let changed = !effects.is_empty();
                    (effects, changed)
                }
                signal = monitor.next_signal() => (self.controller.on_integrity(signal), true),
                command = commands.recv() => match command {
                    Some(command) => (self.handle_command(command, &events).await, true),
                    None => {
                        tracing::info!(quiz_id = %self.controller.quiz_id(), "session view closed");
                        monitor.unsubscribe();
                        return SessionOutcome::Closed;
                    }
                },
                Some(result) = results_rx.recv() => (self.controller.submit_finished(result), true),
            };

            if let Some(outcome) = self.apply(effects, &results_tx, &events).await {
                monitor.unsubscribe();
                return outcome;
            }
            if changed {
                self.publish(&events);
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: SessionCommand,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Vec<Effect> {
        let result = match command {
            SessionCommand::Start => return self.start().await,
            SessionCommand::Next => self.controller.go_next(),
            SessionCommand::Prev => self.controller.go_prev(),
            SessionCommand::JumpTo(index) => self.controller.jump_to(index),
            SessionCommand::Select {
                question_id,
                option_id,
            } => self.controller.select_option(question_id, option_id),
            SessionCommand::Submit => self.controller.submit(),
            SessionCommand::Exit => Ok(self.controller.abandon()),
        };

        result.unwrap_or_else(|err| {
            tracing::debug!(?command, error = %err, "command rejected");
            let _ = events.send(SessionEvent::Rejected(err.user_message()));
            Vec::new()
        })
    }

    /// Perform effects in order. Returns the outcome once the session is over.
    async fn apply(
        &mut self,
        effects: Vec<Effect>,
        results: &mpsc::Sender<EvaluationResult>,
        events: &mpsc::UnboundedSender<SessionEvent>,
    ) -> Option<SessionOutcome> {
        let quiz_id = self.controller.quiz_id();
        for effect in effects {
            match effect {
                Effect::Persist(snapshot) => self.store.save_snapshot(quiz_id, &snapshot).await,
                Effect::Evaluate(request) => self.spawn_evaluation(request, results.clone()),
                Effect::Notify(notice) => {
                    let _ = events.send(SessionEvent::Notice(notice));
                }
                Effect::HandOff(report) => {
                    self.store.write_score_report(&report).await;
                    self.store.clear_attempt(quiz_id).await;
                    return Some(SessionOutcome::Results(report));
                }
                Effect::Discard => {
                    self.store.clear_attempt(quiz_id).await;
                    return Some(SessionOutcome::Abandoned);
                }
            }
        }
        None
    }

    fn spawn_evaluation(&self, request: SubmitRequest, results: mpsc::Sender<EvaluationResult>) {
        let api = Arc::clone(&self.api);
        tokio::spawn(async move {
            let result = api.evaluate(request.quiz_id, &request.answers).await;
            if results.send(result).await.is_err() {
                tracing::debug!("evaluation finished after the session closed");
            }
        });
    }

    fn publish(&self, events: &mpsc::UnboundedSender<SessionEvent>) {
        let _ = events.send(SessionEvent::Updated(self.controller.view()));
    }
}
