use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use quiz_core::model::{
    AnswerMap, AttemptSnapshot, OptionId, Question, QuestionId, QuizId, QuizOption, ScoreReport,
    SessionId,
};
use services::session::{Notice, SessionCommand};
use services::{
    IntegrityMonitor, QuizApi, QuizApiError, QuizSession, SessionController, SessionEvent,
    SessionOutcome, SessionPolicy, SessionState, SessionStore, VisibilityEvent,
};
use storage::repository::InMemoryStore;

const QUIZ: u64 = 1;

struct FakeApi {
    questions: Vec<Question>,
    fetch_failures: AtomicUsize,
    evaluate_failures: AtomicUsize,
    evaluate_delay: Duration,
    fetches: AtomicUsize,
    evaluations: Mutex<Vec<AnswerMap>>,
}

impl FakeApi {
    fn new(question_count: u64) -> Self {
        let questions = (1..=question_count)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Question {id}"),
                    vec![
                        QuizOption::new(OptionId::new(id * 10), "first"),
                        QuizOption::new(OptionId::new(id * 10 + 1), "second"),
                    ],
                )
                .unwrap()
            })
            .collect();
        Self {
            questions,
            fetch_failures: AtomicUsize::new(0),
            evaluate_failures: AtomicUsize::new(0),
            evaluate_delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
            evaluations: Mutex::new(Vec::new()),
        }
    }

    fn with_evaluate_delay(mut self, delay: Duration) -> Self {
        self.evaluate_delay = delay;
        self
    }

    fn failing_fetches(self, n: usize) -> Self {
        self.fetch_failures.store(n, Ordering::SeqCst);
        self
    }

    fn failing_evaluations(self, n: usize) -> Self {
        self.evaluate_failures.store(n, Ordering::SeqCst);
        self
    }

    fn evaluations(&self) -> Vec<AnswerMap> {
        self.evaluations.lock().unwrap().clone()
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl QuizApi for FakeApi {
    async fn fetch_questions(
        &self,
        _quiz_id: QuizId,
        _session_id: &SessionId,
    ) -> Result<Vec<Question>, QuizApiError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fetch_failures) {
            return Err(QuizApiError::InvalidPayload("unavailable".into()));
        }
        Ok(self.questions.clone())
    }

    async fn evaluate(
        &self,
        _quiz_id: QuizId,
        answers: &AnswerMap,
    ) -> Result<ScoreReport, QuizApiError> {
        self.evaluations.lock().unwrap().push(answers.clone());
        tokio::time::sleep(self.evaluate_delay).await;
        if take_failure(&self.evaluate_failures) {
            return Err(QuizApiError::InvalidPayload("evaluator down".into()));
        }
        let total = u32::try_from(self.questions.len()).unwrap();
        let answered = u32::try_from(answers.len()).unwrap();
        Ok(ScoreReport {
            total_questions: total,
            correct_count: answered,
            wrong_count: 0,
            score_percent: f64::from(answered) * 100.0 / f64::from(total.max(1)),
            results: Vec::new(),
        })
    }
}

struct Harness {
    api: Arc<FakeApi>,
    store: SessionStore,
    commands: mpsc::Sender<SessionCommand>,
    visibility: mpsc::Sender<VisibilityEvent>,
    events: mpsc::UnboundedReceiver<SessionEvent>,
    handle: tokio::task::JoinHandle<SessionOutcome>,
}

impl Harness {
    async fn outcome(self) -> (SessionOutcome, Arc<FakeApi>, SessionStore) {
        let outcome = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("session finished in time")
            .expect("session task");
        (outcome, self.api, self.store)
    }

    async fn wait_for_notice(&mut self, wanted: Notice) {
        let wait = async {
            while let Some(event) = self.events.recv().await {
                if event == SessionEvent::Notice(wanted) {
                    return;
                }
            }
            panic!("event stream ended before {wanted:?}");
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("notice arrived in time");
    }

    async fn next_event(&mut self) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("event arrived in time")
            .expect("event stream open")
    }

    /// Next rendered view, skipping countdown and notice events.
    async fn next_view(&mut self) -> services::SessionView {
        loop {
            if let SessionEvent::Updated(view) = self.next_event().await {
                return view;
            }
        }
    }

    async fn next_notice(&mut self) -> Notice {
        loop {
            if let SessionEvent::Notice(notice) = self.next_event().await {
                return notice;
            }
        }
    }

    async fn wait_for_in_progress(&mut self) {
        let wait = async {
            while let Some(event) = self.events.recv().await {
                if let SessionEvent::Updated(view) = event {
                    if view.state == SessionState::InProgress {
                        return;
                    }
                }
            }
            panic!("event stream ended before the attempt started");
        };
        tokio::time::timeout(Duration::from_secs(5), wait)
            .await
            .expect("attempt started in time");
    }
}

async fn launch(api: FakeApi, seed: Option<AttemptSnapshot>) -> Harness {
    let api = Arc::new(api);
    let kv = InMemoryStore::new();
    let store = SessionStore::new(Arc::new(kv));
    if let Some(snapshot) = seed {
        store.save_snapshot(QuizId::new(QUIZ), &snapshot).await;
    }

    let policy = SessionPolicy::default().with_tick_interval(Duration::from_millis(20));
    let controller = SessionController::new(QuizId::new(QUIZ), policy);
    let session = QuizSession::new(controller, store.clone(), api.clone());

    let (commands, commands_rx) = mpsc::channel(32);
    let (visibility, visibility_rx) = mpsc::channel(8);
    let (events_tx, events) = mpsc::unbounded_channel();
    let monitor = IntegrityMonitor::new(visibility_rx);
    let handle = tokio::spawn(session.run(commands_rx, monitor, events_tx));

    Harness {
        api,
        store,
        commands,
        visibility,
        events,
        handle,
    }
}

#[tokio::test]
async fn unanswered_last_question_is_left_out_of_submission() {
    let harness = launch(FakeApi::new(5), None).await;
    for id in 1..=4 {
        harness
            .commands
            .send(SessionCommand::Select {
                question_id: QuestionId::new(id),
                option_id: OptionId::new(id * 10),
            })
            .await
            .unwrap();
        harness.commands.send(SessionCommand::Next).await.unwrap();
    }
    harness.commands.send(SessionCommand::Submit).await.unwrap();

    let (outcome, api, store) = harness.outcome().await;

    let SessionOutcome::Results(report) = outcome else {
        panic!("expected results, got {outcome:?}");
    };
    assert_eq!(report.correct_count, 4);
    let evaluations = api.evaluations();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0].len(), 4);

    assert_eq!(store.load_snapshot(QuizId::new(QUIZ)).await, None);
    assert_eq!(store.take_score_report().await, Some(report));
}

#[tokio::test]
async fn expired_deadline_submits_without_user_action() {
    let past = Utc::now() - chrono::Duration::milliseconds(1000);
    let mut answers = AnswerMap::new();
    answers.insert(QuestionId::new(1), OptionId::new(11));
    let seed = AttemptSnapshot::new(answers.clone(), 0, past);

    let harness = launch(FakeApi::new(3), Some(seed)).await;
    let (outcome, api, _store) = harness.outcome().await;

    assert!(matches!(outcome, SessionOutcome::Results(_)));
    assert_eq!(api.evaluations(), vec![answers]);
}

#[tokio::test]
async fn second_hidden_event_forces_submission_once() {
    let mut harness = launch(
        FakeApi::new(3).with_evaluate_delay(Duration::from_millis(100)),
        None,
    )
    .await;
    harness.wait_for_in_progress().await;

    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    harness
        .wait_for_notice(Notice::IntegrityWarning { count: 1, limit: 2 })
        .await;
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    harness.wait_for_notice(Notice::IntegrityForcedSubmit).await;
    // Arrives while the evaluation is still outstanding.
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    harness.commands.send(SessionCommand::Submit).await.unwrap();

    let (outcome, api, _store) = harness.outcome().await;
    assert!(matches!(outcome, SessionOutcome::Results(_)));
    assert_eq!(api.evaluations().len(), 1);
}

#[tokio::test]
async fn manual_submit_racing_expiry_evaluates_once() {
    let past = Utc::now() - chrono::Duration::milliseconds(10);
    let seed = AttemptSnapshot::new(AnswerMap::new(), 0, past);
    let harness = launch(
        FakeApi::new(2).with_evaluate_delay(Duration::from_millis(150)),
        Some(seed),
    )
    .await;
    harness.commands.send(SessionCommand::Submit).await.unwrap();
    harness.commands.send(SessionCommand::Submit).await.unwrap();
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();

    let (outcome, api, _store) = harness.outcome().await;
    assert!(matches!(outcome, SessionOutcome::Results(_)));
    assert_eq!(api.evaluations().len(), 1);
}

#[tokio::test]
async fn failed_evaluation_keeps_persisted_answers_and_allows_retry() {
    let mut harness = launch(FakeApi::new(2).failing_evaluations(1), None).await;
    harness
        .commands
        .send(SessionCommand::Select {
            question_id: QuestionId::new(1),
            option_id: OptionId::new(11),
        })
        .await
        .unwrap();
    harness.commands.send(SessionCommand::Submit).await.unwrap();
    harness.wait_for_notice(Notice::SubmitFailed).await;

    let snapshot = harness
        .store
        .load_snapshot(QuizId::new(QUIZ))
        .await
        .expect("snapshot kept after failed submit");
    assert_eq!(
        snapshot.answers.get(&QuestionId::new(1)),
        Some(&OptionId::new(11))
    );
    assert_eq!(harness.store.peek_score_report().await, None);

    harness.commands.send(SessionCommand::Submit).await.unwrap();
    let (outcome, api, store) = harness.outcome().await;
    assert!(matches!(outcome, SessionOutcome::Results(_)));
    assert_eq!(api.evaluations().len(), 2);
    assert_eq!(store.load_snapshot(QuizId::new(QUIZ)).await, None);
}

#[tokio::test]
async fn exit_erases_attempt_without_evaluating() {
    let mut harness = launch(FakeApi::new(2), None).await;
    harness.wait_for_in_progress().await;
    let session_before = harness.store.session_id(QuizId::new(QUIZ)).await;

    harness.commands.send(SessionCommand::Exit).await.unwrap();
    let (outcome, api, store) = harness.outcome().await;

    assert_eq!(outcome, SessionOutcome::Abandoned);
    assert!(api.evaluations().is_empty());
    assert_eq!(store.load_snapshot(QuizId::new(QUIZ)).await, None);
    assert_ne!(store.session_id(QuizId::new(QUIZ)).await, session_before);
}

#[tokio::test]
async fn load_failure_can_be_retried() {
    let mut harness = launch(FakeApi::new(2).failing_fetches(1), None).await;
    harness.wait_for_notice(Notice::LoadFailed).await;
    assert_eq!(harness.store.load_snapshot(QuizId::new(QUIZ)).await, None);

    harness.commands.send(SessionCommand::Start).await.unwrap();
    harness.wait_for_in_progress().await;
    assert!(harness.store.load_snapshot(QuizId::new(QUIZ)).await.is_some());

    harness.commands.send(SessionCommand::Exit).await.unwrap();
    let (outcome, api, _store) = harness.outcome().await;
    assert_eq!(outcome, SessionOutcome::Abandoned);
    assert_eq!(api.fetches.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn closing_the_view_keeps_state_for_resume() {
    let mut harness = launch(FakeApi::new(3), None).await;
    harness
        .commands
        .send(SessionCommand::Select {
            question_id: QuestionId::new(2),
            option_id: OptionId::new(21),
        })
        .await
        .unwrap();
    harness.commands.send(SessionCommand::JumpTo(2)).await.unwrap();
    harness.wait_for_in_progress().await;

    let Harness {
        api,
        store,
        commands,
        handle,
        ..
    } = harness;
    drop(commands);
    let outcome = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome, SessionOutcome::Closed);
    assert!(api.evaluations().is_empty());
    let snapshot = store.load_snapshot(QuizId::new(QUIZ)).await.unwrap();
    assert_eq!(snapshot.current_index, Some(2));
    assert_eq!(
        snapshot.answers.get(&QuestionId::new(2)),
        Some(&OptionId::new(21))
    );
}

#[tokio::test]
async fn focus_lost_on_the_retry_screen_is_not_a_violation() {
    let mut harness = launch(FakeApi::new(3).failing_fetches(1), None).await;
    harness.wait_for_notice(Notice::LoadFailed).await;
    assert_eq!(harness.next_view().await.state, SessionState::Idle);

    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    let idle = harness.next_view().await;
    assert_eq!(idle.state, SessionState::Idle);
    assert_eq!(idle.violations, 0);

    harness.commands.send(SessionCommand::Start).await.unwrap();
    harness.wait_for_in_progress().await;
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    assert_eq!(
        harness.next_notice().await,
        Notice::IntegrityWarning { count: 1, limit: 2 }
    );

    harness.commands.send(SessionCommand::Exit).await.unwrap();
    let (outcome, api, _store) = harness.outcome().await;
    assert_eq!(outcome, SessionOutcome::Abandoned);
    assert!(api.evaluations().is_empty());
}

#[tokio::test]
async fn focus_lost_while_submitting_is_not_a_violation() {
    let mut harness = launch(
        FakeApi::new(2)
            .failing_evaluations(1)
            .with_evaluate_delay(Duration::from_millis(300)),
        None,
    )
    .await;
    harness.wait_for_in_progress().await;

    harness.commands.send(SessionCommand::Submit).await.unwrap();
    assert!(matches!(
        harness.next_view().await.state,
        SessionState::Submitting(_)
    ));
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    for _ in 0..2 {
        assert!(matches!(
            harness.next_view().await.state,
            SessionState::Submitting(_)
        ));
    }

    harness.wait_for_notice(Notice::SubmitFailed).await;
    harness.visibility.send(VisibilityEvent::Hidden).await.unwrap();
    assert_eq!(
        harness.next_notice().await,
        Notice::IntegrityWarning { count: 1, limit: 2 }
    );

    harness.commands.send(SessionCommand::Exit).await.unwrap();
    let (outcome, api, _store) = harness.outcome().await;
    assert_eq!(outcome, SessionOutcome::Abandoned);
    assert_eq!(api.evaluations().len(), 1);
}
