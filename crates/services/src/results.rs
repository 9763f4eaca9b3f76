use quiz_core::model::{QuizId, ScoreReport};

use crate::routes::Route;
use crate::session_store::SessionStore;

/// Results-side half of the score handoff.
#[derive(Clone)]
pub struct ResultsService {
    store: SessionStore,
}

impl ResultsService {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Consume the report left by the last finished attempt, if any.
    pub async fn load(&self) -> Option<ScoreReport> {
        self.store.take_score_report().await
    }

    /// Clear the handoff and the quiz's session id so the next attempt gets a
    /// fresh question order, then go back into the exam.
    pub async fn retake(&self, quiz_id: QuizId) -> Route {
        self.store.clear_score_report().await;
        self.store.clear_session_id(quiz_id).await;
        Route::exam(quiz_id)
    }

    pub async fn go_home(&self, quiz_id: QuizId) -> Route {
        self.store.clear_score_report().await;
        self.store.clear_session_id(quiz_id).await;
        Route::Landing
    }
}
