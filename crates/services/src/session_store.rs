use std::sync::Arc;

use quiz_core::model::{AttemptSnapshot, QuizId, ScoreReport, SessionId};
use storage::repository::KeyValueStore;

/// Global key of the results handoff slot.
pub const SCORE_HANDOFF_KEY: &str = "quizScoreData";

#[must_use]
pub fn snapshot_key(quiz_id: QuizId) -> String {
    format!("quizState_{quiz_id}")
}

#[must_use]
pub fn session_key(quiz_id: QuizId) -> String {
    format!("quizSession_{quiz_id}")
}

/// Best-effort persistence of attempt snapshots, session ids and the results handoff.
///
/// Nothing here returns an error. Durability is not required for a live
/// session to be correct, so backend failures are logged and dropped, and
/// unreadable values are treated as absent.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Session id for `quiz_id`, generating and saving one on first use.
    ///
    /// If the new id cannot be saved it is still returned; the attempt then
    /// just gets a different id after a restart.
    pub async fn session_id(&self, quiz_id: QuizId) -> SessionId {
        let key = session_key(quiz_id);
        if let Some(raw) = self.read(&key).await {
            if !raw.trim().is_empty() {
                return SessionId::new(raw);
            }
        }

        let id = SessionId::generate();
        self.write(&key, id.as_str()).await;
        tracing::info!(%quiz_id, session_id = %id, "issued new session id");
        id
    }

    pub async fn load_snapshot(&self, quiz_id: QuizId) -> Option<AttemptSnapshot> {
        let raw = self.read(&snapshot_key(quiz_id)).await?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                tracing::warn!(%quiz_id, error = %err, "ignoring unreadable attempt snapshot");
                None
            }
        }
    }

    pub async fn save_snapshot(&self, quiz_id: QuizId, snapshot: &AttemptSnapshot) {
        match serde_json::to_string(snapshot) {
            Ok(raw) => self.write(&snapshot_key(quiz_id), &raw).await,
            Err(err) => tracing::warn!(%quiz_id, error = %err, "could not encode snapshot"),
        }
    }

    /// Erase the snapshot and the session id of `quiz_id`.
    pub async fn clear_attempt(&self, quiz_id: QuizId) {
        self.remove(&snapshot_key(quiz_id)).await;
        self.remove(&session_key(quiz_id)).await;
    }

    pub async fn clear_session_id(&self, quiz_id: QuizId) {
        self.remove(&session_key(quiz_id)).await;
    }

    /// Place the final report in the handoff slot for the results view.
    pub async fn write_score_report(&self, report: &ScoreReport) {
        match serde_json::to_string(report) {
            Ok(raw) => self.write(SCORE_HANDOFF_KEY, &raw).await,
            Err(err) => tracing::warn!(error = %err, "could not encode score report"),
        }
    }

    /// Read the handoff slot without consuming it.
    pub async fn peek_score_report(&self) -> Option<ScoreReport> {
        let raw = self.read(SCORE_HANDOFF_KEY).await?;
        match serde_json::from_str(&raw) {
            Ok(report) => Some(report),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable score report");
                None
            }
        }
    }

    /// Read the handoff slot once and erase it.
    pub async fn take_score_report(&self) -> Option<ScoreReport> {
        let report = self.peek_score_report().await;
        self.clear_score_report().await;
        report
    }

    pub async fn clear_score_report(&self) {
        self.remove(SCORE_HANDOFF_KEY).await;
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, error = %err, "storage read failed");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.kv.set(key, value).await {
            tracing::warn!(key, error = %err, "storage write failed");
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(err) = self.kv.delete(key).await {
            tracing::warn!(key, error = %err, "storage delete failed");
        }
    }
}
