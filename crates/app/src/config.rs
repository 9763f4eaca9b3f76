use std::env;
use std::time::Duration;

use dotenvy::dotenv;
use quiz_core::model::QuizId;
use services::SessionPolicy;
use services::quiz_api::DEFAULT_BASE_URL;

pub const DEFAULT_DB_URL: &str = "sqlite://quiz.sqlite3";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub db_url: String,
    pub quiz_id: QuizId,
    pub attempt_secs: i64,
    pub tick_millis: u64,
    pub log_dir: String,
    pub rust_log: String,
}

impl Config {
    /// Read `.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let quiz_id = lookup("QUIZ_ID")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|id| *id > 0)
            .map_or_else(|| QuizId::new(1), QuizId::new);
        let attempt_secs = lookup("QUIZ_DURATION_SECS")
            .and_then(|value| value.trim().parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(services::session::DEFAULT_ATTEMPT_SECS);
        let tick_millis = lookup("QUIZ_TICK_MS")
            .and_then(|value| value.trim().parse::<u64>().ok())
            .filter(|millis| *millis > 0)
            .unwrap_or(services::session::DEFAULT_TICK_MILLIS);

        Self {
            api_base_url: text("QUIZ_API_BASE_URL", DEFAULT_BASE_URL),
            db_url: text("QUIZ_DB_URL", DEFAULT_DB_URL),
            quiz_id,
            attempt_secs,
            tick_millis,
            log_dir: text("QUIZ_LOG_DIR", DEFAULT_LOG_DIR),
            rust_log: text("RUST_LOG", "info"),
        }
    }

    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy::default()
            .with_attempt_duration(chrono::Duration::seconds(self.attempt_secs))
            .with_tick_interval(Duration::from_millis(self.tick_millis))
    }
}
