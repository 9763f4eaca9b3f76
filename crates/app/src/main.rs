use std::fmt;
use std::sync::Arc;

use quiz_core::model::QuizId;
use services::{HttpQuizApi, QuizApiConfig, Route, SessionStore};
use storage::repository::Storage;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt as log_fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod input;
mod render;
mod views;

use config::Config;
use views::Shell;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizId { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizId { raw } => write!(f, "invalid --quiz-id value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Args {
    db_url: String,
    api_base_url: String,
    quiz_id: QuizId,
    route: Route,
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [route] [--db <sqlite_url>] [--api <base_url>] [--quiz-id <id>]");
    eprintln!();
    eprintln!("Routes:");
    eprintln!("  /                 landing (default)");
    eprintln!("  /exam?quizId=<id> start or resume an attempt");
    eprintln!("  /results          show the last score report");
    eprintln!();
    eprintln!("Environment (.env is read first):");
    eprintln!("  QUIZ_API_BASE_URL, QUIZ_DB_URL, QUIZ_ID, QUIZ_DURATION_SECS,");
    eprintln!("  QUIZ_TICK_MS, QUIZ_LOG_DIR, RUST_LOG");
}

impl Args {
    fn parse(config: &Config, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = normalize_sqlite_url(config.db_url.clone());
        let mut api_base_url = config.api_base_url.clone();
        let mut quiz_id = config.quiz_id;
        let mut route = Route::Landing;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--api" => api_base_url = require_value(args, "--api")?,
                "--quiz-id" => {
                    let value = require_value(args, "--quiz-id")?;
                    quiz_id = value
                        .parse::<QuizId>()
                        .ok()
                        .filter(|id| id.value() > 0)
                        .ok_or(ArgsError::InvalidQuizId { raw: value })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                path if path.starts_with('/') => route = Route::parse(path),
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            api_base_url,
            quiz_id,
            route,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Logs go to a daily file so they never interleave with the interactive screen.
fn init_tracing(config: &Config) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quiz.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter =
        EnvFilter::try_new(&config.rust_log).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = log_fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();
    guard
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);
    let parsed = Args::parse(&config, &mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let storage = Storage::sqlite(&parsed.db_url).await?;
    tracing::info!(db = %parsed.db_url, api = %parsed.api_base_url, "storage ready");

    let store = SessionStore::new(Arc::clone(&storage.kv));
    let api = Arc::new(HttpQuizApi::new(QuizApiConfig::new(parsed.api_base_url)));
    let mut shell = Shell::new(config, store, api, parsed.quiz_id);
    shell.run(parsed.route).await
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    let guard = init_tracing(&config);

    let code = match run(config).await {
        Ok(()) => 0,
        Err(err) => {
            tracing::error!(error = %err, "quiz client stopped");
            eprintln!("{err}");
            2
        }
    };

    drop(guard);
    // The stdin reader blocks on a thread that cannot be cancelled.
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config::from_lookup(|_| None)
    }

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        let mut iter = args.iter().map(|arg| (*arg).to_string());
        Args::parse(&config(), &mut iter)
    }

    #[test]
    fn defaults_come_from_config() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.quiz_id, QuizId::new(1));
        assert_eq!(args.api_base_url, "http://localhost:3000");
        assert_eq!(args.route, Route::Landing);
        assert!(args.db_url.starts_with("sqlite://"));
    }

    #[test]
    fn flags_and_route_override_config() {
        let args = parse(&[
            "/exam?quizId=4",
            "--api",
            "http://quiz.test",
            "--quiz-id",
            "9",
            "--db",
            "sqlite::memory:",
        ])
        .unwrap();
        assert_eq!(args.route, Route::exam(QuizId::new(4)));
        assert_eq!(args.api_base_url, "http://quiz.test");
        assert_eq!(args.quiz_id, QuizId::new(9));
        assert_eq!(args.db_url, "sqlite::memory:");
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            parse(&["--quiz-id", "0"]),
            Err(ArgsError::InvalidQuizId { .. })
        ));
        assert!(matches!(
            parse(&["--db"]),
            Err(ArgsError::MissingValue { flag: "--db" })
        ));
        assert!(matches!(parse(&["exam"]), Err(ArgsError::UnknownArg(_))));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/quiz.sqlite3".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/quiz.sqlite3"));
        assert_eq!(
            normalize_sqlite_url("sqlite://already.db".into()),
            "sqlite://already.db"
        );
    }
}
