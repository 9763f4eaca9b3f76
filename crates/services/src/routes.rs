use std::fmt;

use url::Url;

use quiz_core::model::QuizId;

const ROUTE_BASE: &str = "app://quiz/";

/// Top-level views the host can navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    /// The session view; `quiz_id` comes from the `quizId` query parameter.
    Exam { quiz_id: Option<QuizId> },
    Results,
}

impl Route {
    /// Parse a path such as `/exam?quizId=2`. Anything unrecognised is the landing view.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let Ok(url) = Url::parse(ROUTE_BASE).and_then(|base| base.join(path.trim())) else {
            return Route::Landing;
        };

        let route = url.path().trim_end_matches('/');
        if route == "/exam" {
            let quiz_id = url
                .query_pairs()
                .find(|(key, _)| key == "quizId")
                .and_then(|(_, value)| value.parse::<QuizId>().ok())
                .filter(|id| id.value() > 0);
            Route::Exam { quiz_id }
        } else if route == "/results" {
            Route::Results
        } else {
            Route::Landing
        }
    }

    #[must_use]
    pub fn exam(quiz_id: QuizId) -> Self {
        Route::Exam {
            quiz_id: Some(quiz_id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Landing => f.write_str("/"),
            Route::Exam { quiz_id: Some(id) } => write!(f, "/exam?quizId={id}"),
            Route::Exam { quiz_id: None } => f.write_str("/exam"),
            Route::Results => f.write_str("/results"),
        }
    }
}
