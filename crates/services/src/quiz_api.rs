use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::{
    AnswerMap, OptionId, Question, QuestionId, QuizId, QuizOption, ScoreReport, SessionId,
};

use crate::error::QuizApiError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct QuizApiConfig {
    pub base_url: String,
}

impl QuizApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

/// Remote question bank and evaluator.
#[async_trait]
pub trait QuizApi: Send + Sync {
    /// Fetch the question set for one attempt.
    ///
    /// # Errors
    ///
    /// Returns `QuizApiError` on transport failure, a non-success status, or a
    /// payload that does not describe valid questions.
    async fn fetch_questions(
        &self,
        quiz_id: QuizId,
        session_id: &SessionId,
    ) -> Result<Vec<Question>, QuizApiError>;

    /// Score the submitted answers.
    ///
    /// # Errors
    ///
    /// Returns `QuizApiError` on transport failure or a non-success status.
    async fn evaluate(
        &self,
        quiz_id: QuizId,
        answers: &AnswerMap,
    ) -> Result<ScoreReport, QuizApiError>;
}

/// `QuizApi` over HTTP.
///
/// No request timeout is configured beyond the client default; a slow
/// evaluator simply delays the end of the session.
#[derive(Clone)]
pub struct HttpQuizApi {
    client: Client,
    config: QuizApiConfig,
}

impl HttpQuizApi {
    #[must_use]
    pub fn new(config: QuizApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, quiz_id: QuizId, leaf: &str) -> String {
        format!(
            "{}/api/quiz/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            quiz_id,
            leaf
        )
    }
}

#[async_trait]
impl QuizApi for HttpQuizApi {
    async fn fetch_questions(
        &self,
        quiz_id: QuizId,
        session_id: &SessionId,
    ) -> Result<Vec<Question>, QuizApiError> {
        let response = self
            .client
            .get(self.endpoint(quiz_id, "questions"))
            .query(&[("sessionId", session_id.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuizApiError::HttpStatus(response.status()));
        }

        let body: QuestionsResponse = response.json().await?;
        let questions = body
            .questions
            .into_iter()
            .map(QuestionPayload::into_question)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(%quiz_id, count = questions.len(), "fetched questions");
        Ok(questions)
    }

    async fn evaluate(
        &self,
        quiz_id: QuizId,
        answers: &AnswerMap,
    ) -> Result<ScoreReport, QuizApiError> {
        let response = self
            .client
            .post(self.endpoint(quiz_id, "evaluate"))
            .json(&EvaluateRequest { answers })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(QuizApiError::HttpStatus(response.status()));
        }

        Ok(response.json().await?)
    }
}

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    questions: Vec<QuestionPayload>,
}

#[derive(Debug, Deserialize)]
struct QuestionPayload {
    id: u64,
    question_text: String,
    #[serde(default)]
    options: Vec<OptionPayload>,
}

impl QuestionPayload {
    fn into_question(self) -> Result<Question, QuizApiError> {
        let options = self
            .options
            .into_iter()
            .map(|option| QuizOption::new(OptionId::new(option.id), option.option_text))
            .collect();
        Question::new(QuestionId::new(self.id), self.question_text, options)
            .map_err(|err| QuizApiError::InvalidPayload(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct OptionPayload {
    id: u64,
    option_text: String,
}

#[derive(Debug, Serialize)]
struct EvaluateRequest<'a> {
    answers: &'a AnswerMap,
}
