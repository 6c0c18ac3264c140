use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    gateways::http_helpers::error_for_status,
    models::domain::{attempt::AttemptMode, question::AttemptQuestion},
    models::dto::{
        request::{AnswerSubmission, BatchSubmission, StartAttemptRequest},
        response::{
            AnswerSubmissionResult, AttemptReview, AttemptStats, AttemptStatusUpdate,
            CompletionSummary, CurrentQuestionResponse, StartAttemptResponse,
        },
    },
};

/// Backend attempt endpoints. The session depends on this contract only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteAttemptGateway: Send + Sync {
    async fn start_attempt(
        &self,
        quiz_id: &str,
        mode: AttemptMode,
    ) -> AppResult<StartAttemptResponse>;
    async fn get_current_question(&self, attempt_id: &str) -> AppResult<CurrentQuestionResponse>;
    async fn get_attempt_questions(&self, attempt_id: &str) -> AppResult<Vec<AttemptQuestion>>;
    async fn submit_answer(
        &self,
        attempt_id: &str,
        submission: &AnswerSubmission,
        grade: bool,
    ) -> AppResult<AnswerSubmissionResult>;
    async fn submit_batch_answers(
        &self,
        attempt_id: &str,
        batch: &BatchSubmission,
    ) -> AppResult<Vec<AnswerSubmissionResult>>;
    async fn get_attempt_stats(&self, attempt_id: &str) -> AppResult<AttemptStats>;
    async fn pause_attempt(&self, attempt_id: &str) -> AppResult<AttemptStatusUpdate>;
    async fn resume_attempt(&self, attempt_id: &str) -> AppResult<AttemptStatusUpdate>;
    async fn complete_attempt(&self, attempt_id: &str) -> AppResult<CompletionSummary>;
    async fn delete_attempt(&self, attempt_id: &str) -> AppResult<()>;
    async fn get_attempt_review(&self, attempt_id: &str) -> AppResult<AttemptReview>;
}

/// REST implementation of [`RemoteAttemptGateway`].
pub struct HttpAttemptGateway {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl HttpAttemptGateway {
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let api_token = (!config.api_token.expose_secret().is_empty())
            .then(|| config.api_token.clone());

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_id = Uuid::new_v4().to_string();
        log::debug!("{} {} (request {})", method, path, request_id);

        let builder = self
            .client
            .request(method, self.url(path))
            .header("X-Request-Id", request_id);

        match &self.api_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_for_status(status, &body);
        log::warn!("Attempt API responded {}: {}", status, err);
        Err(err)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> AppResult<()> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_for_status(status, &body);
        log::warn!("Attempt API responded {}: {}", status, err);
        Err(err)
    }
}

#[async_trait]
impl RemoteAttemptGateway for HttpAttemptGateway {
    async fn start_attempt(
        &self,
        quiz_id: &str,
        mode: AttemptMode,
    ) -> AppResult<StartAttemptResponse> {
        let body = StartAttemptRequest {
            quiz_id: quiz_id.to_string(),
            mode,
        };
        self.send_json(self.request(Method::POST, "attempts").json(&body))
            .await
    }

    async fn get_current_question(&self, attempt_id: &str) -> AppResult<CurrentQuestionResponse> {
        let path = format!("attempts/{}/current-question", attempt_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn get_attempt_questions(&self, attempt_id: &str) -> AppResult<Vec<AttemptQuestion>> {
        let path = format!("attempts/{}/questions", attempt_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn submit_answer(
        &self,
        attempt_id: &str,
        submission: &AnswerSubmission,
        grade: bool,
    ) -> AppResult<AnswerSubmissionResult> {
        let path = format!("attempts/{}/answers", attempt_id);
        self.send_json(
            self.request(Method::POST, &path)
                .query(&[("grade", grade)])
                .json(submission),
        )
        .await
    }

    async fn submit_batch_answers(
        &self,
        attempt_id: &str,
        batch: &BatchSubmission,
    ) -> AppResult<Vec<AnswerSubmissionResult>> {
        let path = format!("attempts/{}/answers/batch", attempt_id);
        self.send_json(self.request(Method::POST, &path).json(batch))
            .await
    }

    async fn get_attempt_stats(&self, attempt_id: &str) -> AppResult<AttemptStats> {
        let path = format!("attempts/{}/stats", attempt_id);
        self.send_json(self.request(Method::GET, &path)).await
    }

    async fn pause_attempt(&self, attempt_id: &str) -> AppResult<AttemptStatusUpdate> {
        let path = format!("attempts/{}/pause", attempt_id);
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn resume_attempt(&self, attempt_id: &str) -> AppResult<AttemptStatusUpdate> {
        let path = format!("attempts/{}/resume", attempt_id);
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn complete_attempt(&self, attempt_id: &str) -> AppResult<CompletionSummary> {
        let path = format!("attempts/{}/complete", attempt_id);
        self.send_json(self.request(Method::POST, &path)).await
    }

    async fn delete_attempt(&self, attempt_id: &str) -> AppResult<()> {
        let path = format!("attempts/{}", attempt_id);
        self.send_empty(self.request(Method::DELETE, &path)).await
    }

    async fn get_attempt_review(&self, attempt_id: &str) -> AppResult<AttemptReview> {
        let path = format!("attempts/{}/review", attempt_id);
        self.send_json(self.request(Method::GET, &path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::attempt::AttemptStatus;
    use mockito::Matcher;
    use serde_json::json;

    fn gateway_for(server: &mockito::ServerGuard, token: &str) -> HttpAttemptGateway {
        let mut config = Config::test_config();
        config.api_base_url = format!("{}/api/", server.url());
        config.api_token = SecretString::from(token.to_string());
        HttpAttemptGateway::new(&config).expect("gateway should build")
    }

    #[tokio::test]
    async fn start_attempt_posts_camel_case_body_with_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/attempts")
            .match_header("authorization", "Bearer secret-token")
            .match_header("x-request-id", Matcher::Any)
            .match_body(Matcher::Json(json!({ "quizId": "quiz-1", "mode": "ONE_BY_ONE" })))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "attemptId": "attempt-1",
                    "quizId": "quiz-1",
                    "userId": "user-1",
                    "mode": "ONE_BY_ONE",
                    "status": "IN_PROGRESS",
                    "startedAt": "2026-01-05T10:00:00Z",
                    "totalQuestions": 3,
                    "firstQuestion": {
                        "id": "q1",
                        "type": "TRUE_FALSE",
                        "questionText": "Rust has a GC?",
                        "safeContent": {}
                    }
                })
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = gateway_for(&server, "secret-token");
        let started = gateway
            .start_attempt("quiz-1", AttemptMode::OneByOne)
            .await
            .expect("start should succeed");

        mock.assert_async().await;
        assert_eq!(started.attempt_id, "attempt-1");
        assert_eq!(started.first_question.unwrap().kind, "TRUE_FALSE");
    }

    #[tokio::test]
    async fn submit_answer_sends_grade_flag_and_wire_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/attempts/attempt-1/answers")
            .match_query(Matcher::UrlEncoded("grade".into(), "true".into()))
            .match_body(Matcher::Json(json!({
                "questionId": "q1",
                "response": { "answer": false }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "answerId": "ans-1",
                    "questionId": "q1",
                    "isCorrect": true,
                    "answeredAt": "2026-01-05T10:01:00Z"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let gateway = gateway_for(&server, "");
        let result = gateway
            .submit_answer(
                "attempt-1",
                &AnswerSubmission {
                    question_id: "q1".into(),
                    response: json!({ "answer": false }),
                },
                true,
            )
            .await
            .expect("submit should succeed");

        mock.assert_async().await;
        assert_eq!(result.is_correct, Some(true));
        assert!(result.next_question.is_none());
    }

    #[tokio::test]
    async fn conflict_maps_to_state_conflict() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/attempts/attempt-1/resume")
            .with_status(409)
            .with_body(r#"{"message":"already completed","status":"COMPLETED"}"#)
            .create_async()
            .await;

        let gateway = gateway_for(&server, "");
        let err = gateway.resume_attempt("attempt-1").await.unwrap_err();
        assert_eq!(
            err.conflicting_terminal_status(),
            Some(AttemptStatus::Completed)
        );
    }

    #[tokio::test]
    async fn server_error_is_retryable_and_delete_has_no_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/attempts/attempt-1/answers/batch")
            .with_status(503)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/api/attempts/attempt-1")
            .with_status(204)
            .create_async()
            .await;

        let gateway = gateway_for(&server, "");
        let err = gateway
            .submit_batch_answers("attempt-1", &BatchSubmission::default())
            .await
            .unwrap_err();
        assert!(err.is_retryable());

        gateway
            .delete_attempt("attempt-1")
            .await
            .expect("delete should succeed");
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let mut config = Config::test_config();
        config.api_base_url = "http://127.0.0.1:9".to_string();
        config.request_timeout_secs = 1;
        let gateway = HttpAttemptGateway::new(&config).unwrap();

        let err = gateway.get_attempt_stats("attempt-1").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
