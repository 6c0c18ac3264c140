use mockito::Matcher;
use secrecy::SecretString;
use serde_json::json;

use tento_attempts::{
    app_state::AppState,
    config::Config,
    models::domain::{AnswerState, AttemptMode, QuestionType, SessionStatus},
    services::{codec_for, QuestionCodec},
};

fn config_for(server: &mockito::ServerGuard) -> Config {
    Config {
        api_base_url: format!("{}/api", server.url()),
        api_token: SecretString::from("integration-token".to_string()),
        request_timeout_secs: 5,
        auto_save_interval_secs: 30,
        grade_on_submit: true,
        refresh_stats_after_submit: true,
    }
}

#[tokio::test]
async fn test_one_by_one_attempt_over_http() {
    let mut server = mockito::Server::new_async().await;

    let start = server
        .mock("POST", "/api/attempts")
        .match_header("authorization", "Bearer integration-token")
        .match_body(Matcher::Json(json!({ "quizId": "quiz-9", "mode": "ONE_BY_ONE" })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "attemptId": "att-9",
                "quizId": "quiz-9",
                "mode": "ONE_BY_ONE",
                "startedAt": "2026-03-01T09:00:00Z",
                "totalQuestions": 1,
                "firstQuestion": {
                    "id": "q1",
                    "type": "MATCHING",
                    "questionText": "Match the crate to its purpose",
                    "safeContent": {
                        "leftItems": [ { "id": "l1", "text": "serde" }, { "id": "l2", "text": "tokio" } ],
                        "rightItems": [ { "id": "r1", "text": "async runtime" }, { "id": "r2", "text": "serialization" } ]
                    }
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let answer = server
        .mock("POST", "/api/attempts/att-9/answers")
        .match_query(Matcher::UrlEncoded("grade".into(), "true".into()))
        .match_body(Matcher::Json(json!({
            "questionId": "q1",
            "response": { "matches": [
                { "leftItemId": "l1", "rightItemId": "r2" },
                { "leftItemId": "l2", "rightItemId": "r1" }
            ]}
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "answerId": "ans-1",
                "questionId": "q1",
                "isCorrect": true,
                "score": 1.0,
                "answeredAt": "2026-03-01T09:01:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let stats = server
        .mock("GET", "/api/attempts/att-9/stats")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "questionsAnswered": 1, "completionPercentage": 100.0 }).to_string())
        .create_async()
        .await;

    let complete = server
        .mock("POST", "/api/attempts/att-9/complete")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "attemptId": "att-9",
                "status": "COMPLETED",
                "score": 1.0,
                "maxScore": 1.0,
                "completedAt": "2026-03-01T09:02:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let state = AppState::new(config_for(&server)).expect("state should build");
    let session = state.new_session();

    session.start("quiz-9", AttemptMode::OneByOne).await.unwrap();
    session
        .set_answer(
            "q1",
            AnswerState::Matching(
                [
                    ("l1".to_string(), Some("r2".to_string())),
                    ("l2".to_string(), Some("r1".to_string())),
                ]
                .into(),
            ),
        )
        .await
        .unwrap();

    let outcome = session.submit_current().await.unwrap();
    assert_eq!(outcome.result.is_correct, Some(true));
    assert!(outcome.completion.is_some());
    assert_eq!(session.status().await, SessionStatus::Completed);

    let progress = session.progress().await;
    assert_eq!(progress.questions_answered, 1);
    assert_eq!(progress.total_questions, 1);

    start.assert_async().await;
    answer.assert_async().await;
    stats.assert_async().await;
    complete.assert_async().await;
}

#[tokio::test]
async fn test_server_failure_surfaces_and_keeps_answers() {
    let mut server = mockito::Server::new_async().await;

    server
        .mock("POST", "/api/attempts")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "attemptId": "att-2",
                "quizId": "quiz-2",
                "mode": "ALL_AT_ONCE",
                "startedAt": "2026-03-01T09:00:00Z",
                "totalQuestions": 1,
                "questions": [
                    { "id": "q1", "type": "COMPLIANCE", "questionText": "Select the safe practices",
                      "safeContent": { "statements": [ { "id": "s1", "text": "Review unsafe blocks" } ] } }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("POST", "/api/attempts/att-2/answers/batch")
        .with_status(502)
        .with_body("upstream unavailable")
        .create_async()
        .await;

    let mut config = config_for(&server);
    config.refresh_stats_after_submit = false;
    let state = AppState::new(config).unwrap();
    let session = state.new_session();

    session.start("quiz-2", AttemptMode::AllAtOnce).await.unwrap();
    session
        .set_answer("q1", AnswerState::Compliance(["s1".to_string()].into()))
        .await
        .unwrap();

    let err = session.save_now().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.error_code(), "TRANSIENT_SERVER_ERROR");
    assert!(session.has_unsynced_answers().await);
    assert!(session.last_save_error().await.is_some());
}

#[test]
fn test_every_question_type_publishes_a_response_schema() {
    for kind in QuestionType::ALL {
        let codec = codec_for(kind);
        assert_eq!(codec.question_type(), kind);

        let schema = serde_json::to_value(codec.response_schema()).unwrap();
        assert!(schema.is_object(), "{} schema should be an object", kind);
    }
}
