use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::attempt::{Attempt, AttemptMode, AttemptStatus};
use crate::models::domain::question::AttemptQuestion;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptResponse {
    pub attempt_id: String,
    pub quiz_id: String,
    #[serde(default)]
    pub user_id: String,
    pub mode: AttemptMode,
    #[serde(default = "default_in_progress")]
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub total_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
    /// ONE_BY_ONE only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_question: Option<AttemptQuestion>,
    /// ALL_AT_ONCE / TIMED: the full, already shuffled set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<AttemptQuestion>,
}

fn default_in_progress() -> AttemptStatus {
    AttemptStatus::InProgress
}

impl From<&StartAttemptResponse> for Attempt {
    fn from(response: &StartAttemptResponse) -> Self {
        Attempt {
            attempt_id: response.attempt_id.clone(),
            quiz_id: response.quiz_id.clone(),
            user_id: response.user_id.clone(),
            mode: response.mode,
            status: response.status,
            started_at: response.started_at,
            completed_at: None,
            total_questions: response.total_questions,
            time_limit_minutes: response.time_limit_minutes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentQuestionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<AttemptQuestion>,
    pub question_number: u32,
    pub total_questions: u32,
    pub attempt_status: AttemptStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmissionResult {
    pub answer_id: String,
    pub question_id: String,
    /// Only present when grading-on-submit was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// ONE_BY_ONE only; absent after the last question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_question: Option<AttemptQuestion>,
    pub answered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStats {
    pub questions_answered: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_questions: Option<u32>,
    pub completion_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_question_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AttemptStatus>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptStatusUpdate {
    pub attempt_id: String,
    pub status: AttemptStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub attempt_id: String,
    pub status: AttemptStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewedAnswer {
    pub question_id: String,
    #[serde(default)]
    pub response: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReview {
    pub attempt_id: String,
    pub answers: Vec<ReviewedAnswer>,
}
