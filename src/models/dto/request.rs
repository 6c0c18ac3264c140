use serde::{Deserialize, Serialize};

use crate::models::domain::attempt::AttemptMode;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAttemptRequest {
    pub quiz_id: String,
    pub mode: AttemptMode,
}

/// `{questionId, response}` where `response` is one of the per-type wire shapes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerSubmission {
    pub question_id: String,
    pub response: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubmission {
    pub answers: Vec<AnswerSubmission>,
}

impl BatchSubmission {
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn batch_submission_serializes_camel_case() {
        let batch = BatchSubmission {
            answers: vec![AnswerSubmission {
                question_id: "q-1".to_string(),
                response: json!({ "selectedOptionId": "a" }),
            }],
        };

        let value = serde_json::to_value(&batch).expect("batch should serialize");
        assert_eq!(
            value,
            json!({
                "answers": [
                    { "questionId": "q-1", "response": { "selectedOptionId": "a" } }
                ]
            })
        );
    }

    #[test]
    fn start_request_carries_mode_tag() {
        let request = StartAttemptRequest {
            quiz_id: "quiz-1".to_string(),
            mode: AttemptMode::AllAtOnce,
        };
        let value = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(value, json!({ "quizId": "quiz-1", "mode": "ALL_AT_ONCE" }));
    }
}
