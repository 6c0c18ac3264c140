#[cfg(test)]
pub mod fixtures {
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    use crate::models::domain::attempt::{AttemptMode, AttemptStatus};
    use crate::models::domain::question::AttemptQuestion;
    use crate::models::dto::response::{
        AnswerSubmissionResult, AttemptStats, AttemptStatusUpdate, CompletionSummary,
        StartAttemptResponse,
    };

    /// Builds a question with the given wire tag and safe content
    pub fn question(id: &str, kind: &str, safe_content: Value) -> AttemptQuestion {
        AttemptQuestion {
            id: id.to_string(),
            kind: kind.to_string(),
            difficulty: Some("MEDIUM".to_string()),
            question_text: format!("Question {}", id),
            safe_content,
            hint: None,
            attachment_id: None,
            saved_response: None,
        }
    }

    pub fn mcq_single(id: &str) -> AttemptQuestion {
        question(
            id,
            "MCQ_SINGLE",
            json!({ "options": [
                { "id": "a", "text": "Alpha" },
                { "id": "b", "text": "Beta" },
                { "id": "c", "text": "Gamma" }
            ]}),
        )
    }

    pub fn mcq_multi(id: &str) -> AttemptQuestion {
        let mut q = mcq_single(id);
        q.kind = "MCQ_MULTI".to_string();
        q
    }

    pub fn true_false(id: &str) -> AttemptQuestion {
        question(id, "TRUE_FALSE", json!({}))
    }

    pub fn open(id: &str) -> AttemptQuestion {
        question(id, "OPEN", json!({ "maxLength": 200 }))
    }

    pub fn fill_gap(id: &str) -> AttemptQuestion {
        question(
            id,
            "FILL_GAP",
            json!({
                "text": "The sky is [g1] and the sea is [g2], the grass [g3].",
                "gaps": [ { "id": "g1" }, { "id": "g2" }, { "id": "g3" } ]
            }),
        )
    }

    pub fn compliance(id: &str) -> AttemptQuestion {
        question(
            id,
            "COMPLIANCE",
            json!({ "statements": [
                { "id": "s1", "text": "Wear a helmet" },
                { "id": "s2", "text": "Skip the briefing" }
            ]}),
        )
    }

    pub fn ordering(id: &str) -> AttemptQuestion {
        question(
            id,
            "ORDERING",
            json!({ "items": [
                { "id": "i1", "text": "First" },
                { "id": "i2", "text": "Second" },
                { "id": "i3", "text": "Third" }
            ]}),
        )
    }

    pub fn hotspot(id: &str) -> AttemptQuestion {
        question(
            id,
            "HOTSPOT",
            json!({
                "imageUrl": "https://example.com/plan.png",
                "regions": [ { "id": "r1" }, { "id": "r2" } ]
            }),
        )
    }

    pub fn matching(id: &str) -> AttemptQuestion {
        question(
            id,
            "MATCHING",
            json!({
                "leftItems": [ { "id": "l1", "text": "Rust" }, { "id": "l2", "text": "Go" } ],
                "rightItems": [ { "id": "r1", "text": "Ferris" }, { "id": "r2", "text": "Gopher" } ]
            }),
        )
    }

    /// Creates a started attempt; ONE_BY_ONE gets the first question, batched
    /// modes get the whole set
    pub fn started(mode: AttemptMode, questions: Vec<AttemptQuestion>) -> StartAttemptResponse {
        let total = questions.len() as u32;
        let (first_question, questions) = if mode.is_batched() {
            (None, questions)
        } else {
            (questions.into_iter().next(), Vec::new())
        };

        StartAttemptResponse {
            attempt_id: "attempt-1".to_string(),
            quiz_id: "quiz-1".to_string(),
            user_id: "user-1".to_string(),
            mode,
            status: AttemptStatus::InProgress,
            started_at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
            total_questions: total,
            time_limit_minutes: matches!(mode, AttemptMode::Timed).then_some(20),
            first_question,
            questions,
        }
    }

    pub fn submission_result(
        question_id: &str,
        next_question: Option<AttemptQuestion>,
    ) -> AnswerSubmissionResult {
        AnswerSubmissionResult {
            answer_id: format!("ans-{}", question_id),
            question_id: question_id.to_string(),
            is_correct: None,
            score: None,
            next_question,
            answered_at: Utc::now(),
        }
    }

    pub fn stats(answered: u32, total: u32) -> AttemptStats {
        AttemptStats {
            questions_answered: answered,
            total_questions: Some(total),
            completion_percentage: f64::from(answered) / f64::from(total.max(1)) * 100.0,
            current_question_number: None,
            status: Some(AttemptStatus::InProgress),
        }
    }

    pub fn status_update(status: AttemptStatus) -> AttemptStatusUpdate {
        AttemptStatusUpdate {
            attempt_id: "attempt-1".to_string(),
            status,
        }
    }

    pub fn completion_summary() -> CompletionSummary {
        CompletionSummary {
            attempt_id: "attempt-1".to_string(),
            status: AttemptStatus::Completed,
            score: Some(2.0),
            max_score: Some(3.0),
            completed_at: Some(Utc.with_ymd_and_hms(2026, 1, 5, 10, 15, 0).unwrap()),
        }
    }
}

#[cfg(test)]
pub mod test_helpers {
    use crate::errors::AppError;

    /// Asserts that an error was raised locally, before any network call
    pub fn assert_local_error(err: &AppError) {
        assert!(err.is_local(), "Expected a local error, got: {}", err);
    }

    /// Asserts that an error is one the UI should offer to retry
    pub fn assert_retryable(err: &AppError) {
        assert!(err.is_retryable(), "Expected a retryable error, got: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::models::domain::attempt::AttemptMode;

    #[test]
    fn test_fixtures_question_kinds() {
        assert_eq!(mcq_single("q").kind, "MCQ_SINGLE");
        assert_eq!(mcq_multi("q").kind, "MCQ_MULTI");
        assert_eq!(matching("q").kind, "MATCHING");
    }

    #[test]
    fn test_fixtures_started_one_by_one() {
        let started = started(AttemptMode::OneByOne, vec![open("q1"), open("q2")]);
        assert_eq!(started.total_questions, 2);
        assert_eq!(started.first_question.unwrap().id, "q1");
        assert!(started.questions.is_empty());
    }

    #[test]
    fn test_fixtures_started_batched() {
        let started = started(AttemptMode::Timed, vec![open("q1"), open("q2")]);
        assert!(started.first_question.is_none());
        assert_eq!(started.questions.len(), 2);
        assert_eq!(started.time_limit_minutes, Some(20));
    }
}
