use serde::{Deserialize, Serialize};

/// Progress as shown to the user. Derived, never stored on its own.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub questions_answered: u32,
    pub total_questions: u32,
    pub completion_percentage: f64,
    /// 1-based.
    pub current_question_number: u32,
    /// True when `total_questions` was estimated from a percentage.
    #[serde(default)]
    pub total_is_estimate: bool,
}

impl ProgressSnapshot {
    pub fn is_complete(&self) -> bool {
        self.total_questions > 0 && self.questions_answered >= self.total_questions
    }
}
