use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CodecError;

/// The nine question-content shapes an attempt can contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    McqSingle,
    McqMulti,
    TrueFalse,
    Open,
    FillGap,
    Compliance,
    Ordering,
    Hotspot,
    Matching,
}

impl QuestionType {
    pub const ALL: [QuestionType; 9] = [
        QuestionType::McqSingle,
        QuestionType::McqMulti,
        QuestionType::TrueFalse,
        QuestionType::Open,
        QuestionType::FillGap,
        QuestionType::Compliance,
        QuestionType::Ordering,
        QuestionType::Hotspot,
        QuestionType::Matching,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            QuestionType::McqSingle => "MCQ_SINGLE",
            QuestionType::McqMulti => "MCQ_MULTI",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::Open => "OPEN",
            QuestionType::FillGap => "FILL_GAP",
            QuestionType::Compliance => "COMPLIANCE",
            QuestionType::Ordering => "ORDERING",
            QuestionType::Hotspot => "HOTSPOT",
            QuestionType::Matching => "MATCHING",
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = CodecError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| CodecError::UnsupportedQuestionType(tag.to_string()))
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// A question as served during an active attempt. `safe_content` never
/// carries solution data.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptQuestion {
    pub id: String,
    // Kept as the raw tag so unknown kinds surface as a codec error instead of
    // failing the whole payload.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub question_text: String,
    #[serde(default)]
    pub safe_content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    /// Response the server already holds for this question, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_response: Option<serde_json::Value>,
}

impl AttemptQuestion {
    pub fn question_type(&self) -> Result<QuestionType, CodecError> {
        self.kind.parse()
    }
}
