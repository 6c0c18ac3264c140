use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::domain::question::QuestionType;

/// Editable, UI-shaped answer for one question.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerState {
    McqSingle(Option<String>),
    McqMulti(BTreeSet<String>),
    TrueFalse(Option<bool>),
    Open(String),
    /// gap id -> typed text
    FillGap(BTreeMap<String, String>),
    Compliance(BTreeSet<String>),
    /// item ids in the user's chosen order
    Ordering(Vec<String>),
    Hotspot(Option<String>),
    /// left id -> chosen right id; `None` while the right side is pending
    Matching(BTreeMap<String, Option<String>>),
}

impl AnswerState {
    pub fn question_type(&self) -> QuestionType {
        match self {
            AnswerState::McqSingle(_) => QuestionType::McqSingle,
            AnswerState::McqMulti(_) => QuestionType::McqMulti,
            AnswerState::TrueFalse(_) => QuestionType::TrueFalse,
            AnswerState::Open(_) => QuestionType::Open,
            AnswerState::FillGap(_) => QuestionType::FillGap,
            AnswerState::Compliance(_) => QuestionType::Compliance,
            AnswerState::Ordering(_) => QuestionType::Ordering,
            AnswerState::Hotspot(_) => QuestionType::Hotspot,
            AnswerState::Matching(_) => QuestionType::Matching,
        }
    }
}

/// A keyed edit on a composite answer. Everything else is replaced wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnswerEdit {
    Replace(AnswerState),
    /// Set one gap; blank text clears the gap.
    Gap { gap_id: String, text: String },
    /// Choose (or clear) the right side for one left item.
    Match {
        left_id: String,
        right_id: Option<String>,
    },
    /// Move an item to a zero-based position, clamped to the list length.
    Move { item_id: String, position: usize },
}

/// One stored answer with its sync bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub user_response: AnswerState,
    pub dirty: bool,
    /// Wire-shaped response last acknowledged by the server.
    pub last_synced_response: Option<serde_json::Value>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl AnswerRecord {
    pub fn new(question_id: impl Into<String>, user_response: AnswerState) -> Self {
        Self {
            question_id: question_id.into(),
            user_response,
            dirty: true,
            last_synced_response: None,
            last_synced_at: None,
        }
    }
}
