use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::{AppError, AppResult, CodecError};
use crate::models::domain::answer::{AnswerEdit, AnswerRecord, AnswerState};
use crate::models::domain::question::AttemptQuestion;
use crate::models::dto::request::AnswerSubmission;
use crate::services::question_codec::{DecodedQuestion, QuestionContent};

/// What the user has answered so far in one attempt.
///
/// Holds UI-shaped state only; answers are encoded to their wire shape at the
/// submission boundary. One record per question, created on first edit.
#[derive(Debug, Default)]
pub struct AnswerStore {
    order: Vec<String>,
    questions: HashMap<String, DecodedQuestion>,
    unsupported: HashMap<String, CodecError>,
    records: HashMap<String, AnswerRecord>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a question's safe content and makes it answerable.
    ///
    /// Re-registering keeps any local record. A `savedResponse` from the server
    /// seeds a clean, already-synced record when nothing is held locally.
    /// A question that cannot be decoded is still listed, and every later
    /// operation on it fails with the decode error.
    pub fn register(&mut self, question: &AttemptQuestion) -> AppResult<()> {
        if !self.order.contains(&question.id) {
            self.order.push(question.id.clone());
        }

        let decoded = match DecodedQuestion::decode(question) {
            Ok(decoded) => decoded,
            Err(e) => {
                self.questions.remove(&question.id);
                self.unsupported.insert(question.id.clone(), e.clone());
                return Err(e.into());
            }
        };
        self.unsupported.remove(&question.id);

        if let Some(saved) = &question.saved_response {
            if !self.records.contains_key(&question.id) {
                match Self::seed_record(&decoded, saved) {
                    Ok(record) => {
                        self.records.insert(question.id.clone(), record);
                    }
                    Err(e) => log::warn!(
                        "Ignoring saved response for question {}: {}",
                        question.id,
                        e
                    ),
                }
            }
        }

        self.questions.insert(question.id.clone(), decoded);
        Ok(())
    }

    pub fn register_all(&mut self, questions: &[AttemptQuestion]) -> AppResult<()> {
        questions.iter().try_for_each(|q| self.register(q))
    }

    fn seed_record(decoded: &DecodedQuestion, saved: &Value) -> Result<AnswerRecord, CodecError> {
        let state = decoded.decode_response(saved)?;
        let canonical = decoded.encode(&state)?;
        Ok(AnswerRecord {
            question_id: decoded.question_id.clone(),
            user_response: state,
            dirty: false,
            last_synced_response: Some(canonical),
            last_synced_at: None,
        })
    }

    pub fn question(&self, question_id: &str) -> Option<&DecodedQuestion> {
        self.questions.get(question_id)
    }

    pub fn question_ids(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Questions listed in this attempt that the client cannot answer.
    pub fn unsupported(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.unsupported.contains_key(*id))
            .cloned()
            .collect()
    }

    /// Fails with the decode error for a question the client cannot answer.
    pub fn ensure_supported(&self, question_id: &str) -> AppResult<()> {
        match self.unsupported.get(question_id) {
            Some(e) => Err(AppError::Encoding(e.clone())),
            None => Ok(()),
        }
    }

    fn decoded(&self, question_id: &str) -> AppResult<&DecodedQuestion> {
        self.ensure_supported(question_id)?;
        self.questions.get(question_id).ok_or_else(|| {
            AppError::NotFound(format!("Question '{}' is not part of this attempt", question_id))
        })
    }

    pub fn record(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.records.get(question_id)
    }

    pub fn response(&self, question_id: &str) -> Option<&AnswerState> {
        self.records.get(question_id).map(|r| &r.user_response)
    }

    pub fn blank(&self, question_id: &str) -> AppResult<AnswerState> {
        Ok(self.decoded(question_id)?.blank_state()?)
    }

    /// Stored response, or the blank UI state when the question is untouched.
    pub fn current_or_blank(&self, question_id: &str) -> AppResult<AnswerState> {
        if let Some(state) = self.response(question_id) {
            return Ok(state.clone());
        }
        self.blank(question_id)
    }

    /// Replaces the stored response wholesale and marks it dirty.
    pub fn set(&mut self, question_id: &str, response: AnswerState) -> AppResult<()> {
        let decoded = self.decoded(question_id)?;

        if response.question_type() != decoded.kind {
            return Err(CodecError::ShapeMismatch {
                expected: decoded.kind.tag(),
                found: response.question_type().tag(),
            }
            .into());
        }

        if let (QuestionContent::Open { max_length: Some(max) }, AnswerState::Open(text)) =
            (&decoded.content, &response)
        {
            if text.chars().count() > *max {
                return Err(AppError::Validation(format!(
                    "Answer exceeds {} characters",
                    max
                )));
            }
        }

        match self.records.get_mut(question_id) {
            Some(record) => {
                record.user_response = response;
                record.dirty = true;
            }
            None => {
                self.records
                    .insert(question_id.to_string(), AnswerRecord::new(question_id, response));
            }
        }
        Ok(())
    }

    /// Applies an edit, merging by key for FILL_GAP, MATCHING and ORDERING.
    pub fn apply(&mut self, question_id: &str, edit: AnswerEdit) -> AppResult<()> {
        let next = match edit {
            AnswerEdit::Replace(state) => state,
            AnswerEdit::Gap { gap_id, text } => match self.current_or_blank(question_id)? {
                AnswerState::FillGap(mut gaps) => {
                    if text.trim().is_empty() {
                        gaps.remove(&gap_id);
                    } else {
                        gaps.insert(gap_id, text);
                    }
                    AnswerState::FillGap(gaps)
                }
                other => return Err(Self::edit_mismatch("FILL_GAP", &other)),
            },
            AnswerEdit::Match { left_id, right_id } => {
                match self.current_or_blank(question_id)? {
                    AnswerState::Matching(mut pairs) => {
                        pairs.insert(left_id, right_id);
                        AnswerState::Matching(pairs)
                    }
                    other => return Err(Self::edit_mismatch("MATCHING", &other)),
                }
            }
            AnswerEdit::Move { item_id, position } => {
                match self.current_or_blank(question_id)? {
                    AnswerState::Ordering(mut items) => {
                        items.retain(|id| id != &item_id);
                        let position = position.min(items.len());
                        items.insert(position, item_id);
                        AnswerState::Ordering(items)
                    }
                    other => return Err(Self::edit_mismatch("ORDERING", &other)),
                }
            }
        };
        self.set(question_id, next)
    }

    fn edit_mismatch(expected: &'static str, found: &AnswerState) -> AppError {
        CodecError::ShapeMismatch {
            expected,
            found: found.question_type().tag(),
        }
        .into()
    }

    /// Records a server acknowledgement of `response` (wire shape).
    ///
    /// The record only becomes clean if the user has not edited it away from
    /// what was sent while the request was in flight.
    pub fn mark_synced(&mut self, question_id: &str, response: Value) -> AppResult<()> {
        self.mark_synced_at(question_id, response, Utc::now())
    }

    pub fn mark_synced_at(
        &mut self,
        question_id: &str,
        response: Value,
        synced_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.ensure_supported(question_id)?;
        let decoded = self.questions.get(question_id).ok_or_else(|| {
            AppError::NotFound(format!("Question '{}' is not part of this attempt", question_id))
        })?;
        let record = self.records.get_mut(question_id).ok_or_else(|| {
            AppError::NotFound(format!("No answer recorded for question '{}'", question_id))
        })?;

        let current = decoded.encode(&record.user_response).ok();
        record.dirty = current.as_ref() != Some(&response);
        record.last_synced_response = Some(response);
        record.last_synced_at = Some(synced_at);
        Ok(())
    }

    fn is_unsynced(&self, record: &AnswerRecord) -> bool {
        if !record.dirty {
            return false;
        }
        let Some(decoded) = self.questions.get(&record.question_id) else {
            return true;
        };
        match decoded.encode(&record.user_response) {
            Ok(wire) => record.last_synced_response.as_ref() != Some(&wire),
            // Unencodable answers stay visible so the submission surfaces the error.
            Err(_) => true,
        }
    }

    /// Dirty records whose wire shape differs from the last synced one, in
    /// question order.
    pub fn diff_dirty(&self) -> Vec<&AnswerRecord> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(|record| self.is_unsynced(record))
            .collect()
    }

    pub fn has_unsynced(&self) -> bool {
        self.records.values().any(|record| self.is_unsynced(record))
    }

    /// Encodes one stored answer for submission.
    pub fn encode(&self, question_id: &str) -> AppResult<Value> {
        let decoded = self.decoded(question_id)?;
        let state = self.response(question_id).ok_or_else(|| {
            AppError::Validation(format!("Question '{}' has not been answered", question_id))
        })?;
        Ok(decoded.encode(state)?)
    }

    /// Encodes every unsynced answer. Fails on the first answer that cannot be
    /// encoded, leaving the store untouched.
    pub fn encode_dirty(&self) -> AppResult<Vec<AnswerSubmission>> {
        self.diff_dirty()
            .into_iter()
            .map(|record| {
                Ok(AnswerSubmission {
                    question_id: record.question_id.clone(),
                    response: self.encode(&record.question_id)?,
                })
            })
            .collect()
    }

    /// Uses the per-type completeness predicate, not truthiness.
    pub fn is_answered(&self, question_id: &str) -> bool {
        match (self.questions.get(question_id), self.records.get(question_id)) {
            (Some(decoded), Some(record)) => decoded.is_answered(&record.user_response),
            _ => false,
        }
    }

    pub fn answered_count(&self) -> usize {
        self.order.iter().filter(|id| self.is_answered(id)).count()
    }

    pub fn unanswered(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| !self.is_answered(id))
            .cloned()
            .collect()
    }
}
