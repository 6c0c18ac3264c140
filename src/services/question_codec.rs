use std::collections::{BTreeMap, BTreeSet, HashSet};

use schemars::{schema_for, Schema};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::CodecError;
use crate::models::domain::answer::AnswerState;
use crate::models::domain::question::{AttemptQuestion, QuestionType};
use crate::models::dto::wire::{
    ComplianceResponse, FillGapResponse, GapAnswer, HotspotResponse, MatchPair,
    MatchingResponse, McqMultiResponse, McqSingleResponse, OpenResponse, OrderingResponse,
    TrueFalseResponse,
};

/// An addressable piece of safe content: an option, gap, statement, item or region.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContentItem {
    pub id: String,
    #[serde(default)]
    pub text: String,
}

/// Typed view over a question's safe content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionContent {
    /// MCQ_SINGLE and MCQ_MULTI
    Options(Vec<ContentItem>),
    TrueFalse,
    Open { max_length: Option<usize> },
    Gaps(Vec<ContentItem>),
    Statements(Vec<ContentItem>),
    Items(Vec<ContentItem>),
    Regions(Vec<ContentItem>),
    Pairs {
        left: Vec<ContentItem>,
        right: Vec<ContentItem>,
    },
}

#[derive(Deserialize)]
struct OptionsContent {
    options: Vec<ContentItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenContent {
    #[serde(default)]
    max_length: Option<usize>,
}

#[derive(Deserialize)]
struct GapsContent {
    gaps: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct StatementsContent {
    statements: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct ItemsContent {
    items: Vec<ContentItem>,
}

#[derive(Deserialize)]
struct RegionsContent {
    regions: Vec<ContentItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PairsContent {
    left_items: Vec<ContentItem>,
    right_items: Vec<ContentItem>,
}

/// Encode/decode/completeness triple for one question type. Implementations
/// are pure: no I/O and no shared state.
pub trait QuestionCodec: Send + Sync {
    fn question_type(&self) -> QuestionType;

    /// Parses safe content into its typed view.
    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError>;

    /// Initial UI state for a question nobody has touched yet.
    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError>;

    /// UI state -> wire `response`.
    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError>;

    /// Whether `state` is a complete answer for this question type.
    fn is_answered(&self, content: &QuestionContent, state: &AnswerState) -> bool;

    /// Wire `response` -> UI state, for responses the server already holds.
    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError>;

    /// JSON Schema of the wire `response` this codec produces.
    fn response_schema(&self) -> Schema;
}

pub struct McqSingleCodec;
pub struct McqMultiCodec;
pub struct TrueFalseCodec;
pub struct OpenCodec;
pub struct FillGapCodec;
pub struct ComplianceCodec;
pub struct OrderingCodec;
pub struct HotspotCodec;
pub struct MatchingCodec;

/// Dispatch table keyed by question type. Exhaustive on purpose: a new
/// variant does not compile until it has a codec.
pub fn codec_for(kind: QuestionType) -> &'static dyn QuestionCodec {
    match kind {
        QuestionType::McqSingle => &McqSingleCodec,
        QuestionType::McqMulti => &McqMultiCodec,
        QuestionType::TrueFalse => &TrueFalseCodec,
        QuestionType::Open => &OpenCodec,
        QuestionType::FillGap => &FillGapCodec,
        QuestionType::Compliance => &ComplianceCodec,
        QuestionType::Ordering => &OrderingCodec,
        QuestionType::Hotspot => &HotspotCodec,
        QuestionType::Matching => &MatchingCodec,
    }
}

/// Looks a codec up by its wire tag.
pub fn codec_for_tag(tag: &str) -> Result<&'static dyn QuestionCodec, CodecError> {
    Ok(codec_for(tag.parse()?))
}

/// A question whose safe content has been parsed by its codec.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedQuestion {
    pub question_id: String,
    pub kind: QuestionType,
    pub content: QuestionContent,
}

impl DecodedQuestion {
    pub fn decode(question: &AttemptQuestion) -> Result<Self, CodecError> {
        let kind = question.question_type()?;
        let content = codec_for(kind).decode_content(&question.safe_content)?;
        Ok(Self {
            question_id: question.id.clone(),
            kind,
            content,
        })
    }

    pub fn codec(&self) -> &'static dyn QuestionCodec {
        codec_for(self.kind)
    }

    pub fn blank_state(&self) -> Result<AnswerState, CodecError> {
        self.codec().blank_state(&self.content)
    }

    pub fn encode(&self, state: &AnswerState) -> Result<Value, CodecError> {
        self.codec().encode(&self.content, state)
    }

    pub fn is_answered(&self, state: &AnswerState) -> bool {
        self.codec().is_answered(&self.content, state)
    }

    pub fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        self.codec().decode_response(response)
    }
}

fn parse_content<'a, T: Deserialize<'a>>(
    kind: QuestionType,
    safe_content: &'a Value,
) -> Result<T, CodecError> {
    T::deserialize(safe_content)
        .map_err(|e| CodecError::MalformedContent(format!("{}: {}", kind, e)))
}

fn parse_response<'a, T: Deserialize<'a>>(
    kind: QuestionType,
    response: &'a Value,
) -> Result<T, CodecError> {
    T::deserialize(response)
        .map_err(|e| CodecError::MalformedContent(format!("{} response: {}", kind, e)))
}

fn to_wire<T: Serialize>(payload: T) -> Result<Value, CodecError> {
    serde_json::to_value(payload).map_err(|e| CodecError::MalformedContent(e.to_string()))
}

fn state_mismatch(expected: QuestionType, found: &AnswerState) -> CodecError {
    CodecError::ShapeMismatch {
        expected: expected.tag(),
        found: found.question_type().tag(),
    }
}

fn content_mismatch(expected: QuestionType) -> CodecError {
    CodecError::MalformedContent(format!("content does not belong to a {} question", expected))
}

fn ensure_known<'a>(
    kind: &'static str,
    items: &[ContentItem],
    ids: impl IntoIterator<Item = &'a String>,
) -> Result<(), CodecError> {
    for id in ids {
        if !items.iter().any(|item| &item.id == id) {
            return Err(CodecError::UnknownReference {
                kind,
                id: id.clone(),
            });
        }
    }
    Ok(())
}

fn ids_of(items: &[ContentItem]) -> Vec<String> {
    items.iter().map(|item| item.id.clone()).collect()
}

impl QuestionCodec for McqSingleCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::McqSingle
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: OptionsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Options(content.options))
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Options(_) => Ok(AnswerState::McqSingle(None)),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::McqSingle(selected) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Options(options) = content else {
            return Err(content_mismatch(self.question_type()));
        };
        ensure_known("option", options, selected.iter())?;
        to_wire(McqSingleResponse {
            selected_option_id: selected.clone(),
        })
    }

    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::McqSingle(Some(_)))
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: McqSingleResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::McqSingle(wire.selected_option_id))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(McqSingleResponse)
    }
}

impl QuestionCodec for McqMultiCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::McqMulti
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: OptionsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Options(content.options))
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Options(_) => Ok(AnswerState::McqMulti(BTreeSet::new())),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::McqMulti(selected) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Options(options) = content else {
            return Err(content_mismatch(self.question_type()));
        };
        ensure_known("option", options, selected.iter())?;
        to_wire(McqMultiResponse {
            selected_option_ids: selected.iter().cloned().collect(),
        })
    }

    // An empty selection is still an answer; "unanswered" means no record at all.
    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::McqMulti(_))
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: McqMultiResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::McqMulti(
            wire.selected_option_ids.into_iter().collect(),
        ))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(McqMultiResponse)
    }
}

impl QuestionCodec for TrueFalseCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::TrueFalse
    }

    fn decode_content(&self, _safe_content: &Value) -> Result<QuestionContent, CodecError> {
        Ok(QuestionContent::TrueFalse)
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::TrueFalse => Ok(AnswerState::TrueFalse(None)),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, _content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::TrueFalse(answer) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        to_wire(TrueFalseResponse { answer: *answer })
    }

    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::TrueFalse(Some(_)))
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: TrueFalseResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::TrueFalse(wire.answer))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(TrueFalseResponse)
    }
}

impl QuestionCodec for OpenCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::Open
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        if safe_content.is_null() {
            return Ok(QuestionContent::Open { max_length: None });
        }
        let content: OpenContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Open {
            max_length: content.max_length,
        })
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Open { .. } => Ok(AnswerState::Open(String::new())),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, _content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::Open(text) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        to_wire(OpenResponse {
            answer: text.clone(),
        })
    }

    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::Open(text) if !text.trim().is_empty())
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: OpenResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::Open(wire.answer))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(OpenResponse)
    }
}

impl QuestionCodec for FillGapCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::FillGap
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: GapsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Gaps(content.gaps))
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Gaps(_) => Ok(AnswerState::FillGap(BTreeMap::new())),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::FillGap(filled) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Gaps(gaps) = content else {
            return Err(content_mismatch(self.question_type()));
        };
        ensure_known("gap", gaps, filled.keys())?;

        // Content order; gaps left empty are omitted rather than sent blank.
        let answers = gaps
            .iter()
            .filter_map(|gap| {
                let answer = filled.get(&gap.id)?.trim();
                (!answer.is_empty()).then(|| GapAnswer {
                    gap_id: gap.id.clone(),
                    answer: answer.to_string(),
                })
            })
            .collect();
        to_wire(FillGapResponse { answers })
    }

    fn is_answered(&self, content: &QuestionContent, state: &AnswerState) -> bool {
        let (QuestionContent::Gaps(gaps), AnswerState::FillGap(filled)) = (content, state) else {
            return false;
        };
        gaps.iter().any(|gap| {
            filled
                .get(&gap.id)
                .is_some_and(|answer| !answer.trim().is_empty())
        })
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: FillGapResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::FillGap(
            wire.answers
                .into_iter()
                .map(|gap| (gap.gap_id, gap.answer))
                .collect(),
        ))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(FillGapResponse)
    }
}

impl QuestionCodec for ComplianceCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::Compliance
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: StatementsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Statements(content.statements))
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Statements(_) => Ok(AnswerState::Compliance(BTreeSet::new())),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::Compliance(selected) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Statements(statements) = content else {
            return Err(content_mismatch(self.question_type()));
        };
        ensure_known("statement", statements, selected.iter())?;
        to_wire(ComplianceResponse {
            selected_statement_ids: selected.iter().cloned().collect(),
        })
    }

    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::Compliance(_))
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: ComplianceResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::Compliance(
            wire.selected_statement_ids.into_iter().collect(),
        ))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(ComplianceResponse)
    }
}

impl OrderingCodec {
    fn check_permutation(items: &[ContentItem], ordered: &[String]) -> Result<(), CodecError> {
        ensure_known("item", items, ordered.iter())?;

        let mut seen = HashSet::with_capacity(ordered.len());
        for id in ordered {
            if !seen.insert(id) {
                return Err(CodecError::DuplicateItem(id.clone()));
            }
        }

        if ordered.len() != items.len() {
            return Err(CodecError::IncompleteOrdering {
                expected: items.len(),
                found: ordered.len(),
            });
        }
        Ok(())
    }
}

impl QuestionCodec for OrderingCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::Ordering
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: ItemsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Items(content.items))
    }

    // Starts from the order the server presented (already shuffled).
    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Items(items) => Ok(AnswerState::Ordering(ids_of(items))),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::Ordering(ordered) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Items(items) = content else {
            return Err(content_mismatch(self.question_type()));
        };
        Self::check_permutation(items, ordered)?;
        to_wire(OrderingResponse {
            ordered_item_ids: ordered.clone(),
        })
    }

    fn is_answered(&self, content: &QuestionContent, state: &AnswerState) -> bool {
        let (QuestionContent::Items(items), AnswerState::Ordering(ordered)) = (content, state) else {
            return false;
        };
        Self::check_permutation(items, ordered).is_ok()
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: OrderingResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::Ordering(wire.ordered_item_ids))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(OrderingResponse)
    }
}

impl QuestionCodec for HotspotCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::Hotspot
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: RegionsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Regions(content.regions))
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Regions(_) => Ok(AnswerState::Hotspot(None)),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::Hotspot(region) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Regions(regions) = content else {
            return Err(content_mismatch(self.question_type()));
        };
        ensure_known("region", regions, region.iter())?;
        to_wire(HotspotResponse {
            region_id: region.clone(),
        })
    }

    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::Hotspot(Some(_)))
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: HotspotResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::Hotspot(wire.region_id))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(HotspotResponse)
    }
}

impl QuestionCodec for MatchingCodec {
    fn question_type(&self) -> QuestionType {
        QuestionType::Matching
    }

    fn decode_content(&self, safe_content: &Value) -> Result<QuestionContent, CodecError> {
        let content: PairsContent = parse_content(self.question_type(), safe_content)?;
        Ok(QuestionContent::Pairs {
            left: content.left_items,
            right: content.right_items,
        })
    }

    fn blank_state(&self, content: &QuestionContent) -> Result<AnswerState, CodecError> {
        match content {
            QuestionContent::Pairs { left, .. } => Ok(AnswerState::Matching(
                left.iter().map(|item| (item.id.clone(), None)).collect(),
            )),
            _ => Err(content_mismatch(self.question_type())),
        }
    }

    fn encode(&self, content: &QuestionContent, state: &AnswerState) -> Result<Value, CodecError> {
        let AnswerState::Matching(chosen) = state else {
            return Err(state_mismatch(self.question_type(), state));
        };
        let QuestionContent::Pairs { left, right } = content else {
            return Err(content_mismatch(self.question_type()));
        };
        ensure_known("left item", left, chosen.keys())?;
        ensure_known("right item", right, chosen.values().flatten())?;

        // Pending pairs (right side not chosen yet) are not encoded.
        let matches = left
            .iter()
            .filter_map(|item| {
                let right_id = chosen.get(&item.id)?.as_ref()?;
                Some(MatchPair {
                    left_item_id: item.id.clone(),
                    right_item_id: right_id.clone(),
                })
            })
            .collect();
        to_wire(MatchingResponse { matches })
    }

    fn is_answered(&self, _content: &QuestionContent, state: &AnswerState) -> bool {
        matches!(state, AnswerState::Matching(chosen) if chosen.values().any(Option::is_some))
    }

    fn decode_response(&self, response: &Value) -> Result<AnswerState, CodecError> {
        let wire: MatchingResponse = parse_response(self.question_type(), response)?;
        Ok(AnswerState::Matching(
            wire.matches
                .into_iter()
                .map(|pair| (pair.left_item_id, Some(pair.right_item_id)))
                .collect(),
        ))
    }

    fn response_schema(&self) -> Schema {
        schema_for!(MatchingResponse)
    }
}
