use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How questions are delivered during an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptMode {
    OneByOne,
    AllAtOnce,
    Timed,
}

impl AttemptMode {
    /// A timed attempt keeps its clock running server-side, so it cannot be paused.
    pub fn supports_pause(&self) -> bool {
        !matches!(self, AttemptMode::Timed)
    }

    /// Modes where answers are collected locally and flushed in batches.
    pub fn is_batched(&self) -> bool {
        matches!(self, AttemptMode::AllAtOnce | AttemptMode::Timed)
    }
}

impl std::fmt::Display for AttemptMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptMode::OneByOne => write!(f, "ONE_BY_ONE"),
            AttemptMode::AllAtOnce => write!(f, "ALL_AT_ONCE"),
            AttemptMode::Timed => write!(f, "TIMED"),
        }
    }
}

/// Attempt status as reported by the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

impl AttemptStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptStatus::Completed | AttemptStatus::Abandoned)
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptStatus::InProgress => write!(f, "IN_PROGRESS"),
            AttemptStatus::Paused => write!(f, "PAUSED"),
            AttemptStatus::Completed => write!(f, "COMPLETED"),
            AttemptStatus::Abandoned => write!(f, "ABANDONED"),
        }
    }
}

/// Lifecycle state of the local session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    NotStarted,
    InProgress,
    Paused,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Abandoned)
    }

    /// Transitions are monotonic except for Paused <-> InProgress.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::{Abandoned, Completed, InProgress, NotStarted, Paused};

        match (*self, next) {
            (NotStarted, InProgress) => true,
            (InProgress, InProgress) => true,
            (InProgress, Paused) | (Paused, InProgress) => true,
            (NotStarted, Completed | Abandoned) => false,
            (InProgress | Paused, Completed | Abandoned) => true,
            _ => false,
        }
    }
}

impl From<AttemptStatus> for SessionStatus {
    fn from(status: AttemptStatus) -> Self {
        match status {
            AttemptStatus::InProgress => SessionStatus::InProgress,
            AttemptStatus::Paused => SessionStatus::Paused,
            AttemptStatus::Completed => SessionStatus::Completed,
            AttemptStatus::Abandoned => SessionStatus::Abandoned,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SessionStatus::NotStarted => "not started",
            SessionStatus::InProgress => "in progress",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
            SessionStatus::Abandoned => "abandoned",
        };
        f.write_str(label)
    }
}

/// One user's run through a quiz.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Attempt {
    pub attempt_id: String,
    pub quiz_id: String,
    pub user_id: String,
    pub mode: AttemptMode,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_questions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit_minutes: Option<u32>,
}

impl Attempt {
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.time_limit_minutes
            .map(|minutes| self.started_at + Duration::minutes(i64::from(minutes)))
    }

    /// Time left before the server-side limit, clamped at zero.
    pub fn remaining_time(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline()
            .map(|deadline| (deadline - now).max(Duration::zero()))
    }
}
