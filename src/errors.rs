use thiserror::Error;

use crate::models::domain::attempt::AttemptStatus;

/// Failures mapping an answer between its UI shape and its wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("Unsupported question type: {0}")]
    UnsupportedQuestionType(String),

    #[error("Answer shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unknown {kind} id '{id}'")]
    UnknownReference { kind: &'static str, id: String },

    #[error("Item '{0}' appears more than once")]
    DuplicateItem(String),

    #[error("Ordering has {found} of {expected} items")]
    IncompleteOrdering { expected: usize, found: usize },

    #[error("Malformed question content: {0}")]
    MalformedContent(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("Encoding error: {0}")]
    Encoding(#[from] CodecError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    TransientServer { status: u16, message: String },

    #[error("State conflict: {message}")]
    StateConflict {
        status: Option<AttemptStatus>,
        message: String,
    },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Encoding(CodecError::UnsupportedQuestionType(_)) => {
                "UNSUPPORTED_QUESTION_TYPE"
            }
            AppError::Encoding(_) => "ENCODING_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::TransientServer { .. } => "TRANSIENT_SERVER_ERROR",
            AppError::StateConflict { .. } => "STATE_CONFLICT",
            AppError::InvalidState(_) => "INVALID_STATE",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Errors worth a "try again": the request never reached business logic.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::TransientServer { .. }
        )
    }

    /// Local, pre-flight failures that never touched the network.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AppError::Encoding(_) | AppError::Validation(_) | AppError::InvalidState(_)
        )
    }

    /// Terminal status reported by the server when it disagrees with the client.
    pub fn conflicting_terminal_status(&self) -> Option<AttemptStatus> {
        match self {
            AppError::StateConflict {
                status: Some(status),
                ..
            } if status.is_terminal() => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::Internal(format!("Response decoding error: {}", err));
        }
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::from(CodecError::UnsupportedQuestionType("ESSAY".into())).error_code(),
            "UNSUPPORTED_QUESTION_TYPE"
        );
        assert_eq!(
            AppError::from(CodecError::DuplicateItem("a".into())).error_code(),
            "ENCODING_ERROR"
        );
        assert_eq!(
            AppError::Validation("test".into()).error_code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_error_messages() {
        let err = AppError::from(CodecError::UnsupportedQuestionType("ESSAY".into()));
        assert_eq!(
            err.to_string(),
            "Encoding error: Unsupported question type: ESSAY"
        );

        let err = AppError::TransientServer {
            status: 503,
            message: "unavailable".into(),
        };
        assert_eq!(err.to_string(), "Server error (503): unavailable");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::Network("timeout".into()).is_retryable());
        assert!(AppError::TransientServer {
            status: 502,
            message: "bad gateway".into()
        }
        .is_retryable());
        assert!(!AppError::Validation("unanswered".into()).is_retryable());
        assert!(!AppError::StateConflict {
            status: Some(AttemptStatus::Completed),
            message: "done".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_conflicting_terminal_status_only_for_terminal() {
        let completed = AppError::StateConflict {
            status: Some(AttemptStatus::Completed),
            message: "already completed".into(),
        };
        assert_eq!(
            completed.conflicting_terminal_status(),
            Some(AttemptStatus::Completed)
        );

        let paused = AppError::StateConflict {
            status: Some(AttemptStatus::Paused),
            message: "paused".into(),
        };
        assert_eq!(paused.conflicting_terminal_status(), None);
        assert_eq!(AppError::Network("x".into()).conflicting_terminal_status(), None);
    }
}
