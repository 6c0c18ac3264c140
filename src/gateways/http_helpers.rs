use reqwest::StatusCode;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::domain::attempt::AttemptStatus;

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    status: Option<AttemptStatus>,
}

/// Maps a non-success response to the error taxonomy
pub fn error_for_status(status: StatusCode, body: &str) -> AppError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status.to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => AppError::Validation(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::CONFLICT => AppError::StateConflict {
            status: parsed.status,
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => transient(status, message),
        s if s.is_server_error() => transient(status, message),
        _ => AppError::Internal(format!("Unexpected response {}: {}", status, message)),
    }
}

/// Creates a retryable server error
pub fn transient(status: StatusCode, message: impl std::fmt::Display) -> AppError {
    AppError::TransientServer {
        status: status.as_u16(),
        message: message.to_string(),
    }
}
