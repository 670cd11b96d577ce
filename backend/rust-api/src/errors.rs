//! Typed core error taxonomy with HTTP status mapping and JSON response body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

/// The core error taxonomy for the service.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("exercise not found")]
    ExerciseNotFound,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("session not found")]
    SessionNotFound,

    #[error("forbidden")]
    SessionForbidden,

    #[error("session is no longer active")]
    SessionTerminal,

    #[error("evaluation error: {0}")]
    Evaluation(anyhow::Error),

    #[error("storage error: {0}")]
    Storage(anyhow::Error),
}

impl CoreError {
    /// Construct an `InvalidInput` error from anything string-like.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        CoreError::InvalidInput(message.into())
    }

    /// Construct a `CapabilityUnavailable` error from anything string-like.
    pub fn capability_unavailable(message: impl Into<String>) -> Self {
        CoreError::CapabilityUnavailable(message.into())
    }

    /// HTTP status code this error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::ExerciseNotFound | CoreError::SessionNotFound => StatusCode::NOT_FOUND,
            CoreError::InvalidInput(_) | CoreError::SessionTerminal => StatusCode::BAD_REQUEST,
            CoreError::SessionForbidden => StatusCode::FORBIDDEN,
            CoreError::CapabilityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Evaluation(_) | CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "message": self.to_string(),
            "status": status.as_u16(),
        }));
        (status, body).into_response()
    }
}
