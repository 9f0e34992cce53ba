/// Unified error types for the quiz server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the quiz server
#[derive(Error, Debug)]
pub enum QuizError {
    /// Missing or malformed input
    #[error("{0}")]
    Validation(String),

    /// Bad credentials, or a missing, invalid or expired token
    #[error("{0}")]
    Authentication(String),

    /// Authenticated but not allowed (wrong role, disabled account)
    #[error("{0}")]
    Authorization(String),

    /// Unknown user, table or question
    #[error("{0}")]
    NotFound(String),

    /// Uniqueness conflicts (duplicate username or email)
    #[error("{0}")]
    Conflict(String),

    /// Wrong HTTP verb for an action
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Key-value store errors
    #[error("Key-value store error: {0}")]
    KeyValue(#[from] redis::RedisError),

    /// Remote document store errors
    #[error("Remote storage error: {0}")]
    Remote(#[from] reqwest::Error),
}

impl QuizError {
    /// HTTP status for this error kind
    pub fn status_code(&self) -> StatusCode {
        match self {
            QuizError::Validation(_) => StatusCode::BAD_REQUEST,
            QuizError::Authentication(_) => StatusCode::UNAUTHORIZED,
            QuizError::Authorization(_) => StatusCode::FORBIDDEN,
            QuizError::NotFound(_) => StatusCode::NOT_FOUND,
            QuizError::Conflict(_) => StatusCode::CONFLICT,
            QuizError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            QuizError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            QuizError::Internal(_)
            | QuizError::Io(_)
            | QuizError::Serialization(_)
            | QuizError::KeyValue(_)
            | QuizError::Remote(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error envelope returned to clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

/// Convert QuizError to HTTP response
impl IntoResponse for QuizError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed with internal error");
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            success: false,
            error: message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for quiz server operations
pub type QuizResult<T> = Result<T, QuizError>;
