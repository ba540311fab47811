//! Unified error handling
//!
//! Maps the pipeline error taxonomy onto HTTP responses:
//! - [`AppError`] - application error enum, [`IntoResponse`] for axum
//!
//! # Error code scheme
//!
//! | Prefix | Category | Example |
//! |--------|----------|---------|
//! | E1xxx | validation / input | E1001 invalid input |
//! | E2xxx | auth / permission | E2001 forbidden |
//! | E3xxx | tokens / signatures | E3002 invalid token |
//! | E4xxx | business rules | E4001 illegal transition |
//! | E5xxx | upstream / throttling | E5001 gateway unavailable |
//! | E9xxx | system | E9001 internal |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::{ApiResponse, PipelineError};
use tracing::error;

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Auth errors (4xx) ==========
    #[error("Authentication required")]
    /// Missing/invalid credentials (401)
    Unauthorized,

    #[error("Invalid token")]
    /// Token failed validation (401)
    InvalidToken,

    #[error("Permission denied: {0}")]
    /// Authenticated but not allowed (403)
    Forbidden(String),

    // ========== Input / business errors (4xx) ==========
    #[error("Resource not found: {0}")]
    /// Resource does not exist (404)
    NotFound(String),

    #[error("Validation failed: {0}")]
    /// Request failed validation (400)
    Validation(String),

    #[error("Invalid request: {0}")]
    /// Malformed request (400)
    Invalid(String),

    #[error("Authenticity verification failed: {0}")]
    /// Webhook signature rejected (401) — sender will redeliver
    Authenticity(String),

    #[error("Illegal transition: {0}")]
    /// Event inapplicable to current order state (422)
    IllegalTransition(String),

    #[error("Rate limited")]
    /// Too many requests (429) with a Retry-After hint
    RateLimited { retry_after_secs: u64 },

    // ========== Upstream / system errors (5xx) ==========
    #[error("Upstream unavailable: {0}")]
    /// Gateway/carrier unreachable, safe to retry (503)
    Upstream(String),

    #[error("Storage error: {0}")]
    /// Ledger/storage failure (500)
    Storage(String),

    #[error("Internal server error: {0}")]
    /// Unexpected failure (500)
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(msg) => Self::Invalid(msg),
            PipelineError::Authenticity(msg) => Self::Authenticity(msg),
            PipelineError::IllegalTransition { from, event } => {
                Self::IllegalTransition(format!("{} not applicable in state {}", event, from))
            }
            PipelineError::GatewayUnavailable(msg) => Self::Upstream(format!("gateway: {}", msg)),
            PipelineError::CarrierUnavailable(msg) => Self::Upstream(format!("carrier: {}", msg)),
            PipelineError::RateLimited { retry_after_secs } => {
                Self::RateLimited { retry_after_secs }
            }
            PipelineError::NotFound(msg) => Self::NotFound(msg),
            PipelineError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "E2000", self.to_string()),
            Self::InvalidToken => (StatusCode::UNAUTHORIZED, "E3002", self.to_string()),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "E2001", self.to_string()),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "E1404", self.to_string()),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "E1002", self.to_string()),
            Self::Invalid(_) => (StatusCode::BAD_REQUEST, "E1001", self.to_string()),
            Self::Authenticity(_) => (StatusCode::UNAUTHORIZED, "E3010", self.to_string()),
            Self::IllegalTransition(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "E4001", self.to_string())
            }
            Self::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "E5429", self.to_string())
            }
            Self::Upstream(_) => (StatusCode::SERVICE_UNAVAILABLE, "E5001", self.to_string()),
            Self::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9002", self.to_string()),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "E9001", self.to_string()),
        };

        if status.is_server_error() {
            error!(code = code, error = %message, "Request failed");
        }

        let body = Json(ApiResponse::<()>::error(code, message));
        let mut response = (status, body).into_response();

        // Throttled callers get a machine-readable back-off hint
        if let Self::RateLimited { retry_after_secs } = self
            && let Ok(value) = retry_after_secs.to_string().parse()
        {
            response.headers_mut().insert(http::header::RETRY_AFTER, value);
        }

        response
    }
}
