//! Pipeline error taxonomy
//!
//! The fixed set of failure classes the payment/webhook pipeline can
//! produce. Every layer maps its internal errors into one of these before
//! the failure crosses a component boundary.
//!
//! | Variant | Meaning | Retry safe |
//! |---------|---------|------------|
//! | InvalidInput | malformed/missing fields, rejected before any side effect | no |
//! | Authenticity | signature/secret verification failed, event never applied | no |
//! | IllegalTransition | event valid but inapplicable to the order's state | no |
//! | GatewayUnavailable | upstream payment gateway I/O failure or timeout | yes |
//! | CarrierUnavailable | upstream carrier I/O failure or timeout | yes |
//! | RateLimited | policy threshold exceeded, caller must back off | after window |

use thiserror::Error;

/// Unified pipeline error
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or missing required fields (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Signature or shared-secret verification failure (401)
    #[error("Authenticity verification failed: {0}")]
    Authenticity(String),

    /// Event is valid but inapplicable to the current order state (422)
    #[error("Illegal transition: {event} not applicable in state {from}")]
    IllegalTransition { from: String, event: String },

    /// Payment gateway unreachable or returned 5xx (503, safe to retry)
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// Carrier unreachable or returned 5xx (503, safe to retry)
    #[error("Carrier unavailable: {0}")]
    CarrierUnavailable(String),

    /// Request rate policy exceeded (429)
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Referenced resource does not exist (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ledger/storage failure (500)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn authenticity(msg: impl Into<String>) -> Self {
        Self::Authenticity(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
