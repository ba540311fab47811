//! Payment gateway adapter
//!
//! Abstracts the external payment gateway behind a normalization contract:
//! provider payloads and status vocabularies never leak past this module.
//! New gateways are added by implementing [`PaymentGateway`], never by
//! branching on provider name inside core logic.

pub mod http_gateway;

pub use http_gateway::HttpPaymentGateway;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::PipelineError;
use shared::order::{Order, PaymentEvent, SettlementLine};
use thiserror::Error;

/// Gateway errors
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Network failure, timeout or gateway 5xx — safe for the caller to
    /// retry, never retried synchronously here
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// Order cannot be sent to the gateway (non-positive total,
    /// unsupported currency)
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Callback signature verification failed; the payload is untrusted
    #[error("Callback authenticity failed: {0}")]
    Authenticity(String),

    /// Callback verified but its content is not parseable/normalizable
    #[error("Invalid callback payload: {0}")]
    InvalidPayload(String),
}

impl From<GatewayError> for PipelineError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Unavailable(msg) => PipelineError::GatewayUnavailable(msg),
            GatewayError::InvalidOrder(msg) => PipelineError::InvalidInput(msg),
            GatewayError::Authenticity(msg) => PipelineError::Authenticity(msg),
            GatewayError::InvalidPayload(msg) => PipelineError::InvalidInput(msg),
        }
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result of creating a payment intent with the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    /// Where the customer completes the payment
    pub redirect_url: String,
    /// Gateway-assigned reference for this payment
    pub external_reference: String,
}

/// The contract every payment gateway integration must satisfy
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for an order
    ///
    /// Fails with [`GatewayError::Unavailable`] on network/5xx errors
    /// (surfaced to the caller so the customer can retry) and
    /// [`GatewayError::InvalidOrder`] on non-positive totals or unsupported
    /// currencies.
    async fn create_intent(&self, order: &Order) -> GatewayResult<IntentResponse>;

    /// Verify and normalize a payment feedback callback
    ///
    /// The signature is checked against the raw payload before any field is
    /// trusted; on failure the event is never applied.
    fn parse_callback(&self, raw: &[u8], signature: &str) -> GatewayResult<PaymentEvent>;

    /// Fetch the gateway's settlement report for a date window
    async fn settlement_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GatewayResult<Vec<SettlementLine>>;
}
