//! Carrier adapter
//!
//! Normalizes carrier webhook payloads and pull-based tracking responses
//! into internal [`TrackingEvent`]s. Carriers are registered by code; core
//! logic routes through the registry and never branches on carrier name.

pub mod http_carrier;

pub use http_carrier::{CarrierConfig, HttpCarrier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::PipelineError;
use shared::order::{Order, TrackingEvent};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Carrier errors
#[derive(Debug, Error)]
pub enum CarrierError {
    /// Network failure, timeout or carrier 5xx — safe to retry
    #[error("Carrier unavailable: {0}")]
    Unavailable(String),

    /// Webhook signature verification failed
    #[error("Webhook authenticity failed: {0}")]
    Authenticity(String),

    /// Verified but unparseable payload
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    /// No carrier registered under this code
    #[error("Unknown carrier: {0}")]
    UnknownCarrier(String),
}

impl From<CarrierError> for PipelineError {
    fn from(err: CarrierError) -> Self {
        match err {
            CarrierError::Unavailable(msg) => PipelineError::CarrierUnavailable(msg),
            CarrierError::Authenticity(msg) => PipelineError::Authenticity(msg),
            CarrierError::InvalidPayload(msg) => PipelineError::InvalidInput(msg),
            CarrierError::UnknownCarrier(code) => {
                PipelineError::NotFound(format!("carrier {}", code))
            }
        }
    }
}

pub type CarrierResult<T> = Result<T, CarrierError>;

/// Shipping label returned by a carrier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelInfo {
    pub tracking_code: String,
    pub label_url: String,
}

/// The contract every carrier integration must satisfy
#[async_trait]
pub trait Carrier: Send + Sync {
    /// Registry key, e.g. "acme"
    fn code(&self) -> &str;

    /// Whether this carrier pushes webhooks; pull-only carriers are covered
    /// by the scheduled tracking refresh instead
    fn has_push_webhooks(&self) -> bool;

    /// Verify and normalize a carrier webhook
    ///
    /// Same signature discipline as the payment callback: the raw payload
    /// is verified before any field is trusted. Unknown event codes are
    /// preserved verbatim as `Unclassified`, never dropped.
    fn parse_webhook(&self, raw: &[u8], signature: &str) -> CarrierResult<TrackingEvent>;

    /// Pull tracking events for an order (pull-only carriers)
    async fn poll_tracking(&self, order: &Order) -> CarrierResult<Vec<TrackingEvent>>;

    /// Request a shipping label
    ///
    /// The order is never marked Shipped here — only a carrier dispatch
    /// event does that.
    async fn create_label(&self, order: &Order) -> CarrierResult<LabelInfo>;
}

/// Carrier registry keyed by carrier code
#[derive(Default)]
pub struct CarrierRegistry {
    carriers: HashMap<String, Arc<dyn Carrier>>,
}

impl CarrierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, carrier: Arc<dyn Carrier>) {
        self.carriers.insert(carrier.code().to_string(), carrier);
    }

    pub fn get(&self, code: &str) -> CarrierResult<Arc<dyn Carrier>> {
        self.carriers
            .get(code)
            .cloned()
            .ok_or_else(|| CarrierError::UnknownCarrier(code.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Carrier>> {
        self.carriers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::signature;

    fn registry_with_acme() -> CarrierRegistry {
        let mut registry = CarrierRegistry::new();
        registry.register(Arc::new(HttpCarrier::new(CarrierConfig {
            code: "acme".to_string(),
            base_url: "http://acme.invalid".to_string(),
            api_key: "key".to_string(),
            webhook_secret: "carrier_secret".to_string(),
            push_webhooks: true,
            request_timeout_ms: 1000,
        })));
        registry
    }

    #[test]
    fn registry_resolves_by_code() {
        let registry = registry_with_acme();
        assert!(registry.get("acme").is_ok());
        assert!(matches!(
            registry.get("nope"),
            Err(CarrierError::UnknownCarrier(_))
        ));
    }

    #[test]
    fn unverifiable_webhook_records_nothing() {
        let registry = registry_with_acme();
        let carrier = registry.get("acme").unwrap();

        let body = br#"{"event_id":"trk-1","order_ref":"ord-1","code":"delivered","occurred_at":"2025-08-20T10:00:00Z"}"#;
        let bad_sig = signature::sign("not_the_secret", body);

        let result = carrier.parse_webhook(body, &bad_sig);
        assert!(matches!(result, Err(CarrierError::Authenticity(_))));
    }
}
