//! WebhookIngestor - verify, normalize, apply, acknowledge
//!
//! # Ingestion flow
//!
//! ```text
//! ingest_payment(raw, signature)
//!     ├─ 1. Adapter verifies signature against the raw payload
//!     │      └─ failure → error (sender sees non-2xx and will redeliver)
//!     ├─ 2. Adapter normalizes the payload into a PaymentEvent
//!     ├─ 3. Ledger applies the event (dedup + state machine inside)
//!     └─ 4. Outcome returned; duplicates and inconsistencies are
//!            acknowledged so redelivery stops
//! ```
//!
//! Carrier webhooks follow the same shape, routed by carrier code.

use shared::PipelineResult;
use std::sync::Arc;

use crate::carrier::CarrierRegistry;
use crate::gateway::PaymentGateway;
use crate::orders::{ApplyOutcome, OrderLedger};

/// Webhook ingestion pipeline over the ledger and the external adapters
#[derive(Clone)]
pub struct WebhookIngestor {
    ledger: OrderLedger,
    gateway: Arc<dyn PaymentGateway>,
    carriers: Arc<CarrierRegistry>,
}

impl WebhookIngestor {
    pub fn new(
        ledger: OrderLedger,
        gateway: Arc<dyn PaymentGateway>,
        carriers: Arc<CarrierRegistry>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            carriers,
        }
    }

    /// Ingest a payment gateway callback
    ///
    /// Errors mean the delivery must NOT be acknowledged (bad signature,
    /// unparseable payload, storage failure). An `Ok` outcome always means
    /// the sender can stop redelivering.
    pub async fn ingest_payment(&self, raw: &[u8], signature: &str) -> PipelineResult<ApplyOutcome> {
        let event = self.gateway.parse_callback(raw, signature)?;
        let event_id = event.external_event_id.clone();

        let outcome = self.ledger.apply_payment_event(event).await?;
        self.log_outcome("gateway", &event_id, &outcome);
        Ok(outcome)
    }

    /// Ingest a carrier webhook, routed by carrier code
    pub async fn ingest_carrier(
        &self,
        carrier_code: &str,
        raw: &[u8],
        signature: &str,
    ) -> PipelineResult<ApplyOutcome> {
        let carrier = self.carriers.get(carrier_code)?;
        let event = carrier.parse_webhook(raw, signature)?;
        let event_id = event.external_event_id.clone();

        let outcome = self.ledger.apply_tracking_event(event).await?;
        self.log_outcome(carrier_code, &event_id, &outcome);
        Ok(outcome)
    }

    fn log_outcome(&self, source: &str, event_id: &str, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied { order_id, new_state } => {
                tracing::info!(%source, %event_id, %order_id, %new_state, "Webhook applied");
            }
            ApplyOutcome::Recorded => {
                tracing::debug!(%source, %event_id, "Webhook recorded, no transition implied");
            }
            ApplyOutcome::Duplicate => {
                tracing::debug!(%source, %event_id, "Duplicate webhook acknowledged");
            }
            ApplyOutcome::NoMatchingOrder => {
                tracing::warn!(%source, %event_id, "Webhook references no known order");
            }
            ApplyOutcome::TransitionRejected { order_id, from, event } => {
                tracing::warn!(
                    %source, %event_id, %order_id, %from, %event,
                    "Webhook implies illegal transition; event kept for audit"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carrier::{CarrierConfig, HttpCarrier};
    use crate::gateway::HttpPaymentGateway;
    use crate::gateway::http_gateway::GatewayConfig;
    use crate::orders::LedgerStorage;
    use crate::utils::signature;
    use shared::PipelineError;
    use shared::order::{LineItem, Order, OrderState};

    const GATEWAY_SECRET: &str = "whsec_test";
    const CARRIER_SECRET: &str = "carrier_secret";

    fn test_ingestor() -> WebhookIngestor {
        let ledger = OrderLedger::new(LedgerStorage::open_in_memory().unwrap());
        let gateway = Arc::new(HttpPaymentGateway::new(GatewayConfig {
            base_url: "http://gateway.invalid".to_string(),
            api_key: "sk_test".to_string(),
            webhook_secret: GATEWAY_SECRET.to_string(),
            request_timeout_ms: 1000,
        }));
        let mut carriers = CarrierRegistry::new();
        carriers.register(Arc::new(HttpCarrier::new(CarrierConfig {
            code: "acme".to_string(),
            base_url: "http://acme.invalid".to_string(),
            api_key: "key".to_string(),
            webhook_secret: CARRIER_SECRET.to_string(),
            push_webhooks: true,
            request_timeout_ms: 1000,
        })));
        WebhookIngestor::new(ledger, gateway, Arc::new(carriers))
    }

    async fn order_awaiting_payment(ingestor: &WebhookIngestor, reference: &str) -> Order {
        let order = ingestor
            .ledger
            .create_order(
                "cust-1".to_string(),
                vec![LineItem {
                    product_id: "p1".to_string(),
                    name: "Mug".to_string(),
                    quantity: 1,
                    unit_price: "150.00".parse().unwrap(),
                }],
                "EUR".to_string(),
            )
            .unwrap();
        ingestor
            .ledger
            .attach_intent(&order.order_id, reference)
            .await
            .unwrap()
    }

    fn payment_body(event_id: &str, reference: &str, status: &str) -> Vec<u8> {
        format!(
            r#"{{"event_id":"{}","reference":"{}","status":"{}","amount":"150.00","occurred_at":"2025-08-20T10:00:00Z"}}"#,
            event_id, reference, status
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn verified_callback_advances_the_order() {
        let ingestor = test_ingestor();
        let order = order_awaiting_payment(&ingestor, "abc123").await;

        let body = payment_body("evt-1", "abc123", "approved");
        let sig = signature::sign(GATEWAY_SECRET, &body);

        let outcome = ingestor.ingest_payment(&body, &sig).await.unwrap();
        assert!(matches!(outcome, ApplyOutcome::Applied { .. }));

        let stored = ingestor.ledger.get_order(&order.order_id).unwrap().unwrap();
        assert_eq!(stored.state, OrderState::Paid);
    }

    #[tokio::test]
    async fn unverified_callback_records_nothing() {
        let ingestor = test_ingestor();
        order_awaiting_payment(&ingestor, "abc123").await;

        let body = payment_body("evt-1", "abc123", "approved");
        let sig = signature::sign("wrong_secret", &body);

        let result = ingestor.ingest_payment(&body, &sig).await;
        assert!(matches!(result, Err(PipelineError::Authenticity(_))));
        // Nothing in the processed-event log: redelivery will be applied
        assert!(!ingestor.ledger.storage().is_event_processed("evt-1").unwrap());
    }

    #[tokio::test]
    async fn redelivery_is_acknowledged_without_reapplying() {
        let ingestor = test_ingestor();
        order_awaiting_payment(&ingestor, "abc123").await;

        let body = payment_body("evt-1", "abc123", "approved");
        let sig = signature::sign(GATEWAY_SECRET, &body);

        let first = ingestor.ingest_payment(&body, &sig).await.unwrap();
        let second = ingestor.ingest_payment(&body, &sig).await.unwrap();

        assert!(matches!(first, ApplyOutcome::Applied { .. }));
        assert_eq!(second, ApplyOutcome::Duplicate);
    }

    #[tokio::test]
    async fn carrier_webhook_routes_by_code() {
        let ingestor = test_ingestor();
        let body = br#"{"event_id":"trk-1","order_ref":"ord-missing","code":"in_transit","occurred_at":"2025-08-20T10:00:00Z"}"#;
        let sig = signature::sign(CARRIER_SECRET, body);

        // Known carrier, unknown order: acknowledged inconsistency
        let outcome = ingestor.ingest_carrier("acme", body, &sig).await.unwrap();
        assert_eq!(outcome, ApplyOutcome::NoMatchingOrder);

        // Unknown carrier code
        let result = ingestor.ingest_carrier("ghost", body, &sig).await;
        assert!(matches!(result, Err(PipelineError::NotFound(_))));
    }
}
