//! HTTP carrier client
//!
//! One instance per configured carrier. Webhook payloads and poll
//! responses share the same normalization path so downstream code sees a
//! single [`TrackingEvent`] shape regardless of how the event arrived.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::order::{Order, TrackingEvent, TrackingEventCode};
use std::time::Duration;

use super::{Carrier, CarrierError, CarrierResult, LabelInfo};
use crate::utils::signature;

/// Per-carrier connection settings
#[derive(Debug, Clone)]
pub struct CarrierConfig {
    /// Registry key, e.g. "acme"
    pub code: String,
    pub base_url: String,
    pub api_key: String,
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
    /// Whether this carrier pushes webhooks or must be polled
    pub push_webhooks: bool,
    pub request_timeout_ms: u64,
}

/// REST carrier client
pub struct HttpCarrier {
    client: reqwest::Client,
    config: CarrierConfig,
}

/// Raw webhook shape before normalization
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    event_id: String,
    order_ref: String,
    code: String,
    #[serde(default)]
    location: Option<String>,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TrackingReply {
    events: Vec<TrackingReplyEvent>,
}

#[derive(Debug, Deserialize)]
struct TrackingReplyEvent {
    event_id: String,
    code: String,
    #[serde(default)]
    location: Option<String>,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LabelReply {
    tracking_code: String,
    label_url: String,
}

impl HttpCarrier {
    pub fn new(config: CarrierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn classify(err: reqwest::Error) -> CarrierError {
        CarrierError::Unavailable(err.to_string())
    }

    fn normalize(&self, order_ref: String, event_id: String, code: &str,
                 location: Option<String>, occurred_at: DateTime<Utc>) -> TrackingEvent {
        TrackingEvent {
            external_event_id: event_id,
            order_ref,
            carrier_code: self.config.code.clone(),
            code: TrackingEventCode::from_carrier_code(code),
            location,
            occurred_at,
            received_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Carrier for HttpCarrier {
    fn code(&self) -> &str {
        &self.config.code
    }

    fn has_push_webhooks(&self) -> bool {
        self.config.push_webhooks
    }

    fn parse_webhook(&self, raw: &[u8], sig: &str) -> CarrierResult<TrackingEvent> {
        if !signature::verify(&self.config.webhook_secret, raw, sig) {
            return Err(CarrierError::Authenticity(format!(
                "carrier {} webhook signature mismatch",
                self.config.code
            )));
        }

        let payload: WebhookPayload = serde_json::from_slice(raw)
            .map_err(|e| CarrierError::InvalidPayload(e.to_string()))?;

        Ok(self.normalize(
            payload.order_ref,
            payload.event_id,
            &payload.code,
            payload.location,
            payload.occurred_at,
        ))
    }

    async fn poll_tracking(&self, order: &Order) -> CarrierResult<Vec<TrackingEvent>> {
        let tracking_code = order.tracking_code.as_deref().ok_or_else(|| {
            CarrierError::InvalidPayload(format!("order {} has no tracking code", order.order_id))
        })?;

        let url = format!("{}/v1/tracking/{}", self.config.base_url, tracking_code);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CarrierError::Unavailable(format!(
                "carrier {} tracking fetch returned {}",
                self.config.code, status
            )));
        }

        let reply: TrackingReply = response
            .json()
            .await
            .map_err(|e| CarrierError::InvalidPayload(e.to_string()))?;

        Ok(reply
            .events
            .into_iter()
            .map(|e| {
                self.normalize(
                    order.order_id.clone(),
                    e.event_id,
                    &e.code,
                    e.location,
                    e.occurred_at,
                )
            })
            .collect())
    }

    async fn create_label(&self, order: &Order) -> CarrierResult<LabelInfo> {
        let url = format!("{}/v1/labels", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "reference": order.order_id }))
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CarrierError::Unavailable(format!(
                "carrier {} label request returned {}",
                self.config.code, status
            )));
        }

        let reply: LabelReply = response
            .json()
            .await
            .map_err(|e| CarrierError::InvalidPayload(e.to_string()))?;

        tracing::info!(
            order_id = %order.order_id,
            carrier = %self.config.code,
            tracking_code = %reply.tracking_code,
            "Shipping label created"
        );
        Ok(LabelInfo {
            tracking_code: reply.tracking_code,
            label_url: reply.label_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_carrier(push: bool) -> HttpCarrier {
        HttpCarrier::new(CarrierConfig {
            code: "acme".to_string(),
            base_url: "http://acme.invalid".to_string(),
            api_key: "key".to_string(),
            webhook_secret: "carrier_secret".to_string(),
            push_webhooks: push,
            request_timeout_ms: 1000,
        })
    }

    fn webhook_body(event_id: &str, order_ref: &str, code: &str) -> Vec<u8> {
        format!(
            r#"{{"event_id":"{}","order_ref":"{}","code":"{}","location":"BCN","occurred_at":"2025-08-20T10:00:00Z"}}"#,
            event_id, order_ref, code
        )
        .into_bytes()
    }

    #[test]
    fn webhook_with_valid_signature_normalizes() {
        let carrier = test_carrier(true);
        let body = webhook_body("trk-1", "ord-1", "delivered");
        let sig = signature::sign("carrier_secret", &body);

        let event = carrier.parse_webhook(&body, &sig).unwrap();
        assert_eq!(event.external_event_id, "trk-1");
        assert_eq!(event.order_ref, "ord-1");
        assert_eq!(event.carrier_code, "acme");
        assert_eq!(event.code, TrackingEventCode::Delivered);
        assert_eq!(event.location.as_deref(), Some("BCN"));
    }

    #[test]
    fn unknown_event_code_is_preserved() {
        let carrier = test_carrier(true);
        let body = webhook_body("trk-2", "ord-1", "customs_hold");
        let sig = signature::sign("carrier_secret", &body);

        let event = carrier.parse_webhook(&body, &sig).unwrap();
        assert_eq!(
            event.code,
            TrackingEventCode::Unclassified("customs_hold".to_string())
        );
    }

    #[test]
    fn garbled_payload_is_invalid_not_unauthentic() {
        let carrier = test_carrier(true);
        let body = b"not json at all";
        let sig = signature::sign("carrier_secret", body);

        let result = carrier.parse_webhook(body, &sig);
        assert!(matches!(result, Err(CarrierError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn polling_without_tracking_code_is_rejected() {
        let carrier = test_carrier(false);
        let order = Order::new(
            "ord-1".into(),
            "ORD-1".into(),
            "cust-1".into(),
            vec![shared::order::LineItem {
                product_id: "p1".into(),
                name: "Mug".into(),
                quantity: 1,
                unit_price: "10.00".parse().unwrap(),
            }],
            "EUR".into(),
        );
        let result = carrier.poll_tracking(&order).await;
        assert!(matches!(result, Err(CarrierError::InvalidPayload(_))));
    }
}
