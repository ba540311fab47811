//! HTTP payment gateway client
//!
//! Talks to a REST-style gateway; all calls carry a bounded timeout and a
//! timeout counts as [`GatewayError::Unavailable`], not a definitive
//! failure — intent creation is safe to retry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::order::{Order, PaymentEvent, PaymentStatus, SettlementLine};
use std::time::Duration;

use super::{GatewayError, GatewayResult, IntentResponse, PaymentGateway};
use crate::utils::signature;

/// Currencies the gateway contract supports
const SUPPORTED_CURRENCIES: [&str; 3] = ["EUR", "USD", "GBP"];

/// Gateway connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_key: String,
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
    pub request_timeout_ms: u64,
}

/// REST payment gateway client
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

#[derive(Debug, Serialize)]
struct IntentRequest<'a> {
    reference: &'a str,
    amount: Decimal,
    currency: &'a str,
}

#[derive(Debug, Deserialize)]
struct IntentReply {
    redirect_url: String,
    reference: String,
}

/// Raw callback shape before normalization
#[derive(Debug, Deserialize)]
struct CallbackPayload {
    event_id: String,
    reference: String,
    status: String,
    amount: Decimal,
    occurred_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SettlementReply {
    lines: Vec<SettlementReplyLine>,
}

#[derive(Debug, Deserialize)]
struct SettlementReplyLine {
    reference: String,
    amount: Decimal,
    status: String,
}

/// Map the gateway's status vocabulary into the internal enum
fn normalize_status(raw: &str) -> GatewayResult<PaymentStatus> {
    let status = match raw.to_ascii_lowercase().as_str() {
        "approved" | "authorized" | "captured" | "succeeded" => PaymentStatus::Approved,
        "rejected" | "declined" | "failed" => PaymentStatus::Rejected,
        "pending" | "processing" => PaymentStatus::Pending,
        "refunded" | "reversed" => PaymentStatus::Refunded,
        other => {
            return Err(GatewayError::InvalidPayload(format!(
                "unknown payment status: {}",
                other
            )));
        }
    };
    Ok(status)
}

impl HttpPaymentGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client, config }
    }

    fn classify(err: reqwest::Error) -> GatewayError {
        if err.is_timeout() || err.is_connect() {
            GatewayError::Unavailable(format!("request failed: {}", err))
        } else {
            GatewayError::Unavailable(err.to_string())
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_intent(&self, order: &Order) -> GatewayResult<IntentResponse> {
        if order.total <= Decimal::ZERO {
            return Err(GatewayError::InvalidOrder(format!(
                "non-positive total: {}",
                order.total
            )));
        }
        if !SUPPORTED_CURRENCIES.contains(&order.currency.as_str()) {
            return Err(GatewayError::InvalidOrder(format!(
                "unsupported currency: {}",
                order.currency
            )));
        }

        let url = format!("{}/v1/intents", self.config.base_url);
        let request = IntentRequest {
            reference: &order.order_id,
            amount: order.total,
            currency: &order.currency,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if status.is_server_error() {
            return Err(GatewayError::Unavailable(format!("gateway returned {}", status)));
        }
        if !status.is_success() {
            return Err(GatewayError::InvalidOrder(format!("gateway rejected intent: {}", status)));
        }

        let reply: IntentReply = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

        tracing::info!(order_id = %order.order_id, reference = %reply.reference, "Payment intent created");
        Ok(IntentResponse {
            redirect_url: reply.redirect_url,
            external_reference: reply.reference,
        })
    }

    fn parse_callback(&self, raw: &[u8], sig: &str) -> GatewayResult<PaymentEvent> {
        if !signature::verify(&self.config.webhook_secret, raw, sig) {
            return Err(GatewayError::Authenticity(
                "payment callback signature mismatch".into(),
            ));
        }

        let payload: CallbackPayload = serde_json::from_slice(raw)
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

        Ok(PaymentEvent {
            external_event_id: payload.event_id,
            external_reference: payload.reference,
            status: normalize_status(&payload.status)?,
            amount: payload.amount,
            occurred_at: payload.occurred_at,
            received_at: Utc::now(),
        })
    }

    async fn settlement_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GatewayResult<Vec<SettlementLine>> {
        let url = format!("{}/v1/reports/settlement", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("start", start.to_rfc3339()),
                ("end", end.to_rfc3339()),
            ])
            .send()
            .await
            .map_err(Self::classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Unavailable(format!(
                "settlement report fetch returned {}",
                status
            )));
        }

        let reply: SettlementReply = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidPayload(e.to_string()))?;

        reply
            .lines
            .into_iter()
            .map(|line| {
                Ok(SettlementLine {
                    external_reference: line.reference,
                    amount: line.amount,
                    status: normalize_status(&line.status)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::LineItem;

    fn test_gateway() -> HttpPaymentGateway {
        HttpPaymentGateway::new(GatewayConfig {
            base_url: "http://gateway.invalid".to_string(),
            api_key: "sk_test".to_string(),
            webhook_secret: "whsec_test".to_string(),
            request_timeout_ms: 1000,
        })
    }

    fn callback_body(event_id: &str, reference: &str, status: &str, amount: &str) -> Vec<u8> {
        format!(
            r#"{{"event_id":"{}","reference":"{}","status":"{}","amount":"{}","occurred_at":"2025-08-20T10:00:00Z"}}"#,
            event_id, reference, status, amount
        )
        .into_bytes()
    }

    #[test]
    fn callback_with_valid_signature_normalizes() {
        let gateway = test_gateway();
        let body = callback_body("evt-1", "abc123", "captured", "150.00");
        let sig = signature::sign("whsec_test", &body);

        let event = gateway.parse_callback(&body, &sig).unwrap();
        assert_eq!(event.external_event_id, "evt-1");
        assert_eq!(event.external_reference, "abc123");
        assert_eq!(event.status, PaymentStatus::Approved);
        assert_eq!(event.amount, "150.00".parse().unwrap());
    }

    #[test]
    fn callback_with_bad_signature_is_rejected_before_parsing() {
        let gateway = test_gateway();
        let body = callback_body("evt-1", "abc123", "approved", "150.00");
        let sig = signature::sign("wrong_secret", &body);

        let result = gateway.parse_callback(&body, &sig);
        assert!(matches!(result, Err(GatewayError::Authenticity(_))));
    }

    #[test]
    fn unknown_status_is_invalid_payload() {
        let gateway = test_gateway();
        let body = callback_body("evt-1", "abc123", "mystery", "150.00");
        let sig = signature::sign("whsec_test", &body);

        let result = gateway.parse_callback(&body, &sig);
        assert!(matches!(result, Err(GatewayError::InvalidPayload(_))));
    }

    #[test]
    fn status_vocabulary_normalization() {
        for (raw, expected) in [
            ("approved", PaymentStatus::Approved),
            ("DECLINED", PaymentStatus::Rejected),
            ("processing", PaymentStatus::Pending),
            ("reversed", PaymentStatus::Refunded),
        ] {
            assert_eq!(normalize_status(raw).unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn non_positive_total_is_invalid_order() {
        let gateway = test_gateway();
        let order = Order::new(
            "ord-1".into(),
            "ORD-1".into(),
            "cust-1".into(),
            vec![LineItem {
                product_id: "p1".into(),
                name: "Freebie".into(),
                quantity: 1,
                unit_price: Decimal::ZERO,
            }],
            "EUR".into(),
        );
        let result = gateway.create_intent(&order).await;
        assert!(matches!(result, Err(GatewayError::InvalidOrder(_))));
    }

    #[tokio::test]
    async fn unsupported_currency_is_invalid_order() {
        let gateway = test_gateway();
        let order = Order::new(
            "ord-1".into(),
            "ORD-1".into(),
            "cust-1".into(),
            vec![LineItem {
                product_id: "p1".into(),
                name: "Mug".into(),
                quantity: 1,
                unit_price: "10.00".parse().unwrap(),
            }],
            "XXX".into(),
        );
        let result = gateway.create_intent(&order).await;
        assert!(matches!(result, Err(GatewayError::InvalidOrder(_))));
    }
}
