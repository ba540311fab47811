//! Order lifecycle enums and event vocabulary

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order lifecycle state
///
/// The happy path runs Created → AwaitingPayment → Paid →
/// FulfillmentPending → Shipped → Delivered. Side branches:
/// PaymentFailed (from AwaitingPayment), Refunded (from Paid, Shipped or
/// Delivered) and Cancelled (from Created or AwaitingPayment only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Created,
    AwaitingPayment,
    Paid,
    FulfillmentPending,
    Shipped,
    Delivered,
    PaymentFailed,
    Refunded,
    Cancelled,
}

impl OrderState {
    /// Terminal states accept no further events
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Delivered | Self::PaymentFailed | Self::Refunded | Self::Cancelled
        )
    }
}

impl fmt::Display for OrderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::FulfillmentPending => "fulfillment_pending",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::PaymentFailed => "payment_failed",
            Self::Refunded => "refunded",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Events the order state machine consumes
///
/// Produced by the gateway adapter (payment feedback), the carrier adapter
/// (dispatch/delivery milestones) and admin actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    IntentCreated,
    PaymentApproved,
    PaymentRejected,
    FulfillmentStarted,
    CarrierDispatched,
    CarrierDelivered,
    RefundApproved,
    AdminCancelled,
}

impl fmt::Display for OrderEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IntentCreated => "intent_created",
            Self::PaymentApproved => "payment_approved",
            Self::PaymentRejected => "payment_rejected",
            Self::FulfillmentStarted => "fulfillment_started",
            Self::CarrierDispatched => "carrier_dispatched",
            Self::CarrierDelivered => "carrier_delivered",
            Self::RefundApproved => "refund_approved",
            Self::AdminCancelled => "admin_cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Normalized payment status reported by the gateway
///
/// Gateway-specific vocabularies are mapped into this fixed set by the
/// gateway adapter; core logic never sees provider strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Rejected,
    Pending,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
            Self::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}

/// Carrier-reported milestone code
///
/// Unknown carrier codes are preserved verbatim under `Unclassified` so the
/// audit trail never silently loses a carrier signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEventCode {
    Dispatched,
    InTransit,
    Delivered,
    Exception,
    Unclassified(String),
}

impl TrackingEventCode {
    /// Map a raw carrier code into the internal vocabulary
    pub fn from_carrier_code(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "dispatched" | "picked_up" | "shipment_created" => Self::Dispatched,
            "in_transit" | "transit" | "out_for_delivery" => Self::InTransit,
            "delivered" => Self::Delivered,
            "exception" | "failed_delivery" | "returned" => Self::Exception,
            _ => Self::Unclassified(raw.to_string()),
        }
    }
}

impl fmt::Display for TrackingEventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatched => write!(f, "dispatched"),
            Self::InTransit => write!(f, "in_transit"),
            Self::Delivered => write!(f, "delivered"),
            Self::Exception => write!(f, "exception"),
            Self::Unclassified(raw) => write!(f, "unclassified({})", raw),
        }
    }
}

/// Kind of drift detected between the internal ledger and the gateway
/// settlement report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    AmountMismatch,
    StatusMismatch,
    MissingInternally,
    MissingOnGateway,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(OrderState::Delivered.is_terminal());
        assert!(OrderState::Refunded.is_terminal());
        assert!(OrderState::Cancelled.is_terminal());
        assert!(OrderState::PaymentFailed.is_terminal());
        assert!(!OrderState::Paid.is_terminal());
        assert!(!OrderState::Shipped.is_terminal());
    }

    #[test]
    fn unknown_carrier_code_is_preserved_verbatim() {
        let code = TrackingEventCode::from_carrier_code("CUSTOMS_HOLD_47");
        assert_eq!(
            code,
            TrackingEventCode::Unclassified("CUSTOMS_HOLD_47".to_string())
        );
    }

    #[test]
    fn known_carrier_codes_normalize() {
        assert_eq!(
            TrackingEventCode::from_carrier_code("picked_up"),
            TrackingEventCode::Dispatched
        );
        assert_eq!(
            TrackingEventCode::from_carrier_code("OUT_FOR_DELIVERY"),
            TrackingEventCode::InTransit
        );
    }
}
