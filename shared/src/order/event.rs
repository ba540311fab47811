//! Normalized external events and reconciliation records
//!
//! These are the only shapes core logic ever sees: gateway and carrier
//! adapters map provider-specific payloads into them at the boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{DiscrepancyKind, PaymentStatus, TrackingEventCode};

/// Normalized, deduplicated gateway callback
///
/// Immutable once recorded; the processed-event log guarantees the same
/// `external_event_id` is never applied twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Gateway-assigned event id, globally unique in the processed-event log
    pub external_event_id: String,
    /// External payment reference linking the event to an order
    pub external_reference: String,
    pub status: PaymentStatus,
    pub amount: Decimal,
    /// When the gateway says the event happened
    pub occurred_at: DateTime<Utc>,
    /// When we received the callback
    pub received_at: DateTime<Utc>,
}

/// Carrier-reported milestone, append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingEvent {
    /// Carrier-assigned event id (or synthesized for pull-based carriers)
    pub external_event_id: String,
    pub order_ref: String,
    pub carrier_code: String,
    pub code: TrackingEventCode,
    pub location: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

/// One line of the gateway's settlement report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementLine {
    pub external_reference: String,
    pub amount: Decimal,
    pub status: PaymentStatus,
}

/// Result of comparing one payment reference across both ledgers
///
/// Superseded (not mutated) by the next reconciliation run's record for the
/// same reference; full run history is retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    /// Identifies the run that produced this record; part of the storage
    /// key, so concurrent runs never overwrite each other's history
    pub run_id: String,
    /// External payment reference under comparison
    pub external_reference: String,
    pub order_id: Option<String>,
    pub internal_amount: Option<Decimal>,
    pub internal_status: Option<PaymentStatus>,
    pub gateway_amount: Option<Decimal>,
    pub gateway_status: Option<PaymentStatus>,
    pub kind: DiscrepancyKind,
    pub detected_at: DateTime<Utc>,
}
