//! Order domain model
//!
//! - **types**: state/status enums and the state-machine event vocabulary
//! - **model**: the Order aggregate and its line items
//! - **event**: normalized payment/tracking events, settlement lines and
//!   reconciliation records

pub mod event;
pub mod model;
pub mod types;

// Re-exports
pub use event::{PaymentEvent, ReconciliationRecord, SettlementLine, TrackingEvent};
pub use model::{LineItem, Order};
pub use types::{DiscrepancyKind, OrderEventKind, OrderState, PaymentStatus, TrackingEventCode};
