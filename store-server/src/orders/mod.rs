//! Order ledger module
//!
//! - **state_machine**: the authoritative transition table
//! - **storage**: redb persistence for orders, event logs and
//!   reconciliation history
//! - **manager**: OrderLedger, the exclusive owner of order records;
//!   applies normalized events with per-order serialization and
//!   insert-if-absent deduplication

pub mod manager;
pub mod state_machine;
pub mod storage;

// Re-exports
pub use manager::{ApplyOutcome, LedgerError, LedgerResult, OrderLedger};
pub use storage::{LedgerStorage, StorageError, StorageResult};

// Re-export shared types for convenience
pub use shared::order::{
    LineItem, Order, OrderEventKind, OrderState, PaymentEvent, PaymentStatus, TrackingEvent,
    TrackingEventCode,
};
