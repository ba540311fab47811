//! Tracking aggregation
//!
//! - **aggregator**: read-side view combining an order's state with its
//!   tracking history, ordered by carrier-reported occurrence time
//! - **refresh**: scheduled poll of pull-only carriers; polled events go
//!   through the same ledger path as webhooks, so dedup and the state
//!   machine apply identically

pub mod aggregator;
pub mod refresh;

pub use aggregator::{TrackingAggregator, TrackingSummary};
pub use refresh::TrackingRefresher;
