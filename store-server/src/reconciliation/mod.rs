//! Reconciliation
//!
//! Periodic comparison of the internal payment-event ledger against the
//! gateway's settlement report. Runs never mutate orders; they only append
//! records for operators to act on.

pub mod engine;

pub use engine::{ReconciliationEngine, RunSummary};
