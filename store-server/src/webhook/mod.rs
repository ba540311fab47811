//! Webhook ingestion
//!
//! Entry point for at-least-once deliveries from the payment gateway and
//! carriers. Verification happens before anything is recorded; everything
//! verified is acknowledged so the sender stops redelivering, even when
//! the event turns out to be a duplicate or an inconsistency.

pub mod ingestor;

pub use ingestor::WebhookIngestor;
