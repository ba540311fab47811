//! Shared types for the storefront pipeline
//!
//! Common types used across the workspace: the order domain model,
//! normalized payment/tracking events, reconciliation records, the
//! pipeline error taxonomy and the unified API response envelope.

pub mod error;
pub mod order;
pub mod response;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{PipelineError, PipelineResult};
pub use response::ApiResponse;
