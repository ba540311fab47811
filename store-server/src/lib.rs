//! Storefront Server - order payment, webhook ingestion & reconciliation
//!
//! # Architecture overview
//!
//! The commerce-critical backend of the storefront:
//!
//! - **Order ledger** (`orders`): authoritative order state machine with a
//!   redb-backed, append-only payment event log
//! - **Webhook ingestion** (`webhook`): verify → deduplicate → apply, with
//!   idempotent acknowledgment of at-least-once deliveries
//! - **Adapters** (`gateway`, `carrier`): normalize provider payloads into
//!   the fixed internal event shapes
//! - **Tracking** (`tracking`): per-order shipment history, webhook-fed and
//!   pollable for pull-only carriers
//! - **Reconciliation** (`reconciliation`): internal ledger vs gateway
//!   settlement report, drift surfaced as records
//! - **Rate limiting** (`rate_limit`): fixed-window limiter for public
//!   mutation endpoints
//!
//! # Module structure
//!
//! ```text
//! store-server/src/
//! ├── core/            # config, state, server, background tasks
//! ├── auth/            # admin JWT validation
//! ├── rate_limit/      # fixed-window rate limiter + middleware
//! ├── gateway/         # payment gateway adapter
//! ├── carrier/         # carrier adapter + registry
//! ├── orders/          # order ledger, state machine, redb storage
//! ├── webhook/         # webhook ingestor
//! ├── tracking/        # tracking aggregator + scheduled refresh
//! ├── reconciliation/  # reconciliation engine
//! ├── api/             # HTTP routes and handlers
//! └── utils/           # errors, logger, signatures
//! ```

pub mod api;
pub mod auth;
pub mod carrier;
pub mod core;
pub mod gateway;
pub mod orders;
pub mod rate_limit;
pub mod reconciliation;
pub mod tracking;
pub mod utils;
pub mod webhook;

// Re-export public types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::{LedgerStorage, OrderLedger};
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use utils::{AppError, AppResult};

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// Load environment and initialize logging
///
/// Called once at process start, before config is read.
pub fn setup_environment() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let log_dir = std::env::var("LOG_DIR").ok();
    let log_level = std::env::var("LOG_LEVEL").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());
    Ok(())
}
