//! Health check route
//!
//! | Path | Method | Description | Auth |
//! |------|--------|-------------|------|
//! | /api/health | GET | Liveness + ledger reachability | none |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// ok | degraded
    status: &'static str,
    version: &'static str,
    environment: String,
    /// Whether the ledger database answers reads
    ledger: bool,
    carriers: usize,
}

async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let ledger_ok = state.ledger.list_orders(None).is_ok();

    Json(HealthResponse {
        status: if ledger_ok { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.environment.clone(),
        ledger: ledger_ok,
        carriers: state.carriers.iter().count(),
    })
}
