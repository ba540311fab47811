//! Fulfillment admin API
//!
//! Every route here sits behind [`require_admin`]; tokens come from the
//! back-office identity provider, not from this service.

mod handler;

use axum::middleware::from_fn_with_state;
use axum::{
    Router,
    routing::{get, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router(state: ServerState) -> Router<ServerState> {
    Router::new()
        .route("/api/admin/orders", get(handler::list_orders))
        .route("/api/admin/orders/{id}/status", post(handler::set_status))
        .route("/api/admin/orders/{id}/label", post(handler::create_label))
        .route("/api/admin/reconciliation", get(handler::list_records))
        .route("/api/admin/reconciliation/run", post(handler::run))
        .layer(from_fn_with_state(state, require_admin))
}
