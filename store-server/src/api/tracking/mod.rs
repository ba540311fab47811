//! Tracking API

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/tracking/{order_id}", get(handler::summary))
}
