//! Order API

mod handler;

pub use handler::CreateOrderRequest;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/orders", post(handler::create))
}
