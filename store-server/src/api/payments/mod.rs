//! Payment API

mod handler;

pub use handler::{IntentRequest, IntentReply};

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/payments/intent", post(handler::create_intent))
}
