//! Webhook routes
//!
//! Authenticated by payload signature (`X-Signature` header), not by JWT.
//! A 2xx acknowledges the delivery; any non-2xx makes the sender redeliver.

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/api/webhooks/payment", post(handler::payment))
        .route("/api/webhooks/carrier/{code}", post(handler::carrier))
}
