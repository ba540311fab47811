//! API routes
//!
//! # Route table
//!
//! | Path | Method | Description | Auth | Rate tier |
//! |------|--------|-------------|------|-----------|
//! | /api/health | GET | Health check | none | none |
//! | /api/orders | POST | Create order | none | strict |
//! | /api/payments/intent | POST | Create payment intent | none | strict |
//! | /api/contact | POST | Contact form | none | strict |
//! | /api/tracking/{order_id} | GET | Tracking summary | none | standard |
//! | /api/webhooks/payment | POST | Gateway callback | signature | none |
//! | /api/webhooks/carrier/{code} | POST | Carrier webhook | signature | none |
//! | /api/admin/orders | GET | List orders | JWT admin | none |
//! | /api/admin/orders/{id}/status | POST | Set order status | JWT admin | none |
//! | /api/admin/orders/{id}/label | POST | Create shipping label | JWT admin | none |
//! | /api/admin/reconciliation | GET | List recon records | JWT admin | none |
//! | /api/admin/reconciliation/run | POST | Trigger recon run | JWT admin | none |
//!
//! Webhook routes are authenticated by payload signature inside the
//! adapters; rate limiting them would turn sender redelivery into an
//! outage amplifier.

pub mod admin;
pub mod contact;
pub mod health;
pub mod orders;
pub mod payments;
pub mod tracking;
pub mod webhooks;

use axum::Router;
use axum::middleware::from_fn_with_state;
use http::{HeaderName, HeaderValue};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;
use crate::rate_limit::{rate_limit_standard, rate_limit_strict};

/// Request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Assemble the full application router
pub fn create_router(state: ServerState) -> Router {
    let strict = from_fn_with_state(state.clone(), rate_limit_strict);
    let standard = from_fn_with_state(state.clone(), rate_limit_standard);

    Router::new()
        .merge(health::router())
        .merge(orders::router().layer(strict.clone()))
        .merge(payments::router().layer(strict.clone()))
        .merge(contact::router().layer(strict))
        .merge(tracking::router().layer(standard))
        .merge(webhooks::router())
        .merge(admin::router(state.clone()))
        // ========== Tower HTTP middleware ==========
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}
