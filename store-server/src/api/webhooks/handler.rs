//! Webhook handlers
//!
//! The raw body bytes go to the adapter untouched: signature verification
//! must see exactly what the sender signed, so no Json extractor here.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
};
use serde::Serialize;
use shared::ApiResponse;

use crate::core::ServerState;
use crate::orders::ApplyOutcome;
use crate::utils::{AppError, AppResult};

const SIGNATURE_HEADER: &str = "x-signature";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    /// applied | recorded | duplicate | no_matching_order | rejected_transition
    pub outcome: &'static str,
}

fn ack(outcome: &ApplyOutcome) -> WebhookAck {
    let outcome = match outcome {
        ApplyOutcome::Applied { .. } => "applied",
        ApplyOutcome::Recorded => "recorded",
        ApplyOutcome::Duplicate => "duplicate",
        ApplyOutcome::NoMatchingOrder => "no_matching_order",
        ApplyOutcome::TransitionRejected { .. } => "rejected_transition",
    };
    WebhookAck { outcome }
}

fn signature(headers: &HeaderMap) -> AppResult<&str> {
    headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Authenticity("missing X-Signature header".to_string()))
}

/// POST /api/webhooks/payment - gateway payment callback
pub async fn payment(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let sig = signature(&headers)?;
    let outcome = state.ingestor.ingest_payment(&body, sig).await?;
    Ok(Json(ApiResponse::ok(ack(&outcome))))
}

/// POST /api/webhooks/carrier/{code} - carrier tracking webhook
pub async fn carrier(
    State(state): State<ServerState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let sig = signature(&headers)?;
    let outcome = state.ingestor.ingest_carrier(&code, &body, sig).await?;
    Ok(Json(ApiResponse::ok(ack(&outcome))))
}
