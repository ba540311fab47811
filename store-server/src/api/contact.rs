//! Contact form route
//!
//! Validates and records inbound messages; delivery to the support inbox
//! happens out of band from the log stream.

use axum::{Json, Router, extract::State, routing::post};
use serde::Deserialize;
use shared::ApiResponse;
use validator::Validate;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/contact", post(submit))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 64))]
    pub order_ref: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub message: String,
}

/// POST /api/contact
pub async fn submit(
    State(_state): State<ServerState>,
    Json(request): Json<ContactRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    tracing::info!(
        name = %request.name,
        email = %request.email,
        order_ref = ?request.order_ref,
        message_len = request.message.len(),
        "Contact message received"
    );
    Ok(Json(ApiResponse::ok_with_message((), "Message received")))
}
