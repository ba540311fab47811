//! Tracking API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::ApiResponse;

use crate::core::ServerState;
use crate::tracking::TrackingSummary;
use crate::utils::AppResult;

/// GET /api/tracking/{order_id} - order state plus shipment history
pub async fn summary(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<ApiResponse<TrackingSummary>>> {
    let summary = state
        .tracker
        .summary(&order_id)
        .map_err(shared::PipelineError::from)?;
    Ok(Json(ApiResponse::ok(summary)))
}
