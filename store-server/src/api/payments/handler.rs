//! Payment API handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use shared::ApiResponse;
use shared::order::OrderState;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct IntentReply {
    pub order_id: String,
    pub state: OrderState,
    /// Where the customer completes the payment
    pub redirect_url: String,
    pub external_reference: String,
}

/// POST /api/payments/intent - create a gateway intent and attach it
///
/// Gateway unavailability surfaces as 503; the customer retries and no
/// order state has changed. The order only moves to AwaitingPayment after
/// the gateway accepted the intent.
pub async fn create_intent(
    State(state): State<ServerState>,
    Json(request): Json<IntentRequest>,
) -> AppResult<Json<ApiResponse<IntentReply>>> {
    let order = state
        .ledger
        .get_order(&request.order_id)
        .map_err(shared::PipelineError::from)?
        .ok_or_else(|| AppError::not_found(format!("order {}", request.order_id)))?;

    let intent = state.gateway.create_intent(&order).await
        .map_err(shared::PipelineError::from)?;

    let order = state
        .ledger
        .attach_intent(&order.order_id, &intent.external_reference)
        .await
        .map_err(shared::PipelineError::from)?;

    Ok(Json(ApiResponse::ok(IntentReply {
        order_id: order.order_id,
        state: order.state,
        redirect_url: intent.redirect_url,
        external_reference: intent.external_reference,
    })))
}
