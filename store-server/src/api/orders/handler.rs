//! Order API handlers

use axum::{
    Json,
    extract::State,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::ApiResponse;
use shared::order::{LineItem, Order};
use validator::Validate;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 64))]
    pub customer_ref: String,
    #[validate(length(min = 1), nested)]
    pub items: Vec<LineItemRequest>,
    /// ISO 4217 code, e.g. "EUR"
    #[validate(length(equal = 3))]
    pub currency: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_id: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(range(min = 1))]
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// POST /api/orders - create an order in Created state
pub async fn create(
    State(state): State<ServerState>,
    Json(request): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let items = request
        .items
        .into_iter()
        .map(|item| LineItem {
            product_id: item.product_id,
            name: item.name,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    let order = state
        .ledger
        .create_order(request.customer_ref, items, request.currency)
        .map_err(shared::PipelineError::from)?;

    Ok(Json(ApiResponse::ok(order)))
}
