//! Admin API handlers

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::ApiResponse;
use shared::order::{Order, OrderState, ReconciliationRecord};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::reconciliation::{RunSummary, engine::summarize};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    /// Filter by lifecycle state
    pub state: Option<OrderState>,
}

/// GET /api/admin/orders - list orders, optionally by state
pub async fn list_orders(
    State(state): State<ServerState>,
    Query(query): Query<ListOrdersQuery>,
) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .ledger
        .list_orders(query.state)
        .map_err(shared::PipelineError::from)?;
    Ok(Json(ApiResponse::ok(orders)))
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderState,
}

/// POST /api/admin/orders/{id}/status - operator-driven transition
///
/// Only fulfillment_pending and cancelled are settable; the state machine
/// still gates both, so an operator cannot force an illegal move.
pub async fn set_status(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<SetStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = state
        .ledger
        .admin_transition(&order_id, request.status)
        .await
        .map_err(shared::PipelineError::from)?;

    tracing::info!(operator = %user.id, %order_id, status = %request.status, "Admin set order status");
    Ok(Json(ApiResponse::ok(order)))
}

#[derive(Debug, Deserialize)]
pub struct CreateLabelRequest {
    pub carrier_code: String,
}

#[derive(Debug, Serialize)]
pub struct LabelReply {
    pub order: Order,
    pub label_url: String,
}

/// POST /api/admin/orders/{id}/label - request a carrier shipping label
///
/// Records the carrier and tracking code on the order; the state only
/// moves to Shipped when the carrier's dispatch event arrives.
pub async fn create_label(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateLabelRequest>,
) -> AppResult<Json<ApiResponse<LabelReply>>> {
    let order = state
        .ledger
        .get_order(&order_id)
        .map_err(shared::PipelineError::from)?
        .ok_or_else(|| AppError::not_found(format!("order {}", order_id)))?;

    if order.state != OrderState::FulfillmentPending {
        return Err(AppError::invalid(format!(
            "labels can only be created in fulfillment_pending, order is {}",
            order.state
        )));
    }

    let carrier = state
        .carriers
        .get(&request.carrier_code)
        .map_err(shared::PipelineError::from)?;
    let label = carrier
        .create_label(&order)
        .await
        .map_err(shared::PipelineError::from)?;

    let order = state
        .ledger
        .set_shipping_label(&order_id, &request.carrier_code, &label.tracking_code)
        .await
        .map_err(shared::PipelineError::from)?;

    tracing::info!(operator = %user.id, %order_id, carrier = %request.carrier_code, "Shipping label attached");
    Ok(Json(ApiResponse::ok(LabelReply {
        order,
        label_url: label.label_url,
    })))
}

/// Reconciliation window; both bounds are required
///
/// The fields stay optional at the serde level so an absent or misspelled
/// parameter produces the enveloped 400 below instead of a bare extractor
/// rejection.
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl WindowQuery {
    fn resolve(&self) -> AppResult<(DateTime<Utc>, DateTime<Utc>)> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Err(AppError::invalid("start and end are both required"));
        };
        if start > end {
            return Err(AppError::invalid("window start is after its end"));
        }
        Ok((start, end))
    }
}

/// GET /api/admin/reconciliation - records detected inside a window
pub async fn list_records(
    State(state): State<ServerState>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<ApiResponse<Vec<ReconciliationRecord>>>> {
    let (start, end) = query.resolve()?;
    let records = state.recon.records_in_window(start, end)?;
    Ok(Json(ApiResponse::ok(records)))
}

#[derive(Debug, Serialize)]
pub struct RunReply {
    pub summary: RunSummary,
    pub records: Vec<ReconciliationRecord>,
}

/// POST /api/admin/reconciliation/run - compare ledger vs settlement now
pub async fn run(
    State(state): State<ServerState>,
    Extension(user): Extension<CurrentUser>,
    Json(query): Json<WindowQuery>,
) -> AppResult<Json<ApiResponse<RunReply>>> {
    let (start, end) = query.resolve()?;
    let records = state.recon.reconcile(start, end).await?;
    let summary = summarize(&records);

    tracing::info!(
        operator = %user.id,
        discrepancies = summary.discrepancies,
        "Reconciliation run triggered"
    );
    Ok(Json(ApiResponse::ok(RunReply { summary, records })))
}
