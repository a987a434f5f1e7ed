//! Refund API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::api::blocking;
use crate::core::ServerState;
use shared::models::{CreateRefundRequest, Refund};
use shared::{ApiResponse, AppResult};

const RESOURCE: &str = "refund";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub order_number: Option<u64>,
}

/// GET /api/refunds - 最新在前，可按订单号过滤
pub async fn list(
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Refund>>>> {
    let refunds = blocking(move || match query.order_number {
        Some(n) => state.refunds.list_by_order(n),
        None => state.refunds.list_all(),
    })
    .await?;
    Ok(Json(ApiResponse::success(refunds)))
}

/// POST /api/refunds - 退款 (数量按剩余可退量截断)
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateRefundRequest>,
) -> AppResult<Json<ApiResponse<Vec<Refund>>>> {
    let order_number = payload.order_number;
    let service = state.refunds.clone();
    let refunds = blocking(move || service.create(payload)).await?;

    tracing::info!(order_number, records = refunds.len(), "Refund recorded");
    for refund in &refunds {
        state.broadcast_sync(RESOURCE, "created", &refund.id.to_string(), Some(refund));
    }
    Ok(Json(ApiResponse::success(refunds)))
}
