//! Order API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;

use crate::api::blocking;
use crate::core::ServerState;
use crate::receipt::{RECEIPT_WIDTH, ReceiptRenderer};
use shared::models::{CreateOrderRequest, Order, RefundLine, UpdateOrderRequest};
use shared::{ApiResponse, AppResult};

const RESOURCE: &str = "order";

/// GET /api/orders - 全部订单，最新在前
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = blocking(move || state.orders.list()).await?;
    Ok(Json(ApiResponse::success(orders)))
}

/// GET /api/orders/:id
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let order = blocking(move || state.orders.get(id)).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// POST /api/orders - 下单
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let service = state.orders.clone();
    let order = blocking(move || service.create(payload)).await?;

    state.broadcast_sync(RESOURCE, "created", &order.id.to_string(), Some(&order));

    Ok(Json(ApiResponse::success(order)))
}

/// PUT /api/orders/:id - 修改明细 / 分类 / 状态
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let service = state.orders.clone();
    let order = blocking(move || service.update(id, payload)).await?;

    state.broadcast_sync(RESOURCE, "updated", &order.id.to_string(), Some(&order));
    Ok(Json(ApiResponse::success(order)))
}

/// PATCH /api/orders/:id/confirm - 确认并导出账本
pub async fn confirm(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let service = state.orders.clone();
    let order = blocking(move || service.confirm(id)).await?;

    state.broadcast_sync(RESOURCE, "updated", &order.id.to_string(), Some(&order));
    Ok(Json(ApiResponse::success(order)))
}

/// PATCH /api/orders/:id/deliver
pub async fn deliver(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let service = state.orders.clone();
    let order = blocking(move || service.deliver(id)).await?;

    state.broadcast_sync(RESOURCE, "updated", &order.id.to_string(), Some(&order));
    Ok(Json(ApiResponse::success(order)))
}

/// GET /api/orders/:id/receipt - 纯文本小票
pub async fn receipt(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let service = state.orders.clone();
    let order = blocking(move || service.get(id)).await?;

    let text = ReceiptRenderer::new(RECEIPT_WIDTH, state.config.timezone)
        .render(&state.config.brand_name, &order);
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

/// GET /api/orders/number/:order_number/refunds - 每个商品的已退 / 可退数量
pub async fn refund_summary(
    State(state): State<ServerState>,
    Path(order_number): Path<u64>,
) -> AppResult<Json<ApiResponse<Vec<RefundLine>>>> {
    let lines = blocking(move || state.refunds.refund_summary(order_number)).await?;
    Ok(Json(ApiResponse::success(lines)))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResponse {
    deleted_count: u64,
}

/// DELETE /api/orders - 清空订单 (管理员)
pub async fn delete_all(
    State(state): State<ServerState>,
) -> AppResult<Json<ApiResponse<DeleteAllResponse>>> {
    let service = state.orders.clone();
    let deleted_count = blocking(move || service.delete_all()).await?;

    state.broadcast_sync::<()>(RESOURCE, "deleted", "*", None);
    Ok(Json(ApiResponse::success(DeleteAllResponse { deleted_count })))
}
