//! 菜单路由 (公共)

use axum::{Json, Router, routing::get};

use crate::core::ServerState;
use shared::ApiResponse;
use shared::models::{MENU, Menu};

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/menu", get(menu))
}

/// GET /api/menu - 静态菜单目录
pub async fn menu() -> Json<ApiResponse<Menu>> {
    Json(ApiResponse::success(MENU.clone()))
}
