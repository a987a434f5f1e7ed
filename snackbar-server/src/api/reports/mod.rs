//! Report API 模块 (管理员)
//!
//! | 路径 | 说明 |
//! |------|------|
//! | /api/reports/orders | 按分类汇总的销售明细 |
//! | /api/reports/refunds | 按分类汇总的退款明细 |
//! | /api/reports/performance | 分类 KPI |
//! | /api/reports/timeline | 每日销售 / 退款 |
//! | /api/reports/summary | 总览 |
//! | /api/reports/orders.csv | 销售 CSV 下载 |
//! | /api/reports/refunds.csv | 退款 CSV 下载 |

mod handler;

use axum::{Router, middleware, routing::get};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router(state: &ServerState) -> Router<ServerState> {
    Router::new().nest("/api/reports", routes(state))
}

fn routes(state: &ServerState) -> Router<ServerState> {
    Router::new()
        .route("/orders", get(handler::orders))
        .route("/refunds", get(handler::refunds))
        .route("/performance", get(handler::performance))
        .route("/timeline", get(handler::timeline))
        .route("/summary", get(handler::summary))
        .route("/orders.csv", get(handler::orders_csv))
        .route("/refunds.csv", get(handler::refunds_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
}
