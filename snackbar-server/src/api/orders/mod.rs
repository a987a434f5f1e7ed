//! Order API 模块

mod handler;

use axum::{
    Router, middleware,
    routing::{get, patch},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router(state: &ServerState) -> Router<ServerState> {
    Router::new().nest("/api/orders", routes(state))
}

fn routes(state: &ServerState) -> Router<ServerState> {
    // 柜台接口，无需认证
    let counter_routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
        .route("/{id}/confirm", patch(handler::confirm))
        .route("/{id}/deliver", patch(handler::deliver))
        .route("/{id}/receipt", get(handler::receipt))
        .route("/number/{order_number}/refunds", get(handler::refund_summary));

    let admin_routes = Router::new()
        .route("/", axum::routing::delete(handler::delete_all))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    counter_routes.merge(admin_routes)
}
