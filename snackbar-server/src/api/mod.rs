//! API 路由模块
//!
//! # 结构
//!
//! | 模块 | 路径 | 认证 |
//! |------|------|------|
//! | [`health`] | `/health` | 无 |
//! | [`menu`] | `/api/menu` | 无 |
//! | [`auth`] | `/api/auth/login` | 无 |
//! | [`orders`] | `/api/orders` | `DELETE` 需管理员 |
//! | [`refunds`] | `/api/refunds` | 无 |
//! | [`reports`] | `/api/reports` | 管理员 |
//! | [`events`] | `/api/events` | 无 |

pub mod auth;
pub mod events;
pub mod health;
pub mod menu;
pub mod middleware;
pub mod orders;
pub mod refunds;
pub mod reports;

use std::time::Duration;

use axum::Router;
use axum::middleware as axum_middleware;
use http::{HeaderName, HeaderValue, StatusCode};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::core::ServerState;
use shared::{AppError, AppResult};

/// Custom request ID generator
#[derive(Clone)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &http::Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Build a router with all routes registered (no middleware, state not yet applied)
///
/// `state` is only needed by the admin guards.
pub fn build_router(state: &ServerState) -> Router<ServerState> {
    Router::new()
        // Health API - public route
        .merge(health::router())
        // Catalog - public route
        .merge(menu::router())
        // Auth API - public login
        .merge(auth::router())
        // Counter APIs
        .merge(orders::router(state))
        .merge(refunds::router())
        .merge(events::router())
        // Admin API
        .merge(reports::router(state))
}

/// Build a fully configured application with all middleware and state
///
/// Used by both the HTTP server and the integration tests.
pub fn build_app(state: ServerState) -> Router {
    let request_timeout = Duration::from_millis(state.config.request_timeout_ms);

    build_router(&state)
        // ========== Tower HTTP Middleware ==========
        .layer(timeout_layer(request_timeout))
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Compression - Gzip compress responses
        .layer(CompressionLayer::new())
        // Request logging
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        // Trace - Request tracing
        .layer(TraceLayer::new_for_http())
        // ========== Application Middleware ==========
        // Request ID - Generate unique ID for each request
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static("x-request-id"),
            XRequestId,
        ))
        // Propagate request ID to response
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            "x-request-id",
        )))
        .with_state(state)
}

/// 超时返回 408
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
    TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

/// Run a synchronous storage call on the blocking pool
pub(crate) async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal(format!("blocking task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn slow_requests_time_out_with_408() {
        let app = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    "late"
                }),
            )
            .route("/fast", get(|| async { "ok" }))
            .layer(timeout_layer(Duration::from_millis(20)));

        let slow = Request::get("/slow").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(slow).await.unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

        let fast = Request::get("/fast").body(Body::empty()).unwrap();
        let response = app.oneshot(fast).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
