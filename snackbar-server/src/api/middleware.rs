//! 请求日志中间件
//!
//! 记录所有进入的 HTTP 请求，包含请求 ID、路径、状态码和延迟

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{info, warn};

use crate::auth::CurrentUser;

/// 请求日志中间件
///
/// 4xx/5xx 以 warn 级别记录，其余为 info。
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    // 从请求头获取 Request ID，如果不存在则生成一个
    let request_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let user = req
        .extensions()
        .get::<CurrentUser>()
        .map(|u| format!("{}({})", u.id, u.role));

    info!(
        target: "http_access",
        request_id = %request_id,
        method = %method,
        path = %path,
        user = ?user,
        "Request started"
    );

    let response = next.run(req).await;

    let latency_ms = start.elapsed().as_millis();
    let status = response.status();

    if status.is_server_error() {
        warn!(
            target: "http_access",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            target: "http_access",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            "Request completed with client error"
        );
    } else {
        info!(
            target: "http_access",
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            "Request completed"
        );
    }

    response
}
