//! 认证中间件
//!
//! 为管理端接口提供 Axum 中间件。点单、退款接口对柜台开放，
//! 报表和清空订单需要管理员令牌。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::auth::{CurrentUser, JwtError, JwtService};
use crate::core::ServerState;
use crate::security_log;
use shared::AppError;

/// 管理员中间件 - 要求管理员令牌
///
/// 从 `Authorization: Bearer <token>` 头提取并验证 JWT，
/// 验证成功后将 [`CurrentUser`] 注入请求扩展。
///
/// # 错误处理
///
/// | 错误 | HTTP 状态码 |
/// |------|------------|
/// | 无 Authorization 头 | 401 NotAuthenticated |
/// | 令牌过期 | 401 TokenExpired |
/// | 无效令牌 | 401 TokenInvalid |
/// | 非管理员 | 403 AdminRequired |
pub async fn require_admin(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 允许 CORS 预检的 OPTIONS 请求
    if req.method() == http::Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let auth_header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) => JwtService::extract_from_header(header)
            .ok_or_else(|| AppError::invalid_token("Invalid authorization header"))?,
        None => {
            security_log!(WARN, "auth_missing", uri = %req.uri());
            return Err(AppError::not_authenticated());
        }
    };

    let user = match state.get_jwt_service().validate_token(token) {
        Ok(claims) => CurrentUser::from(claims),
        Err(e) => {
            security_log!(WARN, "auth_failed", error = %e, uri = %req.uri());

            return match e {
                JwtError::ExpiredToken => Err(AppError::token_expired()),
                _ => Err(AppError::invalid_token("Invalid token")),
            };
        }
    };

    if !user.is_admin() {
        security_log!(
            WARN,
            "admin_required",
            user_id = %user.id,
            user_role = %user.role
        );
        return Err(AppError::admin_required());
    }

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
