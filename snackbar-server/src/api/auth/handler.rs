//! Authentication Handlers
//!
//! 单一管理员账户：密码的 Argon2 哈希来自配置，登录成功签发 JWT。

use std::time::Duration;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::auth::{ADMIN_ROLE, password};
use crate::core::ServerState;
use crate::security_log;
use shared::{ApiResponse, AppError, AppResult, ErrorCode};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// 管理员用户 ID (写入 JWT sub)
const ADMIN_USER_ID: &str = "admin";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    /// 秒
    pub expires_in: i64,
}

/// Login handler
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let Some(hash) = state.admin_password_hash.clone() else {
        return Err(AppError::new(ErrorCode::LoginDisabled));
    };

    // Fixed delay to prevent timing attacks (before checking result)
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let password_valid = password::verify_password(&req.password, &hash)
        .map_err(|e| AppError::internal(format!("Password verification failed: {}", e)))?;

    if !password_valid {
        security_log!(WARN, "login_failed", reason = "invalid_password");
        return Err(AppError::invalid_credentials());
    }

    let jwt = state.get_jwt_service();
    let token = jwt
        .generate_token(ADMIN_USER_ID, ADMIN_ROLE)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {}", e)))?;

    security_log!(INFO, "admin_login", user_id = ADMIN_USER_ID);

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_in: jwt.expires_in_seconds(),
    })))
}
