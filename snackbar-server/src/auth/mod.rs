//! 认证授权模块
//!
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文
//! - [`require_admin`] - 管理员中间件
//! - [`password`] - Argon2 管理员密码

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{ADMIN_ROLE, Claims, CurrentUser, JwtConfig, JwtError, JwtService};
pub use middleware::require_admin;
