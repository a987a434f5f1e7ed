//! SnackBar Server - 小吃柜台点单系统
//!
//! # 架构概述
//!
//! - **存储** (`db`): 嵌入式 redb，订单 / 退款两张表
//! - **订单** (`orders`): 下单、修改、确认、出餐
//! - **退款** (`refunds`): 按剩余可退量截断的退款
//! - **账本** (`ledger`): 确认订单与退款写入 Google Sheets (后台 worker)
//! - **认证** (`auth`): 管理员 Argon2 密码 + JWT
//! - **HTTP API** (`api`): axum 路由、SSE 变更推送
//!
//! # 模块结构
//!
//! ```text
//! snackbar-server/src/
//! ├── core/          # 配置、状态、后台任务、错误
//! ├── auth/          # JWT 认证、管理员中间件
//! ├── api/           # HTTP 路由和处理器
//! ├── db/            # redb 存储
//! ├── orders/        # 订单生命周期
//! ├── refunds/       # 退款
//! ├── ledger/        # 账本导出
//! ├── receipt.rs     # 小票文本
//! └── utils/         # 日志、时间
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod ledger;
pub mod orders;
pub mod receipt;
pub mod refunds;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use orders::OrderService;
pub use refunds::RefundService;

// Re-export logger functions
pub use utils::logger::init_logger_with_file;

/// 设置运行环境: 加载 .env、创建工作目录、初始化日志
///
/// | 环境变量 | 默认值 |
/// |----------|--------|
/// | LOG_LEVEL | info |
/// | LOG_JSON | false |
/// | LOG_DIR | - |
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
    std::fs::create_dir_all(&work_dir)?;

    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into());
    let json = std::env::var("LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);
    let log_dir = std::env::var("LOG_DIR").ok();

    init_logger_with_file(&level, json, log_dir.as_deref())
}

pub fn print_banner() {
    println!(
        r#"
   _____                  __   ____
  / ___/____  ____ ______/ /__/ __ )____ ______
  \__ \/ __ \/ __ `/ ___/ //_/ __  / __ `/ ___/
 ___/ / / / / /_/ / /__/ ,< / /_/ / /_/ / /
/____/_/ /_/\__,_/\___/_/|_/_____/\__,_/_/
    "#
    );
}
