use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;

/// 服务器配置 - 柜台节点的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (snackbar.redb) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | BUSINESS_TIMEZONE | Asia/Kolkata | 报表分桶、账本日期时区 |
/// | BRAND_NAME | SnackBar | CSV 文件名前缀、小票抬头 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志 |
/// | LOG_DIR | - | 日志目录 (未设置则只输出到控制台) |
/// | ADMIN_PASSWORD_HASH | - | 管理员 Argon2 PHC 哈希 |
/// | SHEETS_SPREADSHEET_ID | - | 账本表格 ID (未设置则关闭导出) |
/// | GOOGLE_SERVICE_ACCOUNT_EMAIL | - | 服务账号邮箱 |
/// | GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY | - | 服务账号私钥 (接受 `\n` 转义) |
/// | LEDGER_TIMEOUT_MS | 10000 | 单次账本请求超时(毫秒) |
/// | REQUEST_TIMEOUT_MS | 30000 | 请求超时(毫秒) |
/// | SHUTDOWN_TIMEOUT_MS | 10000 | 关闭超时(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/snackbar HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// 业务时区
    pub timezone: Tz,
    /// 品牌名
    pub brand_name: String,
    /// 管理员密码哈希 (PHC 格式)
    pub admin_password_hash: Option<String>,
    /// 账本导出配置
    pub ledger: LedgerConfig,
    /// 请求超时时间 (毫秒)
    pub request_timeout_ms: u64,
    /// 关闭超时时间 (毫秒)
    pub shutdown_timeout_ms: u64,
}

/// Google Sheets 账本配置
#[derive(Clone, Default)]
pub struct LedgerConfig {
    pub spreadsheet_id: Option<String>,
    pub service_account_email: Option<String>,
    pub private_key: Option<String>,
    /// 单次请求超时 (毫秒)
    pub timeout_ms: u64,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("service_account_email", &self.service_account_email)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

impl LedgerConfig {
    fn from_env() -> Self {
        Self {
            spreadsheet_id: non_empty_env("SHEETS_SPREADSHEET_ID"),
            service_account_email: non_empty_env("GOOGLE_SERVICE_ACCOUNT_EMAIL"),
            private_key: non_empty_env("GOOGLE_SERVICE_ACCOUNT_PRIVATE_KEY")
                .map(|k| k.replace("\\n", "\n")),
            timeout_ms: std::env::var("LEDGER_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        }
    }

    /// 三项凭据齐全才启用导出
    pub fn is_enabled(&self) -> bool {
        self.spreadsheet_id.is_some()
            && self.service_account_email.is_some()
            && self.private_key.is_some()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            timezone: std::env::var("BUSINESS_TIMEZONE")
                .ok()
                .and_then(|tz| tz.parse().ok())
                .unwrap_or(chrono_tz::Asia::Kolkata),
            brand_name: std::env::var("BRAND_NAME").unwrap_or_else(|_| "SnackBar".into()),
            admin_password_hash: non_empty_env("ADMIN_PASSWORD_HASH"),
            ledger: LedgerConfig::from_env(),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30000),
            shutdown_timeout_ms: std::env::var("SHUTDOWN_TIMEOUT_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10000),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库文件路径: work_dir/snackbar.redb
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("snackbar.redb")
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
