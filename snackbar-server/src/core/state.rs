use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};

use crate::auth::{JwtService, password};
use crate::core::{BackgroundTasks, Config, Result, ServerError};
use crate::db::Storage;
use crate::ledger::{LedgerHandle, LedgerSink, LedgerWorker, SheetsClient};
use crate::orders::OrderService;
use crate::refunds::RefundService;
use shared::models::MENU;

/// 变更事件广播通道容量
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 资源版本管理器
///
/// 每种资源类型维护独立的版本号，支持原子递增。
/// 客户端可以通过版本号判断数据新旧。
#[derive(Debug, Default)]
pub struct ResourceVersions {
    versions: DashMap<String, u64>,
}

impl ResourceVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 递增指定资源的版本号并返回新值（从 1 开始）
    pub fn increment(&self, resource: &str) -> u64 {
        let mut entry = self.versions.entry(resource.to_string()).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 当前版本号，未出现过的资源为 0
    pub fn get(&self, resource: &str) -> u64 {
        self.versions.get(resource).map(|v| *v).unwrap_or(0)
    }
}

/// 资源变更通知 (SSE 推送)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub resource: String,
    pub version: u64,
    pub action: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// 服务器状态 - 持有所有服务的共享引用
///
/// | 字段 | 说明 |
/// |------|------|
/// | storage | redb 存储 (Arc 共享) |
/// | orders / refunds | 业务服务 |
/// | ledger | 账本导出队列 |
/// | jwt_service | JWT 认证服务 |
/// | events | 变更广播 |
///
/// Clone 只复制引用，所有处理器共享同一份状态。
#[derive(Clone, Debug)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 嵌入式存储
    pub storage: Storage,
    /// 订单服务
    pub orders: OrderService,
    /// 退款服务
    pub refunds: RefundService,
    /// 账本导出队列
    pub ledger: LedgerHandle,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
    /// 管理员密码哈希，None 表示管理员登录关闭
    pub admin_password_hash: Option<Arc<str>>,
    /// 变更广播
    pub events: broadcast::Sender<ChangeEvent>,
    /// 资源版本管理器 (用于 broadcast_sync 自动递增版本号)
    pub resource_versions: Arc<ResourceVersions>,
    tasks: Arc<Mutex<BackgroundTasks>>,
}

impl ServerState {
    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 存储 (work_dir/snackbar.redb)
    /// 3. 账本导出 (凭据齐全时)
    /// 4. 各服务
    pub async fn initialize(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.work_dir)?;

        let db_path = config.database_path();
        let storage = Storage::open(&db_path)?;
        tracing::info!("💾 Storage opened at {}", db_path.display());

        let sink: Option<Arc<dyn LedgerSink>> = if config.ledger.is_enabled() {
            match SheetsClient::new(&config.ledger) {
                Ok(client) => {
                    tracing::info!("📒 Ledger export enabled");
                    Some(Arc::new(client))
                }
                Err(e) if config.is_production() => {
                    return Err(ServerError::Config(format!("ledger export: {e}")));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Ledger credentials unusable, export disabled");
                    None
                }
            }
        } else {
            tracing::info!("Ledger export disabled (SHEETS_SPREADSHEET_ID not set)");
            None
        };

        let mut state = Self::with_ledger_sink(config.clone(), storage, sink);
        if state.admin_password_hash.is_none() && config.is_development() {
            state.admin_password_hash = Some(generate_dev_admin_password()?);
        }
        if state.admin_password_hash.is_none() {
            tracing::warn!("ADMIN_PASSWORD_HASH not set, admin login disabled");
        }
        Ok(state)
    }

    /// 使用现成的存储和账本 sink 构造状态
    ///
    /// `sink` 为 None 时账本导出关闭。有 sink 时会启动导出 worker，
    /// 需要在 tokio 运行时内调用。
    pub fn with_ledger_sink(
        config: Config,
        storage: Storage,
        sink: Option<Arc<dyn LedgerSink>>,
    ) -> Self {
        let mut tasks = BackgroundTasks::new();
        let ledger = match sink {
            Some(sink) => {
                let (tx, rx) = mpsc::unbounded_channel();
                let worker = LedgerWorker::new(
                    sink,
                    &MENU,
                    config.timezone,
                    Duration::from_millis(config.ledger.timeout_ms),
                );
                let token = tasks.shutdown_token();
                tasks.spawn("ledger_worker", worker.run(rx, token));
                LedgerHandle::new(tx)
            }
            None => LedgerHandle::disabled(),
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let admin_password_hash = config.admin_password_hash.as_deref().map(Arc::from);

        Self {
            orders: OrderService::new(storage.clone(), ledger.clone()),
            refunds: RefundService::new(storage.clone(), ledger.clone()),
            config,
            storage,
            ledger,
            jwt_service,
            admin_password_hash,
            events,
            resource_versions: Arc::new(ResourceVersions::new()),
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 广播同步消息
    ///
    /// 版本号由 ResourceVersions 自动递增管理。没有订阅者时静默丢弃。
    ///
    /// # 参数
    /// - `resource`: 资源类型 ("order", "refund")
    /// - `action`: 变更类型 ("created", "updated", "deleted")
    /// - `id`: 资源 ID
    /// - `data`: 资源数据 (deleted 时为 None)
    pub fn broadcast_sync<T: Serialize>(
        &self,
        resource: &str,
        action: &str,
        id: &str,
        data: Option<&T>,
    ) {
        let version = self.resource_versions.increment(resource);
        let event = ChangeEvent {
            resource: resource.to_string(),
            version,
            action: action.to_string(),
            id: id.to_string(),
            data: data.and_then(|d| serde_json::to_value(d).ok()),
        };
        let _ = self.events.send(event);
    }

    /// 订阅变更事件
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    /// 异常退出的后台任务
    pub fn failed_tasks(&self) -> Vec<&'static str> {
        self.tasks.lock().finished_tasks()
    }

    /// 停止后台任务（账本 worker 会先处理完已排队的导出）
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());
        tasks
            .shutdown(Duration::from_millis(self.config.shutdown_timeout_ms))
            .await;
    }
}

/// 开发环境未配置管理员密码时生成一次性密码
fn generate_dev_admin_password() -> Result<Arc<str>> {
    let password: String = crate::auth::jwt::generate_secure_printable_jwt_secret()
        .chars()
        .take(16)
        .collect();
    let hash = password::hash_password(&password)
        .map_err(|e| ServerError::Config(format!("admin password hash: {e}")))?;
    tracing::warn!("🔑 Generated development admin password: {}", password);
    Ok(Arc::from(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_increment_per_resource() {
        let versions = ResourceVersions::new();
        assert_eq!(versions.get("order"), 0);
        assert_eq!(versions.increment("order"), 1);
        assert_eq!(versions.increment("order"), 2);
        assert_eq!(versions.increment("refund"), 1);
        assert_eq!(versions.get("order"), 2);
    }

    #[tokio::test]
    async fn broadcast_reaches_subscribers() {
        let state = ServerState::with_ledger_sink(
            Config::with_overrides("/tmp/snackbar-test", 0),
            Storage::open_in_memory().unwrap(),
            None,
        );
        let mut rx = state.subscribe();
        state.broadcast_sync::<()>("order", "deleted", "7", None);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.resource, "order");
        assert_eq!(event.version, 1);
        assert!(event.data.is_none());
        state.shutdown().await;
    }
}
