//! 健康检查路由
//!
//! | 路径 | 方法 | 说明 | 认证 |
//! |------|------|------|------|
//! | /health | GET | 存活 + 存储检查 | 无 |

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::time::{Instant, SystemTime};

use crate::core::ServerState;
use crate::db::StorageStats;

pub fn router() -> Router<ServerState> {
    Router::new().route("/health", get(health))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// healthy | degraded
    status: &'static str,
    version: &'static str,
    uptime_seconds: u64,
    checks: HealthChecks,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<StorageStats>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthChecks {
    storage: CheckResult,
    ledger: CheckResult,
    background_tasks: CheckResult,
}

/// 单项检查结果
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// ok | disabled | error
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl CheckResult {
    fn ok() -> Self {
        Self {
            status: "ok",
            latency_ms: None,
            message: None,
        }
    }

    fn ok_with_latency(latency_ms: u64) -> Self {
        Self {
            status: "ok",
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    fn disabled() -> Self {
        Self {
            status: "disabled",
            latency_ms: None,
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    fn is_error(&self) -> bool {
        self.status == "error"
    }
}

// 服务器启动时间 (懒加载静态变量)
static START_TIME: std::sync::OnceLock<SystemTime> = std::sync::OnceLock::new();

fn get_uptime_seconds() -> u64 {
    let start = START_TIME.get_or_init(SystemTime::now);
    SystemTime::now()
        .duration_since(*start)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    let storage = state.storage.clone();
    let probe = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        storage.ping()?;
        let latency = start.elapsed().as_millis() as u64;
        storage.get_stats().map(|stats| (latency, stats))
    })
    .await;

    let (storage_check, stats) = match probe {
        Ok(Ok((latency, stats))) => (CheckResult::ok_with_latency(latency), Some(stats)),
        Ok(Err(e)) => (CheckResult::error(format!("Storage error: {e}")), None),
        Err(e) => (CheckResult::error(format!("Probe failed: {e}")), None),
    };

    let ledger_check = if state.ledger.is_enabled() {
        CheckResult::ok()
    } else {
        CheckResult::disabled()
    };

    let failed = state.failed_tasks();
    let tasks_check = if failed.is_empty() {
        CheckResult::ok()
    } else {
        CheckResult::error(format!("stopped: {}", failed.join(", ")))
    };

    let degraded = storage_check.is_error() || tasks_check.is_error();

    Json(HealthResponse {
        status: if degraded { "degraded" } else { "healthy" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: get_uptime_seconds(),
        checks: HealthChecks {
            storage: storage_check,
            ledger: ledger_check,
            background_tasks: tasks_check,
        },
        stats,
    })
}
