//! 账本导出后台 Worker
//!
//! 从 mpsc 通道消费 [`LedgerJob`]，写入表格。失败只记日志，不重试；
//! 本地存储才是数据源。

use chrono_tz::Tz;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::rows::{Sheet, order_rows, refund_rows};
use super::sink::LedgerSink;
use super::{LedgerError, LedgerJob};
use shared::models::Menu;

pub struct LedgerWorker {
    sink: Arc<dyn LedgerSink>,
    menu: &'static Menu,
    timezone: Tz,
    timeout: Duration,
}

impl LedgerWorker {
    pub fn new(
        sink: Arc<dyn LedgerSink>,
        menu: &'static Menu,
        timezone: Tz,
        timeout: Duration,
    ) -> Self {
        Self {
            sink,
            menu,
            timezone,
            timeout,
        }
    }

    /// 运行 worker（直到通道关闭或收到取消信号）
    ///
    /// 取消时先处理完通道里已排队的任务再退出。
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<LedgerJob>, shutdown: CancellationToken) {
        tracing::info!("📒 Ledger export worker started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    rx.close();
                    while let Ok(job) = rx.try_recv() {
                        self.process(job).await;
                    }
                    tracing::info!("Ledger export worker shutting down");
                    break;
                }
                job = rx.recv() => match job {
                    Some(job) => self.process(job).await,
                    None => {
                        tracing::info!("Ledger channel closed, worker stopping");
                        break;
                    }
                }
            }
        }
    }

    /// Export one job; failures are logged and dropped
    pub async fn process(&self, job: LedgerJob) {
        let order_number = job.order_number();
        let operation = job.operation();

        let result = match tokio::time::timeout(self.timeout, self.export(job)).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(self.timeout.as_millis() as u64)),
        };

        match result {
            Ok(rows) => tracing::debug!(order_number, operation, rows, "Ledger export done"),
            Err(e) => tracing::warn!(
                order_number,
                operation,
                error = %e,
                "Ledger export failed, record kept locally only"
            ),
        }
    }

    async fn export(&self, job: LedgerJob) -> Result<usize, LedgerError> {
        let (sheet, rows) = match job {
            LedgerJob::OrderConfirmed(order) => (
                Sheet::Orders,
                order_rows(&order, self.menu, self.timezone),
            ),
            LedgerJob::Refunds(refunds) => (Sheet::Refunds, refund_rows(&refunds, self.timezone)),
        };
        if rows.is_empty() {
            return Ok(0);
        }
        let count = rows.len();
        self.sink.ensure_header(sheet).await?;
        self.sink.append_rows(sheet, rows).await?;
        Ok(count)
    }
}
