//! 账本导出 - 已确认订单与退款镜像到外部表格
//!
//! # 流程
//!
//! ```text
//! OrderService::confirm ──┐
//!                         ├─► LedgerHandle ─mpsc─► LedgerWorker ─► LedgerSink
//! RefundService::create ──┘                                        (Sheets / Memory)
//! ```
//!
//! 入队总是在存储提交之后；导出失败不回滚，只记 `warn` 日志。

pub mod rows;
pub mod sheets;
pub mod sink;
pub mod worker;

pub use rows::Sheet;
pub use sheets::SheetsClient;
pub use sink::{LedgerSink, MemorySink};
pub use worker::LedgerWorker;

use shared::models::{Order, Refund};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger export is not configured")]
    NotConfigured,

    #[error("Invalid service account key: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Ledger export timed out after {0}ms")]
    Timeout(u64),
}

/// Export job, queued after the storage commit
#[derive(Debug, Clone)]
pub enum LedgerJob {
    OrderConfirmed(Order),
    Refunds(Vec<Refund>),
}

impl LedgerJob {
    pub fn order_number(&self) -> u64 {
        match self {
            LedgerJob::OrderConfirmed(order) => order.order_number,
            LedgerJob::Refunds(refunds) => refunds.first().map(|r| r.order_number).unwrap_or(0),
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            LedgerJob::OrderConfirmed(_) => "confirm",
            LedgerJob::Refunds(_) => "refund",
        }
    }
}

/// Sending half of the export queue; a disabled handle drops every job
#[derive(Debug, Clone, Default)]
pub struct LedgerHandle {
    tx: Option<mpsc::UnboundedSender<LedgerJob>>,
}

impl LedgerHandle {
    pub fn new(tx: mpsc::UnboundedSender<LedgerJob>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn export_order(&self, order: &Order) {
        self.send(LedgerJob::OrderConfirmed(order.clone()));
    }

    pub fn export_refunds(&self, refunds: &[Refund]) {
        if refunds.is_empty() {
            return;
        }
        self.send(LedgerJob::Refunds(refunds.to_vec()));
    }

    fn send(&self, job: LedgerJob) {
        let Some(tx) = &self.tx else {
            return;
        };
        let order_number = job.order_number();
        let operation = job.operation();
        if tx.send(job).is_err() {
            tracing::warn!(
                order_number,
                operation,
                "Ledger worker is gone, export dropped"
            );
        }
    }
}
