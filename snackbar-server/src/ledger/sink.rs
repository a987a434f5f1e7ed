//! Ledger sink abstraction
//!
//! The worker only talks to [`LedgerSink`]; production uses the Google
//! Sheets client, tests use [`MemorySink`].

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::LedgerError;
use super::rows::Sheet;

#[async_trait]
pub trait LedgerSink: Send + Sync {
    /// Write the header row if the sheet does not have one yet
    async fn ensure_header(&self, sheet: Sheet) -> Result<(), LedgerError>;

    /// Append rows below the existing data
    async fn append_rows(&self, sheet: Sheet, rows: Vec<Vec<Value>>) -> Result<(), LedgerError>;
}

#[derive(Default)]
struct MemorySheets {
    headers: HashMap<Sheet, Vec<Value>>,
    rows: HashMap<Sheet, Vec<Vec<Value>>>,
}

/// Recording sink kept in memory
#[derive(Clone, Default)]
pub struct MemorySink {
    sheets: Arc<Mutex<MemorySheets>>,
    failing: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following call fail (simulates the remote being down)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn header(&self, sheet: Sheet) -> Option<Vec<Value>> {
        self.sheets.lock().headers.get(&sheet).cloned()
    }

    pub fn rows(&self, sheet: Sheet) -> Vec<Vec<Value>> {
        self.sheets
            .lock()
            .rows
            .get(&sheet)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LedgerError::Status {
                status: 503,
                body: "memory sink set to fail".to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink")
            .field("failing", &self.failing.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LedgerSink for MemorySink {
    async fn ensure_header(&self, sheet: Sheet) -> Result<(), LedgerError> {
        self.check()?;
        self.sheets
            .lock()
            .headers
            .entry(sheet)
            .or_insert_with(|| sheet.header_row());
        Ok(())
    }

    async fn append_rows(&self, sheet: Sheet, rows: Vec<Vec<Value>>) -> Result<(), LedgerError> {
        self.check()?;
        self.sheets.lock().rows.entry(sheet).or_default().extend(rows);
        Ok(())
    }
}
