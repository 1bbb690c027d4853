//! Tabular backend abstraction.
//!
//! A backend stores whole worksheets. It has no append primitive; the
//! record store layers read-concatenate-write on top.

use crate::storage::table::Table;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// Backend-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connectivity, authentication or I/O failure. Retryable.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// The stored worksheet could not be decoded.
    #[error("Corrupt worksheet: {0}")]
    Corrupt(String),
}

/// A store of named worksheets.
///
/// Implementations are blocking; the record store runs them on the
/// blocking pool under a timeout.
pub trait SheetBackend: Send + Sync + 'static {
    /// Read a whole worksheet. `Ok(None)` means the worksheet does not exist.
    fn read(&self, worksheet: &str) -> Result<Option<Table>, BackendError>;

    /// Replace a whole worksheet. Either every row lands or none does.
    fn write(&self, worksheet: &str, table: &Table) -> Result<(), BackendError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// In-process backend with fault injection.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sheets: Mutex<HashMap<String, Table>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding one worksheet.
    pub fn with_sheet(worksheet: &str, table: Table) -> Self {
        let backend = Self::new();
        backend.insert(worksheet, table);
        backend
    }

    /// Put a worksheet in place directly.
    pub fn insert(&self, worksheet: &str, table: Table) {
        self.lock().insert(worksheet.to_string(), table);
    }

    /// Snapshot a worksheet without going through the fault switches.
    pub fn snapshot(&self, worksheet: &str) -> Option<Table> {
        self.lock().get(worksheet).cloned()
    }

    /// Make subsequent reads fail as if the network were down.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail as if the network were down.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Table>> {
        self.sheets
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SheetBackend for MemoryBackend {
    fn read(&self, worksheet: &str) -> Result<Option<Table>, BackendError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        Ok(self.lock().get(worksheet).cloned())
    }

    fn write(&self, worksheet: &str, table: &Table) -> Result<(), BackendError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        self.lock().insert(worksheet.to_string(), table.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
