//! Append-only record store over a worksheet backend.
//!
//! The backend has no append primitive, so [`RecordStore::append`] reads the
//! whole worksheet, adds one row and writes the whole worksheet back.
//!
//! # Concurrent writers
//!
//! Two appends racing against the same worksheet from separate stores (two
//! processes, or two stores built over one backend) can both read the same
//! snapshot; the second write then replaces the first and its row is lost.
//! Appends through one store and its clones are serialized by the store's
//! write gate. [`AppendQueue`](crate::storage::writer::AppendQueue) adds
//! submission-order delivery on top. Across processes the behavior is
//! last-write-wins.
//!
//! # Timed-out writes
//!
//! A write abandoned on timeout keeps running on the blocking pool. The store
//! holds its write gate until that call actually returns, so the next append
//! through the same store (or a clone of it) cannot read a snapshot the
//! abandoned write is about to replace. The timed-out append reports
//! `BackendUnavailable` even though its row may still land.

use crate::session::types::LogEntry;
use crate::storage::backend::{BackendError, SheetBackend};
use crate::storage::table::{Layout, Table};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Worksheet name used by the coaching sheet.
pub const DEFAULT_WORKSHEET: &str = "Sheet1";

/// Default bound on a single backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Record store failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network, authentication, I/O failure or timeout. Safe to retry.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The worksheet exists but does not have the expected shape.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),
}

impl StoreError {
    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::BackendUnavailable(_))
    }
}

impl From<BackendError> for StoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(msg) => StoreError::BackendUnavailable(msg),
            BackendError::Corrupt(msg) => StoreError::SchemaMismatch(msg),
        }
    }
}

/// Record store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Worksheet holding the log
    pub worksheet: String,
    /// Bound on each backend call
    pub timeout: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            worksheet: DEFAULT_WORKSHEET.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A worksheet row that could not be read as a log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// Zero-based index among data rows
    pub index: usize,
    /// Why the row was skipped
    pub reason: String,
}

/// Point-in-time view of the log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Well-formed entries in insertion order
    pub entries: Vec<LogEntry>,
    /// Malformed rows that were left out
    pub skipped: Vec<SkippedRow>,
}

/// Append-only log of [`LogEntry`] rows.
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn SheetBackend>,
    settings: StoreSettings,
    /// Held from an append's read until its backend write returns.
    write_gate: Arc<Mutex<()>>,
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("backend", &self.backend.name())
            .field("settings", &self.settings)
            .finish()
    }
}

impl RecordStore {
    /// Create a store over a backend.
    pub fn new(backend: Arc<dyn SheetBackend>, settings: StoreSettings) -> Self {
        Self {
            backend,
            settings,
            write_gate: Arc::new(Mutex::new(())),
        }
    }

    /// Store with default worksheet and timeout.
    pub fn with_defaults(backend: Arc<dyn SheetBackend>) -> Self {
        Self::new(backend, StoreSettings::default())
    }

    /// Active settings.
    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Run one backend call on the blocking pool, bounded by the timeout.
    ///
    /// A call abandoned on timeout keeps running in the background.
    async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SheetBackend) -> Result<T, BackendError> + Send + 'static,
    {
        let backend = Arc::clone(&self.backend);
        let task = tokio::task::spawn_blocking(move || f(backend.as_ref()));

        match tokio::time::timeout(self.settings.timeout, task).await {
            Ok(Ok(result)) => result.map_err(StoreError::from),
            Ok(Err(join_err)) => Err(StoreError::BackendUnavailable(format!(
                "{} task failed: {}",
                op, join_err
            ))),
            Err(_) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    op,
                    timeout_ms = self.settings.timeout.as_millis() as u64,
                    "Backend call timed out"
                );
                Err(StoreError::BackendUnavailable(format!(
                    "{} timed out after {:?}",
                    op, self.settings.timeout
                )))
            }
        }
    }

    /// Wait for the previous append's write to return, bounded by the timeout.
    async fn acquire_write_gate(&self) -> Result<OwnedMutexGuard<()>, StoreError> {
        let gate = Arc::clone(&self.write_gate).lock_owned();
        match tokio::time::timeout(self.settings.timeout, gate).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    timeout_ms = self.settings.timeout.as_millis() as u64,
                    "Previous write still in flight"
                );
                Err(StoreError::BackendUnavailable(format!(
                    "previous write still in flight after {:?}",
                    self.settings.timeout
                )))
            }
        }
    }

    /// Fetch the raw worksheet. `None` when it does not exist.
    pub async fn read_table(&self) -> Result<Option<Table>, StoreError> {
        let worksheet = self.settings.worksheet.clone();
        self.call("read", move |backend| backend.read(&worksheet))
            .await
    }

    /// Read every well-formed entry plus a list of skipped rows.
    pub async fn read_snapshot(&self) -> Result<Snapshot, StoreError> {
        let table = match self.read_table().await? {
            None => return Ok(Snapshot::default()),
            Some(table) if table.is_blank() && table.rows.is_empty() => {
                return Ok(Snapshot::default())
            }
            Some(table) => table,
        };

        let layout = Layout::from_header(&table.columns).map_err(StoreError::SchemaMismatch)?;

        let mut snapshot = Snapshot::default();
        for (index, row) in table.rows.iter().enumerate() {
            match layout.parse_row(row) {
                Ok(entry) => snapshot.entries.push(entry),
                Err(err) => {
                    tracing::warn!(
                        worksheet = %self.settings.worksheet,
                        index,
                        error = %err,
                        "Skipping malformed row"
                    );
                    snapshot.skipped.push(SkippedRow {
                        index,
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::debug!(
            worksheet = %self.settings.worksheet,
            entries = snapshot.entries.len(),
            skipped = snapshot.skipped.len(),
            "Read log"
        );
        Ok(snapshot)
    }

    /// Read every well-formed entry in insertion order.
    ///
    /// A missing or empty worksheet yields an empty list.
    pub async fn read_all(&self) -> Result<Vec<LogEntry>, StoreError> {
        Ok(self.read_snapshot().await?.entries)
    }

    /// Append one entry.
    ///
    /// Initializes the worksheet only when the backend reports it missing
    /// or blank. Any read failure aborts before writing, so existing rows
    /// are never replaced by a lone new row. Existing rows, malformed ones
    /// included, are written back verbatim ahead of the new row.
    ///
    /// Appends through one store run one at a time; an append waits for a
    /// previously timed-out write to return before reading.
    pub async fn append(&self, entry: &LogEntry) -> Result<(), StoreError> {
        if !entry.has_measurement() {
            return Err(StoreError::SchemaMismatch(
                "entry carries no measurement".to_string(),
            ));
        }

        let gate = self.acquire_write_gate().await?;

        let mut table = match self.read_table().await {
            Ok(None) => {
                tracing::info!(worksheet = %self.settings.worksheet, "Initializing worksheet");
                Table::with_canonical_header()
            }
            Ok(Some(table)) if table.is_blank() && table.rows.is_empty() => {
                tracing::info!(worksheet = %self.settings.worksheet, "Initializing blank worksheet");
                Table::with_canonical_header()
            }
            Ok(Some(table)) => table,
            Err(err) => {
                tracing::warn!(
                    worksheet = %self.settings.worksheet,
                    error = %err,
                    "Append aborted, worksheet could not be read"
                );
                return Err(err);
            }
        };

        let layout = Layout::from_header(&table.columns).map_err(StoreError::SchemaMismatch)?;
        let row = layout.encode(entry).map_err(StoreError::SchemaMismatch)?;
        table.rows.push(row);
        let total_rows = table.rows.len();

        let worksheet = self.settings.worksheet.clone();
        self.call("write", move |backend| {
            let result = backend.write(&worksheet, &table);
            // Released only once the backend returns, even if the caller gave up.
            drop(gate);
            result
        })
        .await?;

        tracing::info!(
            worksheet = %self.settings.worksheet,
            player = %entry.player_id,
            phase = %entry.phase,
            total_rows,
            "Appended log entry"
        );
        Ok(())
    }
}
