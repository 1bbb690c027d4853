//! Front door for presentation adapters.
//!
//! Wires the entry builder, the record store (directly or through the
//! single-writer queue) and the trend aggregator into the submit / read-back
//! flow a dashboard needs.

use crate::metrics::trends::{ConditionPoint, PlayerSummary, SeriesPoint, TrendAggregator};
use crate::session::builder::{RawFields, SessionEntryBuilder, ValidationError};
use crate::session::types::{LogEntry, Metric};
use crate::storage::config::AppConfig;
use crate::storage::record_store::{RecordStore, Snapshot, StoreError};
use crate::storage::writer::AppendQueue;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a submission was not recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The input was rejected; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store refused or could not be reached.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
enum WritePath {
    Direct(RecordStore),
    Queued(AppendQueue),
}

/// Training log service.
#[derive(Debug)]
pub struct TrainingLog {
    builder: SessionEntryBuilder,
    writes: WritePath,
    aggregator: TrendAggregator,
}

impl TrainingLog {
    /// Service appending straight to the store.
    pub fn new(builder: SessionEntryBuilder, store: RecordStore) -> Self {
        Self {
            builder,
            writes: WritePath::Direct(store),
            aggregator: TrendAggregator::new(),
        }
    }

    /// Service funnelling appends through a single writer task.
    ///
    /// Must be called inside a tokio runtime.
    pub fn with_queue(builder: SessionEntryBuilder, store: RecordStore) -> Self {
        Self {
            builder,
            writes: WritePath::Queued(AppendQueue::spawn(store)),
            aggregator: TrendAggregator::new(),
        }
    }

    /// Service configured from [`AppConfig`] over an already-built store.
    pub fn from_config(config: &AppConfig, store: RecordStore) -> Self {
        let builder = config.entry_builder();
        if config.store.serialize_writes {
            Self::with_queue(builder, store)
        } else {
            Self::new(builder, store)
        }
    }

    fn store(&self) -> &RecordStore {
        match &self.writes {
            WritePath::Direct(store) => store,
            WritePath::Queued(queue) => queue.store(),
        }
    }

    /// Validate and record one entry. Returns the entry as stored.
    pub async fn submit(&self, raw: RawFields) -> Result<LogEntry, SubmitError> {
        let entry = match self.builder.build(raw) {
            Ok(entry) => entry,
            Err(err) => {
                tracing::info!(field = err.field(), "Submission rejected: {}", err);
                return Err(err.into());
            }
        };

        match &self.writes {
            WritePath::Direct(store) => store.append(&entry).await?,
            WritePath::Queued(queue) => queue.append(entry.clone()).await?,
        }

        Ok(entry)
    }

    /// All well-formed entries in insertion order.
    pub async fn entries(&self) -> Result<Vec<LogEntry>, StoreError> {
        self.store().read_all().await
    }

    /// Entries plus the rows that had to be skipped.
    pub async fn snapshot(&self) -> Result<Snapshot, StoreError> {
        self.store().read_snapshot().await
    }

    /// Per-player summary of the current log.
    pub async fn summary(&self) -> Result<BTreeMap<String, PlayerSummary>, StoreError> {
        let rows = self.entries().await?;
        Ok(self.aggregator.summary(&rows))
    }

    /// One player's series for a metric.
    pub async fn series(&self, player_id: &str, metric: Metric) -> Result<Vec<SeriesPoint>, StoreError> {
        let rows = self.entries().await?;
        Ok(self.aggregator.series_for(player_id, metric, &rows))
    }

    /// Every player's series for a metric.
    pub async fn compare(
        &self,
        metric: Metric,
    ) -> Result<BTreeMap<String, Vec<SeriesPoint>>, StoreError> {
        let rows = self.entries().await?;
        Ok(self.aggregator.compare(metric, &rows))
    }

    /// A player's daily condition report: mean RPE and pain per day.
    pub async fn condition_report(&self, player_id: &str) -> Result<Vec<ConditionPoint>, StoreError> {
        let rows = self.entries().await?;
        Ok(self.aggregator.condition_report(player_id, &rows))
    }

    /// A player's most recent entry.
    pub async fn latest(&self, player_id: &str) -> Result<Option<LogEntry>, StoreError> {
        let rows = self.entries().await?;
        Ok(self.aggregator.latest(player_id, &rows).cloned())
    }

    /// Stop the writer task, if any, after draining queued appends.
    pub async fn close(&self) {
        if let WritePath::Queued(queue) = &self.writes {
            queue.shutdown().await;
        }
    }
}
