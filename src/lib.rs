//! TrainLog - Athletic Training Log
//!
//! Append-only training log for a sports team. Records per-session condition
//! scores (RPE, pain, notes) and force-plate jump tests into a shared
//! worksheet, then derives per-player trend series and summaries for charts.

pub mod metrics;
pub mod service;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use metrics::trends::TrendAggregator;
pub use service::{SubmitError, TrainingLog};
pub use session::builder::{RawFields, SessionEntryBuilder, ValidationError};
pub use session::types::{LogEntry, Metric, Phase};
pub use storage::config::AppConfig;
pub use storage::record_store::{RecordStore, StoreError};
