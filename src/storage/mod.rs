//! Storage module: worksheet backends, the record store and configuration.

pub mod backend;
pub mod config;
pub mod csv_file;
pub mod database;
pub mod http;
pub mod record_store;
pub mod schema;
pub mod table;
pub mod writer;

pub use backend::{BackendError, MemoryBackend, SheetBackend};
pub use config::{AppConfig, BackendKind, ConfigError, Roster, StoreConfig};
pub use csv_file::CsvBackend;
pub use database::{Database, DatabaseError};
pub use http::HttpSheetBackend;
pub use record_store::{RecordStore, Snapshot, StoreError, StoreSettings};
pub use table::{Column, Layout, Table};
pub use writer::AppendQueue;
