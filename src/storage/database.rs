//! SQLite worksheet backend using rusqlite.
//!
//! Each worksheet is a header row plus positioned rows. `write` swaps the
//! whole sheet inside one transaction, so readers see either the old or
//! the new table.

use crate::storage::backend::{BackendError, SheetBackend};
use crate::storage::schema::{CURRENT_VERSION, SCHEMA, SCHEMA_VERSION_TABLE};
use crate::storage::table::Table;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Database wrapper for SQLite operations.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }

        let conn =
            Connection::open(path).map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Self::from_connection(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.initialize()?;

        Ok(db)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Initialize the database schema.
    fn initialize(&self) -> Result<(), DatabaseError> {
        self.lock()
            .execute_batch(SCHEMA_VERSION_TABLE)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let current_version = self.schema_version()?;

        if current_version < CURRENT_VERSION {
            self.migrate(current_version)?;
        }

        Ok(())
    }

    /// Get the current schema version.
    pub fn schema_version(&self) -> Result<i32, DatabaseError> {
        let result: SqliteResult<i32> = self.lock().query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        );

        match result {
            Ok(version) => Ok(version),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }

    /// Run database migrations.
    fn migrate(&self, from_version: i32) -> Result<(), DatabaseError> {
        let conn = self.lock();

        if from_version < 1 {
            conn.execute_batch(SCHEMA)
                .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            conn.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?, datetime('now'))",
                [CURRENT_VERSION],
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

            tracing::info!("Database migrated to version {}", CURRENT_VERSION);
        }

        Ok(())
    }

    /// Load a worksheet, or `None` if it was never written.
    pub fn load_worksheet(&self, name: &str) -> Result<Option<Table>, DatabaseError> {
        let conn = self.lock();

        let columns_json: Option<String> = conn
            .query_row(
                "SELECT columns_json FROM worksheets WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let Some(columns_json) = columns_json else {
            return Ok(None);
        };

        let columns: Vec<String> = serde_json::from_str(&columns_json)
            .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT cells_json FROM worksheet_rows WHERE worksheet = ?1 ORDER BY position",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let cells = stmt
            .query_map(params![name], |row| row.get::<_, String>(0))
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut rows = Vec::new();
        for cells_json in cells {
            let cells_json = cells_json.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            let row: Vec<String> = serde_json::from_str(&cells_json)
                .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;
            rows.push(row);
        }

        Ok(Some(Table { columns, rows }))
    }

    /// Replace a worksheet in a single transaction.
    pub fn store_worksheet(&self, name: &str, table: &Table) -> Result<(), DatabaseError> {
        let columns_json = serde_json::to_string(&table.columns)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        let mut conn = self.lock();
        let tx = conn
            .transaction()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tx.execute(
            "INSERT INTO worksheets (name, columns_json, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(name) DO UPDATE SET columns_json = excluded.columns_json,
             updated_at = excluded.updated_at",
            params![name, columns_json, Utc::now().to_rfc3339()],
        )
        .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        tx.execute("DELETE FROM worksheet_rows WHERE worksheet = ?1", params![name])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO worksheet_rows (worksheet, position, cells_json)
                     VALUES (?1, ?2, ?3)",
                )
                .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

            for (position, row) in table.rows.iter().enumerate() {
                let cells_json = serde_json::to_string(row)
                    .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
                stmt.execute(params![name, position as i64, cells_json])
                    .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        tracing::debug!(worksheet = name, rows = table.rows.len(), "Worksheet stored");
        Ok(())
    }
}

impl SheetBackend for Database {
    fn read(&self, worksheet: &str) -> Result<Option<Table>, BackendError> {
        self.load_worksheet(worksheet).map_err(BackendError::from)
    }

    fn write(&self, worksheet: &str, table: &Table) -> Result<(), BackendError> {
        self.store_worksheet(worksheet, table)
            .map_err(BackendError::from)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl From<DatabaseError> for BackendError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::DeserializationError(msg) => BackendError::Corrupt(msg),
            other => BackendError::Unavailable(other.to_string()),
        }
    }
}
