//! Database schema definitions for the SQLite worksheet backend.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Worksheets table (one row per named sheet)
CREATE TABLE IF NOT EXISTS worksheets (
    name TEXT PRIMARY KEY,
    columns_json TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Worksheet rows table (cells stored as a JSON array of strings)
CREATE TABLE IF NOT EXISTS worksheet_rows (
    worksheet TEXT NOT NULL REFERENCES worksheets(name) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    cells_json TEXT NOT NULL,
    PRIMARY KEY (worksheet, position)
);

CREATE INDEX IF NOT EXISTS idx_worksheet_rows_worksheet ON worksheet_rows(worksheet);
"#;

/// Schema version tracking table
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
