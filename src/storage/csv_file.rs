//! Worksheet files on disk, one CSV per worksheet.

use crate::storage::backend::{BackendError, SheetBackend};
use crate::storage::table::Table;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Stores each worksheet as `<dir>/<worksheet>.csv`.
#[derive(Debug, Clone)]
pub struct CsvBackend {
    dir: PathBuf,
}

impl CsvBackend {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of a worksheet file.
    pub fn worksheet_path(&self, worksheet: &str) -> PathBuf {
        let file: String = worksheet
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.csv", file))
    }
}

impl SheetBackend for CsvBackend {
    fn read(&self, worksheet: &str) -> Result<Option<Table>, BackendError> {
        let path = self.worksheet_path(worksheet);
        let content = match std::fs::read(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Unavailable(e.to_string())),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(content.as_slice());

        let mut records = reader.records();
        let columns: Vec<String> = match records.next() {
            Some(header) => header
                .map_err(|e| BackendError::Corrupt(e.to_string()))?
                .iter()
                .map(str::to_string)
                .collect(),
            None => return Ok(Some(Table::default())),
        };

        let mut rows: Vec<Vec<String>> = Vec::new();
        for record in records {
            let record = record.map_err(|e| BackendError::Corrupt(e.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Some(Table { columns, rows }))
    }

    fn write(&self, worksheet: &str, table: &Table) -> Result<(), BackendError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| BackendError::Unavailable(e.to_string()))?;

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        writer
            .write_record(&table.columns)
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        for row in &table.rows {
            writer
                .write_record(row)
                .map_err(|e| BackendError::Unavailable(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        // Write beside the target then rename, so a crash never leaves half a sheet.
        let path = self.worksheet_path(worksheet);
        let tmp = path.with_extension("csv.tmp");
        std::fs::write(&tmp, bytes).map_err(|e| BackendError::Unavailable(e.to_string()))?;
        std::fs::rename(&tmp, &path).map_err(|e| BackendError::Unavailable(e.to_string()))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}
