//! Untyped worksheet tables and their coercion into [`LogEntry`].
//!
//! Backends hand back a header row plus string cells. A [`Layout`] maps the
//! header onto known columns once; rows are then parsed through it. Empty
//! cells mean "absent".

use crate::session::builder::{
    JUMP_HEIGHT_RANGE_CM, PAIN_RANGE, PEAK_FORCE_RANGE_N, RPE_RANGE, TTPF_RANGE_MS,
};
use crate::session::types::{LogEntry, Phase};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use thiserror::Error;

/// Timestamp format written by the early spreadsheet drafts.
const LEGACY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A worksheet as stored by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Header row
    pub columns: Vec<String>,
    /// Data rows, in insertion order
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create an empty table with the unified header.
    pub fn with_canonical_header() -> Self {
        Self::new(Column::CANONICAL.iter().map(|c| c.name().to_string()).collect())
    }

    /// True when the table has no header at all (a blank sheet).
    pub fn is_blank(&self) -> bool {
        self.columns.iter().all(|c| c.trim().is_empty())
    }
}

/// Known worksheet columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Timestamp,
    PlayerId,
    Phase,
    Rpe,
    Pain,
    Note,
    JumpHeight,
    PeakForce,
    Ttpf,
}

impl Column {
    /// Unified column order for new worksheets.
    pub const CANONICAL: [Column; 9] = [
        Column::Timestamp,
        Column::PlayerId,
        Column::Phase,
        Column::Rpe,
        Column::Pain,
        Column::Note,
        Column::JumpHeight,
        Column::PeakForce,
        Column::Ttpf,
    ];

    /// Canonical header name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Timestamp => "timestamp",
            Column::PlayerId => "player_id",
            Column::Phase => "phase",
            Column::Rpe => "rpe",
            Column::Pain => "pain",
            Column::Note => "note",
            Column::JumpHeight => "jump_height_cm",
            Column::PeakForce => "peak_force_n",
            Column::Ttpf => "ttpf_ms",
        }
    }

    /// Resolve a header cell, accepting the localized labels of the
    /// original coaching sheet.
    pub fn from_header(header: &str) -> Option<Column> {
        let key = header.trim().to_lowercase();
        let column = match key.as_str() {
            "timestamp" | "date" | "날짜" => Column::Timestamp,
            "player_id" | "player" | "선수명" => Column::PlayerId,
            "phase" | "단계" => Column::Phase,
            "rpe" => Column::Rpe,
            "pain" | "통증" => Column::Pain,
            "note" | "notes" | "메모" => Column::Note,
            "jump_height_cm" => Column::JumpHeight,
            "peak_force_n" => Column::PeakForce,
            "ttpf_ms" => Column::Ttpf,
            _ => return None,
        };
        Some(column)
    }
}

/// Why a single row could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {field}: '{value}'")]
    Invalid { field: &'static str, value: String },

    #[error("row carries no measurement")]
    NoMeasurement,
}

/// Header-to-column mapping for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// One slot per header cell; blank headers map to `None`.
    slots: Vec<Option<Column>>,
}

impl Layout {
    /// Resolve a header row. Fails with a description when the header
    /// does not fit the log shape.
    pub fn from_header(columns: &[String]) -> Result<Self, String> {
        let mut slots = Vec::with_capacity(columns.len());
        for header in columns {
            if header.trim().is_empty() {
                slots.push(None);
                continue;
            }
            let column = Column::from_header(header)
                .ok_or_else(|| format!("unexpected column '{}'", header))?;
            if slots.contains(&Some(column)) {
                return Err(format!("duplicate column '{}'", column.name()));
            }
            slots.push(Some(column));
        }

        for required in [Column::Timestamp, Column::PlayerId] {
            if !slots.contains(&Some(required)) {
                return Err(format!("missing column '{}'", required.name()));
            }
        }

        Ok(Self { slots })
    }

    /// Whether the layout has a slot for the column.
    pub fn has(&self, column: Column) -> bool {
        self.slots.contains(&Some(column))
    }

    fn cell<'a>(&self, row: &'a [String], column: Column) -> Option<&'a str> {
        let index = self.slots.iter().position(|slot| *slot == Some(column))?;
        row.get(index)
            .map(|cell| cell.trim())
            .filter(|cell| !cell.is_empty())
    }

    /// Coerce one untyped row.
    pub fn parse_row(&self, row: &[String]) -> Result<LogEntry, RowError> {
        let timestamp = self
            .cell(row, Column::Timestamp)
            .ok_or(RowError::Missing("timestamp"))?;
        let timestamp = parse_timestamp(timestamp).ok_or_else(|| RowError::Invalid {
            field: "timestamp",
            value: timestamp.to_string(),
        })?;

        let player_id = self
            .cell(row, Column::PlayerId)
            .ok_or(RowError::Missing("player_id"))?
            .to_string();

        let rpe = parse_score(self.cell(row, Column::Rpe), RPE_RANGE, "rpe")?;
        let pain = parse_score(self.cell(row, Column::Pain), PAIN_RANGE, "pain")?;
        let jump_height_cm = parse_measurement(
            self.cell(row, Column::JumpHeight),
            JUMP_HEIGHT_RANGE_CM,
            "jump_height_cm",
        )?;
        let peak_force_n = parse_measurement(
            self.cell(row, Column::PeakForce),
            PEAK_FORCE_RANGE_N,
            "peak_force_n",
        )?;
        let ttpf_ms = parse_measurement(self.cell(row, Column::Ttpf), TTPF_RANGE_MS, "ttpf_ms")?;

        let has_power_test =
            jump_height_cm.is_some() || peak_force_n.is_some() || ttpf_ms.is_some();

        let phase = match self.cell(row, Column::Phase) {
            Some(value) => value.parse::<Phase>().map_err(|_| RowError::Invalid {
                field: "phase",
                value: value.to_string(),
            })?,
            // Power-test sheets have no phase column.
            None if has_power_test => Phase::Power,
            None => return Err(RowError::Missing("phase")),
        };

        let entry = LogEntry {
            timestamp,
            player_id,
            phase,
            rpe,
            pain,
            note: self.cell(row, Column::Note).map(str::to_string),
            jump_height_cm,
            peak_force_n,
            ttpf_ms,
        };

        if !entry.has_measurement() {
            return Err(RowError::NoMeasurement);
        }

        Ok(entry)
    }

    /// Encode an entry in this layout's column order.
    ///
    /// Fails when the entry has a value the header has no column for.
    pub fn encode(&self, entry: &LogEntry) -> Result<Vec<String>, String> {
        for column in Column::CANONICAL {
            if !self.has(column) && !encode_cell(entry, column).is_empty() {
                return Err(format!(
                    "worksheet has no '{}' column for this entry",
                    column.name()
                ));
            }
        }

        Ok(self
            .slots
            .iter()
            .map(|slot| slot.map(|column| encode_cell(entry, column)).unwrap_or_default())
            .collect())
    }
}

fn encode_cell(entry: &LogEntry, column: Column) -> String {
    match column {
        Column::Timestamp => format_timestamp(&entry.timestamp),
        Column::PlayerId => entry.player_id.clone(),
        Column::Phase => entry.phase.to_string(),
        Column::Rpe => entry.rpe.map_or(String::new(), |v| v.to_string()),
        Column::Pain => entry.pain.map_or(String::new(), |v| v.to_string()),
        Column::Note => entry.note.clone().unwrap_or_default(),
        Column::JumpHeight => entry.jump_height_cm.map_or(String::new(), |v| v.to_string()),
        Column::PeakForce => entry.peak_force_n.map_or(String::new(), |v| v.to_string()),
        Column::Ttpf => entry.ttpf_ms.map_or(String::new(), |v| v.to_string()),
    }
}

/// Canonical persisted timestamp: RFC 3339, whole seconds, `Z`.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse RFC 3339 or the legacy `YYYY-MM-DD HH:MM:SS` (read as UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, LEGACY_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_score(
    cell: Option<&str>,
    range: RangeInclusive<i64>,
    field: &'static str,
) -> Result<Option<u8>, RowError> {
    let Some(value) = cell else {
        return Ok(None);
    };
    let invalid = || RowError::Invalid {
        field,
        value: value.to_string(),
    };

    // Spreadsheets hand integers back as "7.0".
    let score = match value.parse::<i64>() {
        Ok(v) => v,
        Err(_) => {
            let v: f64 = value.parse().map_err(|_| invalid())?;
            if v.fract() != 0.0 || !v.is_finite() {
                return Err(invalid());
            }
            v as i64
        }
    };

    if !range.contains(&score) {
        return Err(invalid());
    }
    u8::try_from(score).map(Some).map_err(|_| invalid())
}

fn parse_measurement(
    cell: Option<&str>,
    range: RangeInclusive<f64>,
    field: &'static str,
) -> Result<Option<f64>, RowError> {
    let Some(value) = cell else {
        return Ok(None);
    };
    match value.parse::<f64>() {
        Ok(v) if range.contains(&v) => Ok(Some(v)),
        _ => Err(RowError::Invalid {
            field,
            value: value.to_string(),
        }),
    }
}
