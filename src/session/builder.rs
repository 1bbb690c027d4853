//! Session entry validation and construction.
//!
//! Turns the raw fields collected by a form (or the command line) into a
//! validated [`LogEntry`]. The timestamp always comes from the process clock.

use crate::session::types::{LogEntry, Phase};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::sync::Arc;
use thiserror::Error;

/// Valid RPE scores.
pub const RPE_RANGE: RangeInclusive<i64> = 1..=10;

/// Valid pain scores.
pub const PAIN_RANGE: RangeInclusive<i64> = 0..=10;

/// Plausible countermovement jump height in centimeters.
pub const JUMP_HEIGHT_RANGE_CM: RangeInclusive<f64> = 0.0..=100.0;

/// Plausible peak ground reaction force in newtons.
pub const PEAK_FORCE_RANGE_N: RangeInclusive<f64> = 0.0..=10_000.0;

/// Plausible time to peak force in milliseconds.
pub const TTPF_RANGE_MS: RangeInclusive<f64> = 0.0..=5_000.0;

/// Default cap on note length in characters.
pub const DEFAULT_MAX_NOTE_CHARS: usize = 2000;

/// Entry validation failures. Nothing is written when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("Missing required field: {0}")]
    MissingRequired(&'static str),

    /// A field was present but outside its declared range.
    #[error("Value out of range: {0}")]
    OutOfRange(&'static str),
}

impl ValidationError {
    /// Name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingRequired(field) | ValidationError::OutOfRange(field) => field,
        }
    }
}

/// Unvalidated user input for one session entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFields {
    pub player_id: String,
    pub phase: String,
    pub rpe: Option<i64>,
    pub pain: Option<i64>,
    pub note: Option<String>,
    pub jump_height_cm: Option<f64>,
    pub peak_force_n: Option<f64>,
    pub ttpf_ms: Option<f64>,
}

impl RawFields {
    /// Condition-log input: subjective scores plus an optional note.
    pub fn condition(
        player_id: impl Into<String>,
        phase: Phase,
        rpe: i64,
        pain: i64,
        note: Option<String>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            phase: phase.to_string(),
            rpe: Some(rpe),
            pain: Some(pain),
            note,
            ..Default::default()
        }
    }

    /// Power-test input: force-plate jump metrics.
    pub fn power_test(
        player_id: impl Into<String>,
        jump_height_cm: Option<f64>,
        peak_force_n: Option<f64>,
        ttpf_ms: Option<f64>,
    ) -> Self {
        Self {
            player_id: player_id.into(),
            phase: Phase::Power.to_string(),
            jump_height_cm,
            peak_force_n,
            ttpf_ms,
            ..Default::default()
        }
    }
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Validates raw fields and stamps them into a [`LogEntry`].
#[derive(Clone)]
pub struct SessionEntryBuilder {
    clock: Clock,
    max_note_chars: usize,
}

impl Default for SessionEntryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionEntryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEntryBuilder")
            .field("max_note_chars", &self.max_note_chars)
            .finish_non_exhaustive()
    }
}

impl SessionEntryBuilder {
    /// Builder using the system clock and the default note cap.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(Utc::now),
            max_note_chars: DEFAULT_MAX_NOTE_CHARS,
        }
    }

    /// Replace the clock (tests, replays).
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    /// Set the maximum note length in characters.
    pub fn with_max_note_chars(mut self, max: usize) -> Self {
        self.max_note_chars = max;
        self
    }

    /// Validate and build one entry.
    pub fn build(&self, raw: RawFields) -> Result<LogEntry, ValidationError> {
        let player_id = raw.player_id.trim();
        if player_id.is_empty() {
            return Err(ValidationError::MissingRequired("player_id"));
        }

        if raw.phase.trim().is_empty() {
            return Err(ValidationError::MissingRequired("phase"));
        }
        let phase: Phase = raw
            .phase
            .parse()
            .map_err(|_| ValidationError::OutOfRange("phase"))?;

        let rpe = check_score(raw.rpe, RPE_RANGE, "rpe")?;
        let pain = check_score(raw.pain, PAIN_RANGE, "pain")?;

        let jump_height_cm =
            check_measurement(raw.jump_height_cm, JUMP_HEIGHT_RANGE_CM, "jump_height_cm")?;
        let peak_force_n = check_measurement(raw.peak_force_n, PEAK_FORCE_RANGE_N, "peak_force_n")?;
        let ttpf_ms = check_measurement(raw.ttpf_ms, TTPF_RANGE_MS, "ttpf_ms")?;

        let note = match raw.note.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(text) if text.chars().count() > self.max_note_chars => {
                return Err(ValidationError::OutOfRange("note"));
            }
            Some(text) => Some(text.to_string()),
        };

        let entry = LogEntry {
            timestamp: (self.clock)().trunc_subsecs(0),
            player_id: player_id.to_string(),
            phase,
            rpe,
            pain,
            note,
            jump_height_cm,
            peak_force_n,
            ttpf_ms,
        };

        if !entry.has_measurement() {
            return Err(ValidationError::MissingRequired("rpe"));
        }

        Ok(entry)
    }
}

fn check_score(
    value: Option<i64>,
    range: RangeInclusive<i64>,
    field: &'static str,
) -> Result<Option<u8>, ValidationError> {
    match value {
        None => Ok(None),
        Some(v) if range.contains(&v) => {
            u8::try_from(v).map(Some).map_err(|_| ValidationError::OutOfRange(field))
        }
        Some(_) => Err(ValidationError::OutOfRange(field)),
    }
}

fn check_measurement(
    value: Option<f64>,
    range: RangeInclusive<f64>,
    field: &'static str,
) -> Result<Option<f64>, ValidationError> {
    match value {
        None => Ok(None),
        // NaN fails `contains`
        Some(v) if range.contains(&v) => Ok(Some(v)),
        Some(_) => Err(ValidationError::OutOfRange(field)),
    }
}
