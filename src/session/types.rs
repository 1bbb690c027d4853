//! Training log entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Periodization stage governing the day's prescribed routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Strength block
    Strength,
    /// Power block
    Power,
    /// In-season maintenance
    Maintenance,
}

impl Phase {
    /// All phases in display order.
    pub const ALL: [Phase; 3] = [Phase::Strength, Phase::Power, Phase::Maintenance];

    /// Canonical label used in worksheets.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Strength => "Strength",
            Phase::Power => "Power",
            Phase::Maintenance => "Maintenance",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Phase::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or(())
    }
}

/// One training-session observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Creation instant, whole seconds
    pub timestamp: DateTime<Utc>,
    /// Player identifier from the roster
    pub player_id: String,
    /// Training phase
    pub phase: Phase,
    /// Rate of perceived exertion (1-10)
    pub rpe: Option<u8>,
    /// Pain score (0-10)
    pub pain: Option<u8>,
    /// Free-form note
    pub note: Option<String>,
    /// Countermovement jump height in centimeters
    pub jump_height_cm: Option<f64>,
    /// Peak ground reaction force in newtons
    pub peak_force_n: Option<f64>,
    /// Time to peak force in milliseconds
    pub ttpf_ms: Option<f64>,
}

impl LogEntry {
    /// Whether any force-plate metric is present.
    pub fn has_power_test(&self) -> bool {
        self.jump_height_cm.is_some() || self.peak_force_n.is_some() || self.ttpf_ms.is_some()
    }

    /// Whether the entry carries at least one measurement.
    ///
    /// Entries without a measurement are never persisted.
    pub fn has_measurement(&self) -> bool {
        self.rpe.is_some() || self.has_power_test()
    }
}

/// A plottable numeric field of a [`LogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Rate of perceived exertion
    Rpe,
    /// Pain score
    Pain,
    /// Jump height (cm)
    JumpHeight,
    /// Peak force (N)
    PeakForce,
    /// Time to peak force (ms)
    Ttpf,
}

impl Metric {
    /// All metrics.
    pub const ALL: [Metric; 5] = [
        Metric::Rpe,
        Metric::Pain,
        Metric::JumpHeight,
        Metric::PeakForce,
        Metric::Ttpf,
    ];

    /// Extract this metric from an entry, if present.
    pub fn value(&self, entry: &LogEntry) -> Option<f64> {
        match self {
            Metric::Rpe => entry.rpe.map(f64::from),
            Metric::Pain => entry.pain.map(f64::from),
            Metric::JumpHeight => entry.jump_height_cm,
            Metric::PeakForce => entry.peak_force_n,
            Metric::Ttpf => entry.ttpf_ms,
        }
    }

    /// Short identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Rpe => "rpe",
            Metric::Pain => "pain",
            Metric::JumpHeight => "jump_height",
            Metric::PeakForce => "peak_force",
            Metric::Ttpf => "ttpf",
        }
    }

    /// Display unit.
    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Rpe | Metric::Pain => "",
            Metric::JumpHeight => "cm",
            Metric::PeakForce => "N",
            Metric::Ttpf => "ms",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "rpe" => Ok(Metric::Rpe),
            "pain" => Ok(Metric::Pain),
            "jump_height" | "jump_height_cm" => Ok(Metric::JumpHeight),
            "peak_force" | "peak_force_n" => Ok(Metric::PeakForce),
            "ttpf" | "ttpf_ms" => Ok(Metric::Ttpf),
            _ => {
                let known: Vec<&str> = Metric::ALL.iter().map(Metric::as_str).collect();
                Err(format!("unknown metric '{}' (expected one of: {})", s, known.join(", ")))
            }
        }
    }
}
