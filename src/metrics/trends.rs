//! Per-player trend series and summaries.
//!
//! Everything here is a pure function of the rows passed in. Missing
//! metrics are skipped, never counted as zero, so an absent score cannot
//! drag a mean down and no aggregate is ever NaN.

use crate::session::types::{LogEntry, Metric};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One point of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Aggregates for one player.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PlayerSummary {
    /// Number of entries
    pub count: usize,
    /// Mean RPE over entries that recorded it
    pub mean_rpe: Option<f64>,
    /// Mean pain over entries that recorded it
    pub mean_pain: Option<f64>,
    /// Best jump height (cm)
    pub max_jump_height_cm: Option<f64>,
    /// Best peak force (N)
    pub max_peak_force_n: Option<f64>,
    /// Fastest time to peak force (ms)
    pub min_ttpf_ms: Option<f64>,
}

/// Daily condition values for a player (the RPE line and pain bars).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConditionPoint {
    /// Calendar day (UTC)
    pub date: NaiveDate,
    /// Entries logged that day
    pub sessions: usize,
    /// Mean RPE that day
    pub mean_rpe: Option<f64>,
    /// Mean pain that day
    pub mean_pain: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    n: usize,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.n += 1;
        }
    }

    fn get(&self) -> Option<f64> {
        (self.n > 0).then(|| self.sum / self.n as f64)
    }
}

fn keep_max(current: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (current, value) {
        (Some(c), Some(v)) => Some(c.max(v)),
        (None, v) => v,
        (c, None) => c,
    }
}

fn keep_min(current: Option<f64>, value: Option<f64>) -> Option<f64> {
    match (current, value) {
        (Some(c), Some(v)) => Some(c.min(v)),
        (None, v) => v,
        (c, None) => c,
    }
}

/// Derives chart series and summaries from log rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendAggregator;

impl TrendAggregator {
    pub fn new() -> Self {
        Self
    }

    /// One player's values for one metric, oldest first.
    ///
    /// Rows without the metric are skipped. Equal timestamps keep input order.
    pub fn series_for(&self, player_id: &str, metric: Metric, rows: &[LogEntry]) -> Vec<SeriesPoint> {
        let mut points: Vec<SeriesPoint> = rows
            .iter()
            .filter(|entry| entry.player_id == player_id)
            .filter_map(|entry| {
                metric.value(entry).map(|value| SeriesPoint {
                    timestamp: entry.timestamp,
                    value,
                })
            })
            .collect();

        points.sort_by_key(|p| p.timestamp);
        points
    }

    /// Per-player aggregates. Players with no rows are absent.
    pub fn summary(&self, rows: &[LogEntry]) -> BTreeMap<String, PlayerSummary> {
        let mut acc: BTreeMap<String, (PlayerSummary, Mean, Mean)> = BTreeMap::new();

        for entry in rows {
            let (summary, rpe, pain) = acc.entry(entry.player_id.clone()).or_default();
            summary.count += 1;
            rpe.add(Metric::Rpe.value(entry));
            pain.add(Metric::Pain.value(entry));
            summary.max_jump_height_cm = keep_max(summary.max_jump_height_cm, entry.jump_height_cm);
            summary.max_peak_force_n = keep_max(summary.max_peak_force_n, entry.peak_force_n);
            summary.min_ttpf_ms = keep_min(summary.min_ttpf_ms, entry.ttpf_ms);
        }

        acc.into_iter()
            .map(|(player, (mut summary, rpe, pain))| {
                summary.mean_rpe = rpe.get();
                summary.mean_pain = pain.get();
                (player, summary)
            })
            .collect()
    }

    /// One series per player for a metric, for multi-player comparison charts.
    ///
    /// Players that never recorded the metric are absent.
    pub fn compare(&self, metric: Metric, rows: &[LogEntry]) -> BTreeMap<String, Vec<SeriesPoint>> {
        let mut series: BTreeMap<String, Vec<SeriesPoint>> = BTreeMap::new();

        for entry in rows {
            if let Some(value) = metric.value(entry) {
                series
                    .entry(entry.player_id.clone())
                    .or_default()
                    .push(SeriesPoint {
                        timestamp: entry.timestamp,
                        value,
                    });
            }
        }

        for points in series.values_mut() {
            points.sort_by_key(|p| p.timestamp);
        }
        series
    }

    /// Daily RPE and pain for a player, oldest day first.
    pub fn condition_report(&self, player_id: &str, rows: &[LogEntry]) -> Vec<ConditionPoint> {
        let mut days: BTreeMap<NaiveDate, (usize, Mean, Mean)> = BTreeMap::new();

        for entry in rows.iter().filter(|e| e.player_id == player_id) {
            let (sessions, rpe, pain) = days.entry(entry.timestamp.date_naive()).or_default();
            *sessions += 1;
            rpe.add(Metric::Rpe.value(entry));
            pain.add(Metric::Pain.value(entry));
        }

        days.into_iter()
            .map(|(date, (sessions, rpe, pain))| ConditionPoint {
                date,
                sessions,
                mean_rpe: rpe.get(),
                mean_pain: pain.get(),
            })
            .collect()
    }

    /// Most recent entry for a player.
    pub fn latest<'a>(&self, player_id: &str, rows: &'a [LogEntry]) -> Option<&'a LogEntry> {
        rows.iter()
            .filter(|e| e.player_id == player_id)
            .max_by_key(|e| e.timestamp)
    }
}
