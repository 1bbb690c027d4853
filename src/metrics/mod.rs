//! Training metrics derived from the log.

pub mod trends;

pub use trends::{ConditionPoint, PlayerSummary, SeriesPoint, TrendAggregator};
