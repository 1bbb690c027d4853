//! Session entries: the typed log row and its builder.

pub mod builder;
pub mod types;

pub use builder::{RawFields, SessionEntryBuilder, ValidationError};
pub use types::{LogEntry, Metric, Phase};
