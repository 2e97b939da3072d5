//! Configuration errors.
//!
//! Everything in here is detected before any file is opened. Data problems met
//! while scanning (missing files, bad rows) are never errors; see
//! [`ScanMetrics`](crate::metrics::ScanMetrics).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("file frequency {0:?} is not one of 1y, 1M, 7d, 2d, 1d, 24h, 12h, 6h, 3h, 1h, 15m, 10m, 5m, 1m")]
    InvalidFrequency(String),

    #[error("time precision {0:?} is not valid (expected second, millisecond or microsecond)")]
    InvalidPrecision(String),

    #[error("method {0:?} is not valid (expected sum, count, mean, min, max, first, last or pick)")]
    InvalidMethod(String),

    #[error("start time {start} is after end time {end}")]
    StartAfterEnd { start: String, end: String },

    #[error("{field}: duration {value:?} is not valid")]
    InvalidDuration { field: String, value: String },

    #[error("{field}: duration {value:?} is below one {precision} tick")]
    DurationTooFine {
        field: String,
        value: String,
        precision: String,
    },

    #[error("window string {0:?} must have two durations separated by '_'")]
    InvalidWindowString(String),

    #[error("aggregation window must be positive, got {0}")]
    NonPositiveStep(i64),

    #[error("column {column:?}: window span {span} exceeds aggregation window {step}")]
    WindowTooWide { column: String, span: i64, step: i64 },

    #[error("column {column:?}: window start {lo} is after window end {hi}")]
    InvertedWindow { column: String, lo: i64, hi: i64 },

    #[error("column {column:?}: pick offset {offset} is greater than aggregation window {step}")]
    PickOffsetTooLarge { column: String, offset: i64, step: i64 },

    #[error("column {column:?}: windows or pick targets out of order at slot {index}")]
    UnorderedWindows { column: String, index: usize },

    #[error("column {column:?}: expected {expected} windows to match the grid, got {actual}")]
    WindowCountMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("input column name is empty")]
    EmptyInputColumn,

    #[error("output column {0:?} is requested more than once")]
    DuplicateOutputColumn(String),

    #[error("source name {0:?} is used more than once")]
    DuplicateSource(String),

    #[error("column {column:?}: unknown source {source_name:?}")]
    UnknownSource { column: String, source_name: String },

    #[error("column {0:?}: several sources are configured, the request must name one")]
    AmbiguousSource(String),

    #[error("file naming template {0:?} is not a valid strftime pattern")]
    InvalidTemplate(String),

    #[error("at least one file source is required")]
    NoSources,

    #[error("at least one column request is required")]
    NoRequests,

    #[error("point aggregation reads exactly one file source, got {0}")]
    PointSourceCount(usize),
}
