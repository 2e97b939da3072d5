//! # gridbeam
//!
//! Windowed **grid aggregation** of time-stamped CSV telemetry.
//!
//! Telemetry loggers write append-only CSV files, one per day (or hour, month...),
//! often split across several physical stations. gridbeam reads those files once,
//! in timestamp order, and produces a fixed time-grid summary table: for every
//! requested output column, a reduction rule is applied over a per-column window
//! around each grid point.
//!
//! ## Key Features
//!
//! - **Reductions** - sum, count, mean, min, max, first, last, and nearest-sample `pick`
//! - **Relative windows** - each column picks its own `[lo, hi]` window around a grid point
//! - **Single pass** - every reducer is a small state machine that never looks back
//! - **Concurrent scanning** - one thread per file family and per column, bounded channels
//! - **Multiple sources** - each output column is bound to exactly one file family
//! - **Compressed inputs** - gzip, zstd, bzip2 and xz (feature flags)
//! - **Outputs** - an in-memory [`AggregateTable`], CSV (sequential or parallel) and JSON5
//!
//! ## Quick Start
//!
//! ```no_run
//! use gridbeam::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = AggregateConfig::from_json_file("ground.json")?;
//! let table = aggregate_table(&config)?;
//! io::csv::write_table_csv("ground_daily.csv", &table)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Grid and windows
//!
//! The [`planner`] steps from `start_time` to `end_time` by `aggregation_window`.
//! A request's window `"-16h59m59s_7h"` means: for grid point `g`, aggregate samples
//! with `g - 16h59m59s <= t <= g + 7h`. Windows default to the step ending at the
//! grid point, `[g - step + 1, g]`. A `pick` request takes the sample nearest to
//! `g + pick_offset`.
//!
//! ### Time
//!
//! All timestamps are integer epochs in one [`Precision`] (seconds by default).
//! Each file row starts with its raw epoch; the run's `time_offset` is added to it
//! before windowing. Calendar arithmetic is UTC.
//!
//! ### Errors
//!
//! Configuration problems are [`ConfigError`]s, reported before any file is opened.
//! Entry points return `anyhow::Result`; use `downcast_ref::<ConfigError>()` to
//! inspect them. Data problems (missing files or columns, malformed rows) are never
//! errors: the affected slots simply get no data, and [`ScanMetrics`] counts them.
//!
//! ### Execution Modes
//!
//! - **Threaded** (default) - scoped threads connected by bounded channels
//! - **Sequential** - everything on the calling thread
//!
//! Both modes produce the same table.

pub mod assembler;
pub mod config;
pub mod error;
pub mod io;
pub mod metrics;
pub mod planner;
pub mod reducers;
pub mod runner;
pub mod scanner;
pub mod testing;
pub mod time;
pub mod window;

pub use assembler::AggregateTable;
pub use config::{
    AggregateConfig, AggregateJob, ColumnRequest, ColumnRequestConfig, FileSource,
    FileSourceConfig, PointConfig, PointJob,
};
pub use error::ConfigError;
pub use io::{FsRowSource, RowSource};
pub use metrics::{ScanMetrics, ScanSnapshot};
pub use planner::{ColumnPlan, Plan, ResultGrid, WindowSpec};
pub use reducers::{ColumnResult, Reducer, ReducerKind, ReducerState};
pub use runner::{ExecMode, Runner};
pub use time::{FileFrequency, Precision};
pub use window::{Epoch, EpochWindow, Sample};

use anyhow::Result;
use indexmap::IndexMap;

/// Run a grid aggregation over the local filesystem with the default runner.
pub fn aggregate_table(config: &AggregateConfig) -> Result<AggregateTable> {
    Runner::default().aggregate(config, &FsRowSource, &ScanMetrics::new())
}

/// Run a point aggregation over the local filesystem: one value per output column.
pub fn aggregate_point(config: &PointConfig) -> Result<IndexMap<String, f64>> {
    Runner::default().aggregate_point(config, &FsRowSource, &ScanMetrics::new())
}
