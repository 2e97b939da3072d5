//! Scan metrics.
//!
//! Data problems never fail a run, so they are counted here instead. A single
//! [`ScanMetrics`] is shared by every scanner of a run (counters are atomic) and
//! reported once the run completes, either as JSON or as a short printed summary.
//!
//! ```
//! use gridbeam::metrics::ScanMetrics;
//!
//! let metrics = ScanMetrics::new();
//! metrics.file_opened();
//! metrics.rows_read(3);
//! assert_eq!(metrics.to_json()["rows_read"]["value"], 3);
//! ```

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Thread-safe counters for one aggregation run.
#[derive(Debug, Default)]
pub struct ScanMetrics {
    files_opened: AtomicU64,
    files_missing: AtomicU64,
    columns_missing: AtomicU64,
    read_errors: AtomicU64,
    rows_read: AtomicU64,
    rows_skipped: AtomicU64,
    samples_dispatched: AtomicU64,
    values_skipped: AtomicU64,
    timing: Mutex<(Option<Instant>, Option<Instant>)>,
}

/// Plain copy of the counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSnapshot {
    pub files_opened: u64,
    pub files_missing: u64,
    pub columns_missing: u64,
    pub read_errors: u64,
    pub rows_read: u64,
    pub rows_skipped: u64,
    pub samples_dispatched: u64,
    pub values_skipped: u64,
}

const DESCRIPTIONS: [(&str, &str); 8] = [
    ("files_opened", "Files opened and scanned"),
    ("files_missing", "Candidate files that were absent or unreadable"),
    ("columns_missing", "Requested columns absent from a file header"),
    ("read_errors", "CSV read errors that ended a file early"),
    ("rows_read", "Data rows read"),
    ("rows_skipped", "Rows with a bad epoch or before the read range"),
    ("samples_dispatched", "Samples sent to reducers"),
    ("values_skipped", "Values that failed to parse as a float"),
];

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

impl ScanMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_opened(&self) {
        bump(&self.files_opened, 1);
    }

    pub fn file_missing(&self) {
        bump(&self.files_missing, 1);
    }

    pub fn column_missing(&self) {
        bump(&self.columns_missing, 1);
    }

    pub fn read_error(&self) {
        bump(&self.read_errors, 1);
    }

    pub fn rows_read(&self, n: u64) {
        bump(&self.rows_read, n);
    }

    pub fn rows_skipped(&self, n: u64) {
        bump(&self.rows_skipped, n);
    }

    pub fn samples_dispatched(&self, n: u64) {
        bump(&self.samples_dispatched, n);
    }

    pub fn values_skipped(&self, n: u64) {
        bump(&self.values_skipped, n);
    }

    pub fn record_start(&self) {
        if let Ok(mut t) = self.timing.lock() {
            t.0 = Some(Instant::now());
        }
    }

    pub fn record_end(&self) {
        if let Ok(mut t) = self.timing.lock() {
            t.1 = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        let t = self.timing.lock().ok()?;
        match *t {
            (Some(start), Some(end)) => Some(end.duration_since(start)),
            _ => None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> ScanSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        ScanSnapshot {
            files_opened: get(&self.files_opened),
            files_missing: get(&self.files_missing),
            columns_missing: get(&self.columns_missing),
            read_errors: get(&self.read_errors),
            rows_read: get(&self.rows_read),
            rows_skipped: get(&self.rows_skipped),
            samples_dispatched: get(&self.samples_dispatched),
            values_skipped: get(&self.values_skipped),
        }
    }

    /// All counters as `{name: {"value": n, "description": ...}}`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let s = self.snapshot();
        let values = [
            s.files_opened,
            s.files_missing,
            s.columns_missing,
            s.read_errors,
            s.rows_read,
            s.rows_skipped,
            s.samples_dispatched,
            s.values_skipped,
        ];
        let mut out = serde_json::Map::new();
        for ((name, description), value) in DESCRIPTIONS.iter().zip(values) {
            out.insert((*name).to_string(), json!({ "value": value, "description": description }));
        }
        if let Some(elapsed) = self.elapsed() {
            out.insert(
                "execution_time_ms".to_string(),
                json!({ "value": elapsed.as_millis() as u64, "description": "Wall time of the run in milliseconds" }),
            );
        }
        Value::Object(out)
    }

    pub fn print(&self) {
        println!("\n========== Scan Metrics ==========");
        if let Some(elapsed) = self.elapsed() {
            println!("Execution Time: {:.3}s ({} ms)", elapsed.as_secs_f64(), elapsed.as_millis());
            println!("----------------------------------");
        }
        if let Value::Object(map) = self.to_json() {
            for (name, _) in DESCRIPTIONS {
                if let Some(entry) = map.get(name) {
                    println!("{name}: {}", entry["value"]);
                }
            }
        }
        println!("==================================\n");
    }

    /// Write [`to_json`](Self::to_json) pretty-printed to `path`.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())?;
        Ok(())
    }
}
