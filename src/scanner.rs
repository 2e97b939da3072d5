//! File-family scanning.
//!
//! A [`SourceScanner`] walks one file family (a naming template plus a file
//! frequency) across the plan's read range. For every candidate file it maps the
//! header to the requested columns, streams rows in order, shifts each timestamp
//! by the run's offset and dispatches `(epoch, value)` samples to the sink of the
//! owning output column.
//!
//! Nothing in here fails a run: missing files, missing columns, bad fields and
//! read errors are logged and counted in [`ScanMetrics`]. A bad epoch skips its
//! row and a bad value skips its field; only a failing reader ends a file early.

use crate::config::FileSource;
use crate::error::ConfigError;
use crate::io::RowSource;
use crate::metrics::ScanMetrics;
use crate::planner::Plan;
use crate::reducers::Reducer;
use crate::time::Precision;
use crate::window::{EpochWindow, Sample};
use anyhow::{anyhow, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use crossbeam::channel::Sender;
use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, trace};

/// Reject templates chrono cannot render.
pub fn validate_template(template: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(template).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::InvalidTemplate(template.to_string()));
    }
    Ok(())
}

/// Render a file path for `date` (UTC) from a strftime template.
pub fn render_template(template: &str, date: &DateTime<Utc>) -> Result<PathBuf> {
    let mut out = String::new();
    write!(out, "{}", date.format_with_items(StrftimeItems::new(template)))
        .map_err(|_| anyhow!("render file template {template:?}"))?;
    Ok(PathBuf::from(out))
}

/// Receives dispatched samples, addressed by plan column index.
pub trait SampleSink {
    fn accept(&mut self, column: usize, sample: Sample);
}

/// Channel sink for threaded runs: one sender per column bound to the scanner.
///
/// Dropping the sink closes every channel it holds.
pub struct ChannelSink {
    senders: Vec<Option<Sender<Sample>>>,
}

impl ChannelSink {
    pub fn new(columns: usize) -> Self {
        Self { senders: (0..columns).map(|_| None).collect() }
    }

    pub fn bind(&mut self, column: usize, tx: Sender<Sample>) {
        self.senders[column] = Some(tx);
    }
}

impl SampleSink for ChannelSink {
    fn accept(&mut self, column: usize, sample: Sample) {
        if let Some(tx) = self.senders.get(column).and_then(Option::as_ref) {
            // Reducers drain until every sender is gone, so this only blocks on backpressure.
            let _ = tx.send(sample);
        }
    }
}

/// Inline sink for sequential runs.
impl SampleSink for Vec<Box<dyn Reducer>> {
    fn accept(&mut self, column: usize, sample: Sample) {
        if let Some(reducer) = self.get_mut(column) {
            reducer.push(sample);
        }
    }
}

/// A requested input column and the plan column it feeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanTarget {
    pub input: String,
    pub column: usize,
}

/// Scans one file family for a plan.
#[derive(Clone, Debug)]
pub struct SourceScanner {
    source: FileSource,
    read_range: EpochWindow,
    offset: i64,
    precision: Precision,
    targets: Vec<ScanTarget>,
}

impl SourceScanner {
    /// Scanner for source `index` of `plan`, with every column bound to it.
    pub fn for_source(plan: &Plan, index: usize) -> Option<Self> {
        let source = plan.sources.get(index)?.clone();
        let targets = plan
            .columns_for_source(index)
            .map(|(column, c)| ScanTarget { input: c.request.input.clone(), column })
            .collect();
        Some(Self {
            source,
            read_range: plan.read_range,
            offset: plan.offset,
            precision: plan.grid.precision(),
            targets,
        })
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    /// File start dates covering the read range in raw (un-offset) file time.
    pub fn candidate_dates(&self) -> Vec<DateTime<Utc>> {
        let raw = self.read_range.shifted(-self.offset);
        match (self.precision.to_datetime(raw.lo), self.precision.to_datetime(raw.hi)) {
            (Some(from), Some(to)) => self.source.frequency.dates_covering(from, to),
            _ => Vec::new(),
        }
    }

    /// Scan every candidate file in date order.
    pub fn scan<S: SampleSink>(&self, rows: &dyn RowSource, sink: &mut S, metrics: &ScanMetrics) {
        if self.targets.is_empty() {
            debug!(source = %self.source.name, "no columns bound, skipping source");
            return;
        }
        let dates = self.candidate_dates();
        debug!(source = %self.source.name, files = dates.len(), "scanning source");
        for date in dates {
            let path = match render_template(&self.source.template, &date) {
                Ok(p) => p,
                Err(err) => {
                    debug!(source = %self.source.name, error = %err, "skipping file date");
                    continue;
                }
            };
            match rows.open(&path) {
                Ok(reader) => {
                    metrics.file_opened();
                    self.scan_file(reader, &path, sink, metrics);
                }
                Err(err) => {
                    metrics.file_missing();
                    debug!(path = %path.display(), error = %err, "input file unavailable");
                }
            }
        }
        info!(source = %self.source.name, "source scan complete");
    }

    /// Stream one file's rows into `sink`.
    pub fn scan_file<S: SampleSink>(
        &self,
        reader: Box<dyn Read>,
        path: &Path,
        sink: &mut S,
        metrics: &ScanMetrics,
    ) {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let header = match rdr.byte_headers() {
            Ok(h) => h.clone(),
            Err(err) => {
                metrics.read_error();
                debug!(path = %path.display(), error = %err, "unreadable header");
                return;
            }
        };

        let mut fields: Vec<(usize, usize)> = Vec::with_capacity(self.targets.len());
        for target in &self.targets {
            match header.iter().position(|name| name == target.input.as_bytes()) {
                Some(field) => fields.push((field, target.column)),
                None => {
                    metrics.column_missing();
                    debug!(path = %path.display(), column = %target.input, "column not in header");
                }
            }
        }
        if fields.is_empty() {
            return;
        }

        let (mut read, mut skipped, mut sent, mut bad_values) = (0u64, 0u64, 0u64, 0u64);
        // Byte records: a stray non-UTF-8 byte only spoils the field it sits in.
        let mut record = csv::ByteRecord::new();
        loop {
            match rdr.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    metrics.read_error();
                    debug!(path = %path.display(), error = %err, "read error, abandoning rest of file");
                    break;
                }
            }
            read += 1;

            let Some(raw) = parse_field::<i64>(record.get(0)) else {
                skipped += 1;
                continue;
            };
            let epoch = raw + self.offset;
            if epoch < self.read_range.lo {
                skipped += 1;
                continue;
            }
            if epoch > self.read_range.hi {
                trace!(path = %path.display(), epoch, "past read range, skipping rest of file");
                break;
            }

            for &(field, column) in &fields {
                match parse_field::<f64>(record.get(field)) {
                    Some(value) => {
                        sink.accept(column, Sample::new(epoch, value));
                        sent += 1;
                    }
                    None => bad_values += 1,
                }
            }
        }

        metrics.rows_read(read);
        metrics.rows_skipped(skipped);
        metrics.samples_dispatched(sent);
        metrics.values_skipped(bad_values);
        trace!(path = %path.display(), read, skipped, sent, "file scanned");
    }
}

fn parse_field<T: FromStr>(field: Option<&[u8]>) -> Option<T> {
    std::str::from_utf8(field?).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn templates_render_in_utc() -> Result<()> {
        let date = Utc.with_ymd_and_hms(2023, 1, 3, 6, 0, 0).unwrap();
        let path = render_template("data/ground_%Y-%m-%d_%H.csv", &date)?;
        assert_eq!(path, PathBuf::from("data/ground_2023-01-03_06.csv"));
        Ok(())
    }

    #[test]
    fn bad_templates_are_config_errors() {
        assert!(validate_template("data/%Y-%m-%d.csv").is_ok());
        assert_eq!(
            validate_template("data/%Q.csv"),
            Err(ConfigError::InvalidTemplate("data/%Q.csv".to_string()))
        );
    }
}
