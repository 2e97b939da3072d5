//! Run configuration.
//!
//! Configs are plain serde structs holding the user's strings; [`AggregateConfig::validate`]
//! and [`PointConfig::validate`] turn them into typed jobs, reporting every problem as a
//! [`ConfigError`] before any file is touched.
//!
//! ```
//! use gridbeam::config::AggregateConfig;
//!
//! let cfg = AggregateConfig::from_json_str(r#"{
//!     "start_time": "2023-01-03T00:00:00Z",
//!     "end_time": "2023-01-04T00:00:00Z",
//!     "aggregation_window": "24h",
//!     "sources": [{"file_naming_template": "data/ground_%Y-%m-%d.csv", "file_frequency": "24h"}],
//!     "requests": [{"input_column": "Rain_Tot", "method": "sum", "window": "-16h59m59s_7h"}]
//! }"#).unwrap();
//! let job = cfg.validate().unwrap();
//! assert_eq!(job.step, 86_400);
//! assert_eq!(job.requests[0].output, "Rain_Tot");
//! ```

use crate::error::ConfigError;
use crate::reducers::ReducerKind;
use crate::scanner::validate_template;
use crate::time::{parse_window_string, FileFrequency, Precision};
use crate::window::{Epoch, EpochWindow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

fn default_precision() -> String {
    "second".to_string()
}

/// Grid aggregation over one or more file sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_precision")]
    pub time_precision: String,
    /// Added to every raw file timestamp before windowing.
    #[serde(default)]
    pub time_offset: Option<String>,
    /// Grid step.
    pub aggregation_window: String,
    pub sources: Vec<FileSourceConfig>,
    pub requests: Vec<ColumnRequestConfig>,
}

/// Single-value aggregation over `[start_time, end_time]` from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointConfig {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_precision")]
    pub time_precision: String,
    #[serde(default)]
    pub time_offset: Option<String>,
    pub sources: Vec<FileSourceConfig>,
    pub requests: Vec<ColumnRequestConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSourceConfig {
    /// Defaults to the naming template.
    #[serde(default)]
    pub name: Option<String>,
    /// strftime pattern, rendered in UTC for each file date.
    pub file_naming_template: String,
    pub file_frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnRequestConfig {
    pub input_column: String,
    #[serde(default)]
    pub output_column: Option<String>,
    pub method: String,
    /// Relative window `lo_hi`, grid mode only.
    #[serde(default)]
    pub window: Option<String>,
    /// Relative pick offset, grid mode only.
    #[serde(default)]
    pub pick_offset: Option<String>,
    /// Absolute pick time, point mode only. Given in raw file time; the run's
    /// `time_offset` is added to it like to every file timestamp.
    #[serde(default)]
    pub pick_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: Option<String>,
}

impl ColumnRequestConfig {
    /// Shorthand for tests and programmatic configs.
    pub fn new(input: &str, method: &str) -> Self {
        Self {
            input_column: input.to_string(),
            output_column: None,
            method: method.to_string(),
            window: None,
            pick_offset: None,
            pick_time: None,
            source: None,
        }
    }

    pub fn output(mut self, name: &str) -> Self {
        self.output_column = Some(name.to_string());
        self
    }

    pub fn window(mut self, window: &str) -> Self {
        self.window = Some(window.to_string());
        self
    }

    pub fn pick_offset(mut self, offset: &str) -> Self {
        self.pick_offset = Some(offset.to_string());
        self
    }

    pub fn pick_time(mut self, at: DateTime<Utc>) -> Self {
        self.pick_time = Some(at);
        self
    }

    pub fn source(mut self, name: &str) -> Self {
        self.source = Some(name.to_string());
        self
    }
}

/// A validated file family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSource {
    pub name: String,
    pub template: String,
    pub frequency: FileFrequency,
}

/// A validated column request.
///
/// `window` is set for windowed kinds and `pick` for [`ReducerKind::Pick`]; in grid mode
/// both are relative to each grid point, in point mode both are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRequest {
    pub input: String,
    pub output: String,
    pub kind: ReducerKind,
    pub window: Option<EpochWindow>,
    pub pick: Option<Epoch>,
    /// Index into the job's source list.
    pub source: usize,
}

/// Everything the grid planner needs, in epoch ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateJob {
    pub start: Epoch,
    pub end: Epoch,
    pub precision: Precision,
    pub offset: i64,
    pub step: i64,
    pub sources: Vec<FileSource>,
    pub requests: Vec<ColumnRequest>,
}

/// A validated point aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointJob {
    pub start: Epoch,
    pub end: Epoch,
    pub precision: Precision,
    pub offset: i64,
    pub source: FileSource,
    pub requests: Vec<ColumnRequest>,
}

impl AggregateConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse aggregation config")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn validate(&self) -> Result<AggregateJob, ConfigError> {
        let precision: Precision = self.time_precision.parse()?;
        let (start, end) = epoch_range(precision, &self.start_time, &self.end_time)?;
        let offset = parse_offset(precision, self.time_offset.as_deref())?;
        let step = precision.parse_ticks("aggregation_window", &self.aggregation_window)?;
        if step <= 0 {
            return Err(ConfigError::NonPositiveStep(step));
        }
        let sources = validate_sources(&self.sources)?;
        if self.requests.is_empty() {
            return Err(ConfigError::NoRequests);
        }

        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.requests.len());
        for rc in &self.requests {
            let (input, output, kind) = request_identity(rc, &mut seen)?;
            let source = bind_source(rc, &output, &sources)?;
            let (window, pick) = if kind == ReducerKind::Pick {
                let offset = match rc.pick_offset.as_deref() {
                    Some(s) => precision.parse_ticks("pick_offset", s)?,
                    None => 0,
                };
                (None, Some(offset))
            } else {
                let window = match rc.window.as_deref() {
                    Some(s) => {
                        let (lo, hi) = parse_window_string(s)?;
                        EpochWindow { lo: precision.ticks(lo), hi: precision.ticks(hi) }
                    }
                    None => EpochWindow { lo: 1 - step, hi: 0 },
                };
                (Some(window), None)
            };
            requests.push(ColumnRequest { input, output, kind, window, pick, source });
        }

        Ok(AggregateJob { start, end, precision, offset, step, sources, requests })
    }
}

impl PointConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("parse point config")
    }

    pub fn validate(&self) -> Result<PointJob, ConfigError> {
        let precision: Precision = self.time_precision.parse()?;
        let (start, end) = epoch_range(precision, &self.start_time, &self.end_time)?;
        let offset = parse_offset(precision, self.time_offset.as_deref())?;
        if self.sources.len() != 1 {
            return Err(ConfigError::PointSourceCount(self.sources.len()));
        }
        let mut sources = validate_sources(&self.sources)?;
        if self.requests.is_empty() {
            return Err(ConfigError::NoRequests);
        }

        let mut seen = HashSet::new();
        let mut requests = Vec::with_capacity(self.requests.len());
        for rc in &self.requests {
            let (input, output, kind) = request_identity(rc, &mut seen)?;
            let source = bind_source(rc, &output, &sources)?;
            let (window, pick) = if kind == ReducerKind::Pick {
                let at = rc
                    .pick_time
                    .as_ref()
                    .map_or(end, |t| precision.to_epoch(t) + offset);
                (None, Some(at))
            } else {
                (Some(EpochWindow { lo: start, hi: end }), None)
            };
            requests.push(ColumnRequest { input, output, kind, window, pick, source });
        }

        Ok(PointJob {
            start,
            end,
            precision,
            offset,
            source: sources.remove(0),
            requests,
        })
    }
}

fn epoch_range(
    precision: Precision,
    start: &DateTime<Utc>,
    end: &DateTime<Utc>,
) -> Result<(Epoch, Epoch), ConfigError> {
    if start > end {
        return Err(ConfigError::StartAfterEnd {
            start: start.to_rfc3339(),
            end: end.to_rfc3339(),
        });
    }
    Ok((precision.to_epoch(start), precision.to_epoch(end)))
}

fn parse_offset(precision: Precision, offset: Option<&str>) -> Result<i64, ConfigError> {
    offset.map_or(Ok(0), |s| precision.parse_ticks("time_offset", s))
}

fn validate_sources(configs: &[FileSourceConfig]) -> Result<Vec<FileSource>, ConfigError> {
    if configs.is_empty() {
        return Err(ConfigError::NoSources);
    }
    let mut names = HashSet::new();
    configs
        .iter()
        .map(|sc| {
            let name = sc.name.clone().unwrap_or_else(|| sc.file_naming_template.clone());
            if !names.insert(name.clone()) {
                return Err(ConfigError::DuplicateSource(name));
            }
            validate_template(&sc.file_naming_template)?;
            Ok(FileSource {
                name,
                template: sc.file_naming_template.clone(),
                frequency: sc.file_frequency.parse()?,
            })
        })
        .collect()
}

fn request_identity(
    rc: &ColumnRequestConfig,
    seen: &mut HashSet<String>,
) -> Result<(String, String, ReducerKind), ConfigError> {
    if rc.input_column.is_empty() {
        return Err(ConfigError::EmptyInputColumn);
    }
    let kind: ReducerKind = rc.method.parse()?;
    let output = rc
        .output_column
        .clone()
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| rc.input_column.clone());
    if !seen.insert(output.clone()) {
        return Err(ConfigError::DuplicateOutputColumn(output));
    }
    Ok((rc.input_column.clone(), output, kind))
}

/// Each output column gets exactly one producing source.
fn bind_source(
    rc: &ColumnRequestConfig,
    output: &str,
    sources: &[FileSource],
) -> Result<usize, ConfigError> {
    match rc.source.as_deref() {
        Some(name) => sources.iter().position(|s| s.name == name).ok_or_else(|| {
            ConfigError::UnknownSource {
                column: output.to_string(),
                source_name: name.to_string(),
            }
        }),
        None if sources.len() == 1 => Ok(0),
        None => Err(ConfigError::AmbiguousSource(output.to_string())),
    }
}
