#![allow(dead_code)]

use chrono::{DateTime, Utc};
use gridbeam::testing::{telemetry_csv, TelemetryDir};
use gridbeam::{AggregateConfig, ColumnRequestConfig, FileSourceConfig};

/// 2023-01-03T00:00:00Z
pub const D0: i64 = 1_672_704_000;
pub const DAY: i64 = 86_400;
pub const HOUR: i64 = 3_600;

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

pub fn utc(s: &str) -> DateTime<Utc> {
    s.parse().expect("RFC 3339 timestamp")
}

/// Hourly rows for the day starting at `day_start`: `rain` is 1.0, `ap` is the hour.
pub fn hourly_day(day_start: i64) -> String {
    telemetry_csv(
        &["TIMESTAMP", "rain", "ap"],
        (0..24).map(|h| (day_start + h * HOUR, vec![Some(1.0), Some(h as f64)])),
    )
}

pub fn day_file_name(prefix: &str, day_start: i64, ext: &str) -> String {
    let date = DateTime::from_timestamp(day_start, 0).expect("valid day");
    format!("{prefix}_{}.{ext}", date.format("%Y-%m-%d"))
}

/// Write hourly files for `days` consecutive days starting at `first_day`.
pub fn write_days(dir: &TelemetryDir, prefix: &str, first_day: i64, days: i64, ext: &str) -> anyhow::Result<()> {
    for d in 0..days {
        let start = first_day + d * DAY;
        dir.write(&day_file_name(prefix, start, ext), &hourly_day(start))?;
    }
    Ok(())
}

pub fn daily_source(dir: &TelemetryDir, name: &str, ext: &str) -> FileSourceConfig {
    FileSourceConfig {
        name: Some(name.to_string()),
        file_naming_template: dir.template(&format!("{name}_%Y-%m-%d.{ext}")),
        file_frequency: "24h".to_string(),
    }
}

pub fn daily_config(
    sources: Vec<FileSourceConfig>,
    start: &str,
    end: &str,
    requests: Vec<ColumnRequestConfig>,
) -> AggregateConfig {
    AggregateConfig {
        start_time: utc(start),
        end_time: utc(end),
        time_precision: "second".to_string(),
        time_offset: None,
        aggregation_window: "24h".to_string(),
        sources,
        requests,
    }
}
