//! Time units, duration strings and file frequencies.
//!
//! - [`Precision`] fixes the integer unit of every [`Epoch`] in a run.
//! - [`parse_duration`] reads signed duration strings such as `-23h59m59s`,
//!   `7h30m` or `1.5s` into nanoseconds; [`Precision::ticks`] converts them.
//! - [`FileFrequency`] enumerates how often a new telemetry file starts and
//!   rounds instants down to a file boundary.

use crate::error::ConfigError;
use crate::window::{floor_to_lattice, Epoch};
use chrono::{DateTime, Months, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FormatResult};
use std::str::FromStr;
use std::sync::LazyLock;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Integer unit of epochs and durations for one aggregation run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Second,
    Millisecond,
    Microsecond,
}

impl Precision {
    /// Nanoseconds in one tick of this precision.
    #[inline]
    pub fn nanos_per_tick(self) -> i64 {
        match self {
            Precision::Second => NANOS_PER_SECOND,
            Precision::Millisecond => 1_000_000,
            Precision::Microsecond => 1_000,
        }
    }

    /// Convert a nanosecond duration to ticks, truncating toward zero.
    #[inline]
    pub fn ticks(self, nanos: i64) -> i64 {
        nanos / self.nanos_per_tick()
    }

    pub fn to_epoch(self, dt: &DateTime<Utc>) -> Epoch {
        match self {
            Precision::Second => dt.timestamp(),
            Precision::Millisecond => dt.timestamp_millis(),
            Precision::Microsecond => dt.timestamp_micros(),
        }
    }

    /// `None` when the epoch is outside chrono's representable range.
    pub fn to_datetime(self, epoch: Epoch) -> Option<DateTime<Utc>> {
        match self {
            Precision::Second => DateTime::from_timestamp(epoch, 0),
            Precision::Millisecond => DateTime::from_timestamp_millis(epoch),
            Precision::Microsecond => DateTime::from_timestamp_micros(epoch),
        }
    }

    /// Parse a duration string for `field` straight into ticks.
    ///
    /// A non-zero duration that truncates to zero ticks is rejected.
    pub fn parse_ticks(self, field: &str, value: &str) -> Result<i64, ConfigError> {
        let nanos = parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration {
            field: field.to_string(),
            value: value.to_string(),
        })?;
        let ticks = self.ticks(nanos);
        if ticks == 0 && nanos != 0 {
            return Err(ConfigError::DurationTooFine {
                field: field.to_string(),
                value: value.to_string(),
                precision: self.to_string(),
            });
        }
        Ok(ticks)
    }
}

impl FromStr for Precision {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "second" | "s" => Ok(Precision::Second),
            "millisecond" | "ms" => Ok(Precision::Millisecond),
            "microsecond" | "us" => Ok(Precision::Microsecond),
            other => Err(ConfigError::InvalidPrecision(other.to_string())),
        }
    }
}

impl Display for Precision {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        f.write_str(match self {
            Precision::Second => "second",
            Precision::Millisecond => "millisecond",
            Precision::Microsecond => "microsecond",
        })
    }
}

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(?:(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:ns|us|µs|μs|ms|s|m|h))+$")
        .expect("duration grammar")
});

static DURATION_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]*)(?:\.([0-9]*))?(ns|us|µs|μs|ms|s|m|h)").expect("duration part grammar")
});

fn unit_nanos(unit: &str) -> i64 {
    match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => NANOS_PER_SECOND,
        "m" => 60 * NANOS_PER_SECOND,
        _ => 3_600 * NANOS_PER_SECOND,
    }
}

/// Parse a signed duration string into nanoseconds.
///
/// Accepts a sequence of decimal numbers each followed by a unit
/// (`ns`, `us`, `ms`, `s`, `m`, `h`), with an optional leading sign, plus the
/// bare literal `0`. Returns `None` on malformed input or overflow.
///
/// ```
/// use gridbeam::time::parse_duration;
///
/// assert_eq!(parse_duration("1h30m"), Some(5_400_000_000_000));
/// assert_eq!(parse_duration("-1.5s"), Some(-1_500_000_000));
/// assert_eq!(parse_duration("7"), None);
/// ```
pub fn parse_duration(s: &str) -> Option<i64> {
    let s = s.trim();
    if s == "0" || s == "+0" || s == "-0" {
        return Some(0);
    }
    if !DURATION_RE.is_match(s) {
        return None;
    }
    let (negative, body) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut total: i64 = 0;
    for cap in DURATION_PART_RE.captures_iter(body) {
        let unit = unit_nanos(&cap[3]);
        let whole = match &cap[1] {
            "" => 0,
            digits => digits.parse::<i64>().ok()?,
        };
        let mut part = whole.checked_mul(unit)?;
        if let Some(frac) = cap.get(2).map(|m| m.as_str()).filter(|f| !f.is_empty()) {
            let fraction: f64 = format!("0.{frac}").parse().ok()?;
            part = part.checked_add((fraction * unit as f64).round() as i64)?;
        }
        total = total.checked_add(part)?;
    }
    Some(if negative { -total } else { total })
}

/// Parse a `lo_hi` window string such as `-23h59m59s_0h` into nanosecond bounds.
pub fn parse_window_string(s: &str) -> Result<(i64, i64), ConfigError> {
    let mut parts = s.split('_');
    let (Some(lo), Some(hi), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(ConfigError::InvalidWindowString(s.to_string()));
    };
    let parse = |v: &str| {
        parse_duration(v).ok_or_else(|| ConfigError::InvalidDuration {
            field: "window".to_string(),
            value: v.to_string(),
        })
    };
    Ok((parse(lo)?, parse(hi)?))
}

/// How often a new file starts within one file family.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FileFrequency {
    /// One file per calendar year (`1y`).
    Yearly,
    /// One file per calendar month (`1M`).
    Monthly,
    /// Fixed-length files, aligned to the Unix epoch; length in seconds.
    Every(i64),
}

impl FileFrequency {
    /// Round `dt` down to the start of the file that contains it.
    pub fn floor(&self, dt: DateTime<Utc>) -> DateTime<Utc> {
        use chrono::{Datelike, NaiveDate};
        match *self {
            FileFrequency::Yearly => NaiveDate::from_ymd_opt(dt.year(), 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(dt, |n| n.and_utc()),
            FileFrequency::Monthly => NaiveDate::from_ymd_opt(dt.year(), dt.month(), 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map_or(dt, |n| n.and_utc()),
            FileFrequency::Every(secs) => {
                let start = floor_to_lattice(dt.timestamp(), secs, 0);
                DateTime::from_timestamp(start, 0).unwrap_or(dt)
            }
        }
    }

    /// Start of the file following the one that starts at `dt`.
    pub fn next(&self, dt: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match *self {
            FileFrequency::Yearly => dt.checked_add_months(Months::new(12)),
            FileFrequency::Monthly => dt.checked_add_months(Months::new(1)),
            FileFrequency::Every(secs) => dt.checked_add_signed(chrono::Duration::seconds(secs)),
        }
    }

    /// File start dates covering the closed range `[from, to]`, ascending.
    pub fn dates_covering(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut d = self.floor(from);
        while d <= to {
            out.push(d);
            match self.next(d) {
                Some(n) => d = n,
                None => break,
            }
        }
        out
    }
}

impl FromStr for FileFrequency {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const HOUR: i64 = 3_600;
        Ok(match s {
            "1y" => FileFrequency::Yearly,
            "1M" => FileFrequency::Monthly,
            "7d" => FileFrequency::Every(7 * 24 * HOUR),
            "2d" => FileFrequency::Every(2 * 24 * HOUR),
            "1d" | "24h" => FileFrequency::Every(24 * HOUR),
            "12h" => FileFrequency::Every(12 * HOUR),
            "6h" => FileFrequency::Every(6 * HOUR),
            "3h" => FileFrequency::Every(3 * HOUR),
            "1h" => FileFrequency::Every(HOUR),
            "15m" => FileFrequency::Every(15 * 60),
            "10m" => FileFrequency::Every(10 * 60),
            "5m" => FileFrequency::Every(5 * 60),
            "1m" => FileFrequency::Every(60),
            other => return Err(ConfigError::InvalidFrequency(other.to_string())),
        })
    }
}
