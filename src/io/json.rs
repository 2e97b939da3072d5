//! JSON5 rendering of an [`AggregateTable`].
//!
//! Shape: `{"Columns":{"<name>":[...],...},"Time":["2023-01-03T00:00:00",...]}`.
//! Plain JSON has no token for non-finite floats, so this writes the JSON5
//! literals `NaN`, `Infinity` and `-Infinity`.

use crate::assembler::AggregateTable;
use crate::io::compression::auto_detect_writer;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const JSON5_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

fn json5_number(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        v.to_string()
    }
}

pub fn to_json5(table: &AggregateTable) -> Result<String> {
    let mut out = String::from("{\"Columns\":{");
    for (i, (name, values)) in table.columns().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::to_string(name).context("encode column name")?);
        out.push_str(":[");
        let body: Vec<String> = values.iter().map(|&v| json5_number(v)).collect();
        out.push_str(&body.join(","));
        out.push(']');
    }
    out.push_str("},\"Time\":[");
    for (i, ts) in table.timestamps().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write!(out, "\"{}\"", ts.format(JSON5_TIME_FORMAT))?;
    }
    out.push_str("]}");
    Ok(out)
}

pub fn write_json5(path: impl AsRef<Path>, table: &AggregateTable) -> Result<()> {
    let path = path.as_ref();
    let text = to_json5(table)?;
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut out = auto_detect_writer(f, path)?;
    out.write_all(text.as_bytes())
        .with_context(|| format!("write {}", path.display()))?;
    out.flush()?;
    Ok(())
}
