//! CSV rendering of an [`AggregateTable`].
//!
//! - [`write_table_csv`]: sequential writer
//! - [`write_table_csv_par`]: deterministic parallel writer (feature `parallel-io`)
//!
//! Layout: header `timestamp,<columns in request order>`, then one row per grid
//! point with the timestamp as `%Y-%m-%d %H:%M:%S` UTC. Floats use the shortest
//! form that round-trips; non-finite values are written as `NaN`, `+Inf`, `-Inf`.
//! Output is compressed when the path has a codec extension (e.g. `.csv.gz`).

use crate::assembler::AggregateTable;
use crate::io::compression::auto_detect_writer;
use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Shortest round-trip text for a result value.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

fn header(table: &AggregateTable) -> Vec<String> {
    std::iter::once("timestamp".to_string())
        .chain(table.column_names().map(str::to_string))
        .collect()
}

fn record(table: &AggregateTable, i: usize) -> Option<Vec<String>> {
    let (ts, values) = table.row(i)?;
    Some(
        std::iter::once(ts.format(TIMESTAMP_FORMAT).to_string())
            .chain(values.into_iter().map(format_value))
            .collect(),
    )
}

fn create_output(path: &Path) -> Result<Box<dyn Write>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    auto_detect_writer(f, path).with_context(|| format!("setup compression for {}", path.display()))
}

/// Render the whole table to CSV text.
pub fn table_to_csv_string(table: &AggregateTable) -> Result<String> {
    let mut buf = Vec::new();
    write_rows(&mut buf, table, 0, table.len(), true)?;
    String::from_utf8(buf).context("CSV output is not UTF-8")
}

fn write_rows<W: Write>(out: W, table: &AggregateTable, start: usize, end: usize, with_header: bool) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
    if with_header {
        wtr.write_record(header(table)).context("write CSV header")?;
    }
    for i in start..end {
        if let Some(rec) = record(table, i) {
            wtr.write_record(&rec)
                .with_context(|| format!("serialize CSV row #{}", i + 1))?;
        }
    }
    wtr.flush()?;
    Ok(())
}

/// Write the table to `path`; returns the number of data rows.
pub fn write_table_csv(path: impl AsRef<Path>, table: &AggregateTable) -> Result<usize> {
    let path = path.as_ref();
    let mut out = create_output(path)?;
    write_rows(&mut out, table, 0, table.len(), true)?;
    out.flush()?;
    Ok(table.len())
}

/// Parallel CSV writer with deterministic row order.
///
/// Row shards are rendered into buffers in parallel, then concatenated in shard
/// order. Only shard 0 carries the header. `shards` defaults to `2 * num_cpus`,
/// clamped to `[1, rows]`.
#[cfg(feature = "parallel-io")]
pub fn write_table_csv_par(
    path: impl AsRef<Path>,
    table: &AggregateTable,
    shards: Option<usize>,
) -> Result<usize> {
    use rayon::iter::{IntoParallelIterator, ParallelIterator};

    let path = path.as_ref();
    let n = table.len();
    if n == 0 {
        return write_table_csv(path, table);
    }

    let shard_count = shards.unwrap_or_else(|| 2 * num_cpus::get().max(2)).clamp(1, n);
    let mut buffers: Vec<(usize, Vec<u8>)> = split_ranges(n, shard_count)
        .into_par_iter()
        .map(|(idx, start, end)| {
            let mut buf = Vec::with_capacity((end - start).saturating_mul(32));
            write_rows(&mut buf, table, start, end, idx == 0)?;
            Ok::<_, anyhow::Error>((idx, buf))
        })
        .collect::<Result<Vec<_>>>()?;
    buffers.sort_by_key(|(idx, _)| *idx);

    let mut out = create_output(path)?;
    for (_, buf) in buffers {
        out.write_all(&buf)?;
    }
    out.flush()?;
    Ok(n)
}

/// Split `[0, len)` into `parts` contiguous non-empty ranges `(idx, start, end)`,
/// spreading the remainder over the first ranges.
#[cfg(feature = "parallel-io")]
fn split_ranges(len: usize, parts: usize) -> Vec<(usize, usize, usize)> {
    let parts = parts.max(1).min(len.max(1));
    let base = len / parts;
    let rem = len % parts;

    let mut out = Vec::with_capacity(parts);
    let mut start = 0usize;
    for idx in 0..parts {
        let end = start + base + usize::from(idx < rem);
        if start < end {
            out.push((idx, start, end));
        }
        start = end;
    }
    out
}

#[cfg(all(test, feature = "parallel-io"))]
mod tests {
    use super::split_ranges;

    #[test]
    fn ranges_cover_everything_in_order() {
        let r = split_ranges(10, 3);
        assert_eq!(r, vec![(0, 0, 4), (1, 4, 7), (2, 7, 10)]);
        assert_eq!(split_ranges(2, 8).len(), 2);
    }
}
