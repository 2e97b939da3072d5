//! On-disk telemetry fixtures.

use crate::io::compression::auto_detect_writer;
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Render telemetry CSV text: a header, then `epoch,value...` rows.
///
/// `None` values become empty fields.
///
/// ```
/// use gridbeam::testing::telemetry_csv;
///
/// let text = telemetry_csv(&["TIMESTAMP", "AP"], [(10, vec![Some(1.5)]), (11, vec![None])]);
/// assert_eq!(text, "TIMESTAMP,AP\n10,1.5\n11,\n");
/// ```
pub fn telemetry_csv(
    header: &[&str],
    rows: impl IntoIterator<Item = (i64, Vec<Option<f64>>)>,
) -> String {
    let mut out = header.join(",");
    out.push('\n');
    for (epoch, values) in rows {
        let _ = write!(out, "{epoch}");
        for v in values {
            out.push(',');
            if let Some(v) = v {
                let _ = write!(out, "{v}");
            }
        }
        out.push('\n');
    }
    out
}

/// A temporary directory of telemetry files, removed on drop.
pub struct TelemetryDir {
    dir: TempDir,
}

impl TelemetryDir {
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        Ok(Self { dir: TempDir::new().context("create temp dir")? })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A file naming template rooted in this directory.
    #[must_use]
    pub fn template(&self, pattern: &str) -> String {
        self.dir.path().join(pattern).to_string_lossy().into_owned()
    }

    /// Write `contents` to `name`, compressing when the name has a codec extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut w = auto_detect_writer(f, &path)?;
        w.write_all(contents.as_bytes())?;
        w.flush()?;
        drop(w);
        Ok(path)
    }
}
