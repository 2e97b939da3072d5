//! In-memory input files.

use crate::io::compression::auto_detect_reader;
use crate::io::RowSource;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A [`RowSource`] backed by a path -> bytes map.
///
/// Every `open` attempt is recorded, hit or miss, so tests can check which
/// candidate files a scan asked for.
#[derive(Debug, Default)]
pub struct MemoryRowSource {
    files: HashMap<PathBuf, Vec<u8>>,
    opened: Mutex<Vec<PathBuf>>,
}

impl MemoryRowSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Paths requested so far, in request order.
    #[must_use]
    pub fn opened(&self) -> Vec<PathBuf> {
        self.opened.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

impl RowSource for MemoryRowSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        if let Ok(mut opened) = self.opened.lock() {
            opened.push(path.to_path_buf());
        }
        let bytes = self
            .files
            .get(path)
            .ok_or_else(|| anyhow!("no in-memory file {}", path.display()))?;
        auto_detect_reader(Cursor::new(bytes.clone()), path)
    }
}
