//! Where input bytes come from.

use crate::io::compression::auto_detect_reader;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Opens a candidate input file by path.
///
/// An `Err` means "no data for this file": the scanner logs it and moves on.
pub trait RowSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Read>>;
}

/// Reads from the local filesystem, decompressing by extension or magic bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsRowSource;

impl RowSource for FsRowSource {
    fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
        auto_detect_reader(f, path)
            .with_context(|| format!("setup decompression for {}", path.display()))
    }
}

impl<T: RowSource + ?Sized> RowSource for &T {
    fn open(&self, path: &Path) -> Result<Box<dyn Read>> {
        (**self).open(path)
    }
}
