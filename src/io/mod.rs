pub mod compression;
pub mod csv;
pub mod json;
pub mod source;

pub use source::{FsRowSource, RowSource};
