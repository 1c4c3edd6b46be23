//! Binary file I/O for .mmdb files.

pub mod compression;
pub mod reader;
pub mod writer;

pub use reader::MmdbReader;
pub use writer::MmdbWriter;

/// Size of a single row record on disk: 16 bytes.
pub(crate) const ROW_RECORD_SIZE: u64 = 16;
