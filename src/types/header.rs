//! File header for .mmdb binary files.

use std::io::{Read, Write};

use crate::types::error::{MotionError, MotionResult};
use crate::types::{FORMAT_VERSION, MMDB_MAGIC};

/// Header of an .mmdb file. Fixed size: 64 bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileHeader {
    /// Magic bytes: [0x4D, 0x4D, 0x44, 0x42] ("MMDB").
    pub magic: [u8; 4],
    /// Format version (currently 1).
    pub version: u32,
    /// Feature vector dimensionality `D`.
    pub dimension: u32,
    /// Distance metric selector (0 = Chebyshev, 1 = Manhattan, 2 = squared Euclidean).
    pub metric: u8,
    /// Number of poses `N`.
    pub pose_count: u64,
    /// Number of clip names in the name block.
    pub clip_count: u64,
    /// When the database was baked (Unix epoch microseconds).
    pub baked_at: u64,
    /// Byte offset where the row table starts.
    pub row_table_offset: u64,
    /// Byte offset where the statistics block starts.
    pub stats_offset: u64,
    /// Byte offset where the clip-name block starts.
    pub names_offset: u64,
}

/// The fixed size of a FileHeader on disk: 64 bytes.
pub const HEADER_SIZE: u64 = 64;

impl FileHeader {
    /// Create a new header with default magic and version.
    pub fn new(dimension: u32, metric: u8) -> Self {
        Self {
            magic: MMDB_MAGIC,
            version: FORMAT_VERSION,
            dimension,
            metric,
            pose_count: 0,
            clip_count: 0,
            baked_at: 0,
            row_table_offset: HEADER_SIZE,
            stats_offset: HEADER_SIZE,
            names_offset: HEADER_SIZE,
        }
    }

    /// Write this header to the given writer. Writes exactly 64 bytes.
    ///
    /// Layout (all little-endian):
    /// - 0x00..0x04: magic (4 bytes)
    /// - 0x04..0x08: version (u32, 4 bytes)
    /// - 0x08..0x0C: dimension (u32, 4 bytes)
    /// - 0x0C..0x0D: metric (u8, 1 byte)
    /// - 0x0D..0x10: _reserved (3 bytes, written as 0)
    /// - 0x10..0x18: pose_count (u64, 8 bytes)
    /// - 0x18..0x20: clip_count (u64, 8 bytes)
    /// - 0x20..0x28: baked_at (u64, 8 bytes)
    /// - 0x28..0x30: row_table_offset (u64, 8 bytes)
    /// - 0x30..0x38: stats_offset (u64, 8 bytes)
    /// - 0x38..0x40: names_offset (u64, 8 bytes)
    ///   Total: 64 bytes
    pub fn write_to(&self, writer: &mut impl Write) -> MotionResult<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.dimension.to_le_bytes())?;
        writer.write_all(&[self.metric])?;
        writer.write_all(&[0u8; 3])?; // _reserved
        writer.write_all(&self.pose_count.to_le_bytes())?;
        writer.write_all(&self.clip_count.to_le_bytes())?;
        writer.write_all(&self.baked_at.to_le_bytes())?;
        writer.write_all(&self.row_table_offset.to_le_bytes())?;
        writer.write_all(&self.stats_offset.to_le_bytes())?;
        writer.write_all(&self.names_offset.to_le_bytes())?;
        Ok(())
    }

    /// Read a header from the given reader. Reads exactly 64 bytes.
    pub fn read_from(reader: &mut impl Read) -> MotionResult<Self> {
        let mut buf = [0u8; 64];
        reader.read_exact(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                MotionError::Truncated
            } else {
                MotionError::Io(e)
            }
        })?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != MMDB_MAGIC {
            return Err(MotionError::InvalidMagic);
        }

        let version = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if version != FORMAT_VERSION {
            return Err(MotionError::UnsupportedVersion(version));
        }

        let dimension = u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]);
        let metric = buf[12];
        // bytes 13..16 are reserved

        Ok(Self {
            magic,
            version,
            dimension,
            metric,
            pose_count: le_u64(&buf, 16),
            clip_count: le_u64(&buf, 24),
            baked_at: le_u64(&buf, 32),
            row_table_offset: le_u64(&buf, 40),
            stats_offset: le_u64(&buf, 48),
            names_offset: le_u64(&buf, 56),
        })
    }
}

fn le_u64(buf: &[u8; 64], at: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(bytes)
}
