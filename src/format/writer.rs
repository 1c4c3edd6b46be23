//! Writes .mmdb files from a baked snapshot.

use std::io::Write;
use std::path::Path;

use crate::engine::MatchSnapshot;
use crate::types::error::MotionResult;
use crate::types::header::{FileHeader, HEADER_SIZE};

use super::compression::compress_names;
use super::ROW_RECORD_SIZE;

/// Writer for .mmdb binary files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmdbWriter;

impl MmdbWriter {
    /// Create a new writer.
    pub fn new() -> Self {
        Self
    }

    /// Write a snapshot to an .mmdb file.
    pub fn write_to_file(&self, snapshot: &MatchSnapshot, path: &Path) -> MotionResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.write_to(snapshot, &mut writer)
    }

    /// Write a snapshot to any writer.
    ///
    /// Sections, in order: header, pose matrix, row table, statistics,
    /// weights, compressed clip names.
    pub fn write_to(&self, snapshot: &MatchSnapshot, writer: &mut impl Write) -> MotionResult<()> {
        let database = &snapshot.database;
        let dimension = database.dimension() as u64;
        let pose_count = database.len() as u64;
        let stats = database.stats();

        // Stats block: means, variances, then one length-prefixed histogram per dimension
        let mut stats_block: Vec<u8> = Vec::new();
        for &mean in &stats.means {
            stats_block.extend_from_slice(&mean.to_le_bytes());
        }
        for &variance in &stats.variances {
            stats_block.extend_from_slice(&variance.to_le_bytes());
        }
        for density in &stats.densities {
            stats_block.extend_from_slice(&(density.len() as u32).to_le_bytes());
            for &(position, frequency) in density {
                stats_block.extend_from_slice(&position.to_le_bytes());
                stats_block.extend_from_slice(&frequency.to_le_bytes());
            }
        }
        stats_block.extend_from_slice(&(snapshot.weights.len() as u32).to_le_bytes());
        for &weight in &snapshot.weights {
            stats_block.extend_from_slice(&weight.to_le_bytes());
        }

        let names_block = compress_names(database.clip_names());

        let row_table_offset = HEADER_SIZE + pose_count * dimension * 4;
        let stats_offset = row_table_offset + pose_count * ROW_RECORD_SIZE;
        let names_offset = stats_offset + stats_block.len() as u64;

        let mut header = FileHeader::new(dimension as u32, snapshot.metric().as_u8());
        header.pose_count = pose_count;
        header.clip_count = database.clip_names().len() as u64;
        header.baked_at = snapshot.baked_at;
        header.row_table_offset = row_table_offset;
        header.stats_offset = stats_offset;
        header.names_offset = names_offset;
        header.write_to(writer)?;

        for &value in database.poses() {
            writer.write_all(&value.to_le_bytes())?;
        }

        for record in database.records() {
            writer.write_all(&record.clip_index.to_le_bytes())?;
            writer.write_all(&record.timestamp.to_le_bytes())?;
            writer.write_all(&record.category.to_le_bytes())?;
        }

        writer.write_all(&stats_block)?;
        writer.write_all(&names_block)?;
        writer.flush()?;

        log::debug!(
            "Wrote .mmdb: {} poses x {} dims, {} clip names",
            pose_count,
            dimension,
            header.clip_count
        );
        Ok(())
    }
}
