//! Reads .mmdb files back into a queryable snapshot.

use std::io::Read;
use std::path::Path;

use crate::database::PoseDatabase;
use crate::engine::MatchSnapshot;
use crate::index::DistanceMetric;
use crate::stats::DatasetStats;
use crate::types::error::{MotionError, MotionResult};
use crate::types::header::{FileHeader, HEADER_SIZE};

use super::compression::decompress_names;
use super::ROW_RECORD_SIZE;

/// Bounds-checked little-endian reads over a byte buffer.
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn at(data: &'a [u8], offset: u64) -> MotionResult<Self> {
        let pos = usize::try_from(offset).map_err(|_| MotionError::Corrupt(offset))?;
        if pos > data.len() {
            return Err(MotionError::Truncated);
        }
        Ok(Self { data, pos })
    }

    fn take(&mut self, len: usize) -> MotionResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(MotionError::Truncated)?;
        let bytes = self.data.get(self.pos..end).ok_or(MotionError::Truncated)?;
        self.pos = end;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self) -> MotionResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u32(&mut self) -> MotionResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> MotionResult<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn f32(&mut self) -> MotionResult<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    fn f32s(&mut self, count: usize) -> MotionResult<Vec<f32>> {
        (0..count).map(|_| self.f32()).collect()
    }
}

fn section_len(count: u64, unit: u64) -> MotionResult<usize> {
    count
        .checked_mul(unit)
        .and_then(|n| usize::try_from(n).ok())
        .ok_or(MotionError::Truncated)
}

/// Reader for .mmdb binary files.
pub struct MmdbReader;

impl MmdbReader {
    /// Read only the header of an .mmdb file.
    pub fn read_header(path: &Path) -> MotionResult<FileHeader> {
        let mut file = std::fs::File::open(path)?;
        FileHeader::read_from(&mut file)
    }

    /// Read an .mmdb file and rebuild its index with `leaf_size`.
    pub fn read_from_file(path: &Path, leaf_size: usize) -> MotionResult<MatchSnapshot> {
        let data = std::fs::read(path)?;
        Self::read_from(&mut std::io::Cursor::new(data), leaf_size)
    }

    /// Read from any reader.
    pub fn read_from(reader: &mut impl Read, leaf_size: usize) -> MotionResult<MatchSnapshot> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        if (data.len() as u64) < HEADER_SIZE {
            return Err(MotionError::Truncated);
        }
        let header = FileHeader::read_from(&mut std::io::Cursor::new(&data[..64]))?;
        let metric = DistanceMetric::from_u8(header.metric)?;
        let dimension = header.dimension as usize;

        // Pose matrix
        let mut cursor = ByteCursor::at(&data, HEADER_SIZE)?;
        let values = section_len(header.pose_count, u64::from(header.dimension))?;
        // reject absurd counts before allocating
        if section_len(values as u64, 4)? > data.len() {
            return Err(MotionError::Truncated);
        }
        let poses = cursor.f32s(values)?;

        // Row table
        let rows = usize::try_from(header.pose_count).map_err(|_| MotionError::Truncated)?;
        if section_len(header.pose_count, ROW_RECORD_SIZE)? > data.len() {
            return Err(MotionError::Truncated);
        }
        let mut cursor = ByteCursor::at(&data, header.row_table_offset)?;
        let mut clip_indices = Vec::with_capacity(rows);
        let mut timestamps = Vec::with_capacity(rows);
        let mut categories = Vec::with_capacity(rows);
        for _ in 0..rows {
            clip_indices.push(cursor.u32()?);
            timestamps.push(cursor.f32()?);
            categories.push(cursor.u64()?);
        }

        // Statistics and weights
        let mut cursor = ByteCursor::at(&data, header.stats_offset)?;
        let means = cursor.f32s(dimension)?;
        let variances = cursor.f32s(dimension)?;
        let mut densities = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            let bins = cursor.u32()? as usize;
            let mut density = Vec::with_capacity(bins.min(data.len() / 8));
            for _ in 0..bins {
                density.push((cursor.f32()?, cursor.f32()?));
            }
            densities.push(density);
        }
        let weight_count = cursor.u32()? as usize;
        if weight_count != 0 && weight_count != dimension {
            return Err(MotionError::Corrupt(cursor.pos as u64));
        }
        let weights = cursor.f32s(weight_count)?;

        // Clip names
        let names_start =
            usize::try_from(header.names_offset).map_err(|_| MotionError::Truncated)?;
        let names_block = data.get(names_start..).ok_or(MotionError::Truncated)?;
        let clip_count = usize::try_from(header.clip_count).map_err(|_| MotionError::Truncated)?;
        let clip_names = decompress_names(names_block, clip_count)?;

        if let Some(&bad) = clip_indices.iter().find(|&&i| i as usize >= clip_names.len()) {
            log::warn!(
                "Row table references clip {bad} but only {} names are stored",
                clip_names.len()
            );
        }

        let stats = DatasetStats::from_parts(means, variances, densities)?;
        let database = PoseDatabase::from_parts(
            dimension,
            poses,
            clip_indices,
            timestamps,
            categories,
            clip_names,
            stats,
        )?;
        log::info!(
            "Loaded .mmdb: {} poses x {} dims, metric {}",
            database.len(),
            dimension,
            metric
        );
        MatchSnapshot::from_database(database, weights, metric, leaf_size, header.baked_at)
    }
}
