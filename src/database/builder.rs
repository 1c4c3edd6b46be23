//! Accumulates raw pose rows during a bake and turns them into a normalized database.

use crate::stats::DatasetStats;
use crate::types::{CategoryMask, MotionError, MotionResult};

use super::PoseDatabase;

/// Collects raw (un-normalized) rows for one bake.
pub struct PoseDatabaseBuilder {
    dimension: usize,
    raw: Vec<f32>,
    clip_indices: Vec<u32>,
    timestamps: Vec<f32>,
    categories: Vec<CategoryMask>,
}

impl PoseDatabaseBuilder {
    /// Create a builder for `dimension`-wide rows.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            raw: Vec::new(),
            clip_indices: Vec::new(),
            timestamps: Vec::new(),
            categories: Vec::new(),
        }
    }

    /// Append a raw row.
    pub fn push(
        &mut self,
        clip_index: u32,
        timestamp: f32,
        category: CategoryMask,
        features: &[f32],
    ) -> MotionResult<usize> {
        if features.len() != self.dimension {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimension,
                got: features.len(),
            });
        }
        self.raw.extend_from_slice(features);
        self.clip_indices.push(clip_index);
        self.timestamps.push(timestamp);
        self.categories.push(category);
        Ok(self.clip_indices.len() - 1)
    }

    /// Number of rows collected.
    pub fn len(&self) -> usize {
        self.clip_indices.len()
    }

    /// Whether no row has been collected.
    pub fn is_empty(&self) -> bool {
        self.clip_indices.is_empty()
    }

    /// Row dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Raw matrix collected so far.
    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Normalize every row with `stats` and freeze the database.
    pub fn build(self, stats: DatasetStats, clip_names: Vec<String>) -> MotionResult<PoseDatabase> {
        let mut poses = self.raw;
        stats.normalize_matrix(&mut poses)?;
        PoseDatabase::from_parts(
            self.dimension,
            poses,
            self.clip_indices,
            self.timestamps,
            self.categories,
            clip_names,
            stats,
        )
    }
}
