//! Core pose database: parallel per-row arrays plus the stats they were normalized with.

use crate::stats::DatasetStats;
use crate::types::{CategoryMask, MotionError, MotionResult};

/// Borrowed view of one database row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseRecord<'a> {
    /// Row index.
    pub row: usize,
    /// Normalized feature vector, `dimension` long.
    pub features: &'a [f32],
    /// Index of the source clip in the database's clip-name table.
    pub clip_index: u32,
    /// Seconds into the source clip.
    pub timestamp: f32,
    /// Category bitmask of the sample.
    pub category: CategoryMask,
}

/// The baked pose database.
///
/// Row `i` of `poses`, `clip_indices`, `timestamps` and `categories` all
/// describe the same pose. Immutable once built; a rebake replaces it whole.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseDatabase {
    dimension: usize,
    /// Row-major `N x D` normalized matrix.
    poses: Vec<f32>,
    clip_indices: Vec<u32>,
    timestamps: Vec<f32>,
    categories: Vec<CategoryMask>,
    clip_names: Vec<String>,
    stats: DatasetStats,
}

impl PoseDatabase {
    /// An empty database of the given dimension with identity stats.
    pub fn empty(dimension: usize) -> Self {
        Self {
            dimension,
            poses: Vec::new(),
            clip_indices: Vec::new(),
            timestamps: Vec::new(),
            categories: Vec::new(),
            clip_names: Vec::new(),
            stats: DatasetStats::identity(dimension),
        }
    }

    /// Assemble from already-normalized parts (used by the builder and the reader).
    pub fn from_parts(
        dimension: usize,
        poses: Vec<f32>,
        clip_indices: Vec<u32>,
        timestamps: Vec<f32>,
        categories: Vec<CategoryMask>,
        clip_names: Vec<String>,
        stats: DatasetStats,
    ) -> MotionResult<Self> {
        if stats.dimension() != dimension {
            return Err(MotionError::DimensionMismatch {
                expected: dimension,
                got: stats.dimension(),
            });
        }
        let rows = clip_indices.len();
        if poses.len() != rows * dimension {
            return Err(MotionError::DimensionMismatch {
                expected: rows * dimension,
                got: poses.len(),
            });
        }
        for got in [timestamps.len(), categories.len()] {
            if got != rows {
                return Err(MotionError::DimensionMismatch {
                    expected: rows,
                    got,
                });
            }
        }

        Ok(Self {
            dimension,
            poses,
            clip_indices,
            timestamps,
            categories,
            clip_names,
            stats,
        })
    }

    /// Number of poses `N`.
    pub fn len(&self) -> usize {
        self.clip_indices.len()
    }

    /// Whether the database holds no pose.
    pub fn is_empty(&self) -> bool {
        self.clip_indices.is_empty()
    }

    /// Feature dimension `D`.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Normalized vector of a row.
    pub fn pose(&self, row: usize) -> Option<&[f32]> {
        if row >= self.len() {
            return None;
        }
        let start = row * self.dimension;
        Some(&self.poses[start..start + self.dimension])
    }

    /// Full view of a row, or `None` if out of range.
    pub fn record(&self, row: usize) -> Option<PoseRecord<'_>> {
        Some(PoseRecord {
            row,
            features: self.pose(row)?,
            clip_index: *self.clip_indices.get(row)?,
            timestamp: *self.timestamps.get(row)?,
            category: *self.categories.get(row)?,
        })
    }

    /// Iterate over all rows in order.
    pub fn records(&self) -> impl Iterator<Item = PoseRecord<'_>> + '_ {
        (0..self.len()).filter_map(move |row| self.record(row))
    }

    /// Name of a clip by index.
    pub fn clip_name(&self, clip_index: u32) -> Option<&str> {
        self.clip_names.get(clip_index as usize).map(|s| s.as_str())
    }

    /// Whole normalized matrix (row-major).
    pub fn poses(&self) -> &[f32] {
        &self.poses
    }

    /// Source clip index per row.
    pub fn clip_indices(&self) -> &[u32] {
        &self.clip_indices
    }

    /// Timestamp per row.
    pub fn timestamps(&self) -> &[f32] {
        &self.timestamps
    }

    /// Category mask per row.
    pub fn categories(&self) -> &[CategoryMask] {
        &self.categories
    }

    /// Clip names in clip-index order.
    pub fn clip_names(&self) -> &[String] {
        &self.clip_names
    }

    /// Stats the matrix was normalized with.
    pub fn stats(&self) -> &DatasetStats {
        &self.stats
    }
}
