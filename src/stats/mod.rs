//! Per-dimension dataset statistics and z-score normalization.

pub mod density;

use serde::Serialize;

use crate::types::{MotionError, MotionResult};

pub use density::DensityAccumulator;

/// Variances at or below this are treated as constant dimensions.
pub const VARIANCE_EPSILON: f32 = f32::EPSILON;

/// Variance substituted for constant dimensions.
pub const FLOORED_VARIANCE: f32 = 1.0;

/// Mean, variance and density histogram of every dimension of a bake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub means: Vec<f32>,
    pub variances: Vec<f32>,
    pub densities: Vec<Vec<(f32, f32)>>,
}

impl DatasetStats {
    /// Stats that leave vectors unchanged: zero mean, unit variance.
    pub fn identity(dimension: usize) -> Self {
        Self {
            means: vec![0.0; dimension],
            variances: vec![FLOORED_VARIANCE; dimension],
            densities: vec![Vec::new(); dimension],
        }
    }

    /// Build from stored parts, validating lengths and flooring variances.
    pub fn from_parts(
        means: Vec<f32>,
        variances: Vec<f32>,
        densities: Vec<Vec<(f32, f32)>>,
    ) -> MotionResult<Self> {
        let dimension = means.len();
        for got in [variances.len(), densities.len()] {
            if got != dimension {
                return Err(MotionError::DimensionMismatch {
                    expected: dimension,
                    got,
                });
            }
        }
        let variances = variances.into_iter().map(floor_variance).collect();
        Ok(Self {
            means,
            variances,
            densities,
        })
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.means.len()
    }

    fn check(&self, len: usize) -> MotionResult<()> {
        if len != self.dimension() {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimension(),
                got: len,
            });
        }
        Ok(())
    }

    /// Normalize one vector in place: `(x - mean) / variance`.
    pub fn normalize_in_place(&self, vector: &mut [f32]) -> MotionResult<()> {
        self.check(vector.len())?;
        for ((x, mean), variance) in vector.iter_mut().zip(&self.means).zip(&self.variances) {
            *x = (*x - mean) / variance;
        }
        Ok(())
    }

    /// Normalized copy of `vector`.
    pub fn normalize(&self, vector: &[f32]) -> MotionResult<Vec<f32>> {
        let mut out = vector.to_vec();
        self.normalize_in_place(&mut out)?;
        Ok(out)
    }

    /// Inverse of [`normalize`](Self::normalize): `x * variance + mean`.
    pub fn denormalize(&self, vector: &[f32]) -> MotionResult<Vec<f32>> {
        self.check(vector.len())?;
        Ok(vector
            .iter()
            .zip(&self.means)
            .zip(&self.variances)
            .map(|((x, mean), variance)| x * variance + mean)
            .collect())
    }

    /// Normalize a row-major `N x D` matrix in place.
    pub fn normalize_matrix(&self, matrix: &mut [f32]) -> MotionResult<()> {
        let dimension = self.dimension();
        if dimension == 0 {
            return Ok(());
        }
        if matrix.len() % dimension != 0 {
            return Err(MotionError::DimensionMismatch {
                expected: dimension,
                got: matrix.len() % dimension,
            });
        }
        for row in matrix.chunks_exact_mut(dimension) {
            self.normalize_in_place(row)?;
        }
        Ok(())
    }
}

fn floor_variance(variance: f32) -> f32 {
    if variance.is_finite() && variance > VARIANCE_EPSILON {
        variance
    } else {
        FLOORED_VARIANCE
    }
}

/// Welford running mean/variance for one dimension, plus its histogram.
#[derive(Debug, Clone)]
struct DimensionAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
    density: DensityAccumulator,
}

impl DimensionAccumulator {
    fn push(&mut self, value: f32) {
        let x = f64::from(value);
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
        self.density.push(value);
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }
}

/// Single-pass statistics over a stream of samples.
#[derive(Debug, Clone)]
pub struct StatsAccumulator {
    dims: Vec<DimensionAccumulator>,
}

impl StatsAccumulator {
    /// Create an accumulator for `dimension`-wide samples.
    pub fn new(dimension: usize, histogram_bins: usize, histogram_cache: usize) -> Self {
        let template = DimensionAccumulator {
            count: 0,
            mean: 0.0,
            m2: 0.0,
            density: DensityAccumulator::new(histogram_bins, histogram_cache),
        };
        Self {
            dims: vec![template; dimension],
        }
    }

    /// Feed one sample.
    pub fn push(&mut self, sample: &[f32]) -> MotionResult<()> {
        if sample.len() != self.dims.len() {
            return Err(MotionError::DimensionMismatch {
                expected: self.dims.len(),
                got: sample.len(),
            });
        }
        for (acc, &value) in self.dims.iter_mut().zip(sample) {
            acc.push(value);
        }
        Ok(())
    }

    /// Number of samples fed so far.
    pub fn count(&self) -> u64 {
        self.dims.first().map(|d| d.count).unwrap_or(0)
    }

    /// Produce the final stats and the indices of floored (constant) dimensions.
    pub fn finish(&self) -> (DatasetStats, Vec<usize>) {
        let mut floored = Vec::new();
        let mut means = Vec::with_capacity(self.dims.len());
        let mut variances = Vec::with_capacity(self.dims.len());
        let mut densities = Vec::with_capacity(self.dims.len());

        for (i, acc) in self.dims.iter().enumerate() {
            let raw = acc.variance() as f32;
            let variance = floor_variance(raw);
            if variance != raw {
                floored.push(i);
            }
            means.push(acc.mean as f32);
            variances.push(variance);
            densities.push(acc.density.histogram());
        }

        (
            DatasetStats {
                means,
                variances,
                densities,
            },
            floored,
        )
    }
}
