//! Distance metrics and per-dimension weighting.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{MotionError, MotionResult};

/// Distance metric used by the k-d tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DistanceMetric {
    /// L-infinity: largest weighted per-dimension difference.
    Chebyshev = 0,
    /// L1: sum of weighted absolute differences.
    #[default]
    Manhattan = 1,
    /// Sum of weighted squared differences.
    SquaredEuclidean = 2,
}

impl DistanceMetric {
    /// Convert from the on-disk selector byte.
    pub fn from_u8(value: u8) -> MotionResult<Self> {
        match value {
            0 => Ok(Self::Chebyshev),
            1 => Ok(Self::Manhattan),
            2 => Ok(Self::SquaredEuclidean),
            other => Err(MotionError::InvalidMetric(other)),
        }
    }

    /// The on-disk selector byte.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Human-readable name, as used in config files.
    pub fn name(self) -> &'static str {
        match self {
            Self::Chebyshev => "chebyshev",
            Self::Manhattan => "manhattan",
            Self::SquaredEuclidean => "squared_euclidean",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chebyshev" | "linf" => Ok(Self::Chebyshev),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            "squared_euclidean" | "euclidean" | "l2" => Ok(Self::SquaredEuclidean),
            other => Err(MotionError::InvalidConfig(format!(
                "unknown distance metric {other:?}"
            ))),
        }
    }
}

/// A metric plus the per-dimension weights it multiplies into every term.
///
/// Weights are expected to be non-negative. An empty weight vector means
/// uniform weighting; dimensions past the end of a short vector weigh 1.0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightedDistance {
    pub metric: DistanceMetric,
    pub weights: Vec<f32>,
}

impl WeightedDistance {
    /// Create a weighted distance.
    pub fn new(metric: DistanceMetric, weights: Vec<f32>) -> Self {
        Self { metric, weights }
    }

    /// Unweighted distance under `metric`.
    pub fn uniform(metric: DistanceMetric) -> Self {
        Self::new(metric, Vec::new())
    }

    #[inline]
    fn weight(&self, dim: usize) -> f32 {
        self.weights.get(dim).copied().unwrap_or(1.0)
    }

    #[inline]
    fn term(&self, dim: usize, diff: f32) -> f32 {
        match self.metric {
            DistanceMetric::Chebyshev | DistanceMetric::Manhattan => self.weight(dim) * diff.abs(),
            DistanceMetric::SquaredEuclidean => self.weight(dim) * diff * diff,
        }
    }

    #[inline]
    fn combine(&self, acc: f32, term: f32) -> f32 {
        match self.metric {
            DistanceMetric::Chebyshev => acc.max(term),
            DistanceMetric::Manhattan | DistanceMetric::SquaredEuclidean => acc + term,
        }
    }

    /// Distance between two equal-length vectors.
    #[inline]
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b)
            .enumerate()
            .fold(0.0, |acc, (dim, (x, y))| self.combine(acc, self.term(dim, x - y)))
    }

    /// Smallest possible distance from `query` to any point inside the box `[lo, hi]`.
    #[inline]
    pub fn box_lower_bound(&self, query: &[f32], lo: &[f32], hi: &[f32]) -> f32 {
        query
            .iter()
            .zip(lo.iter().zip(hi))
            .enumerate()
            .fold(0.0, |acc, (dim, (&q, (&l, &h)))| {
                let diff = if q < l {
                    l - q
                } else if q > h {
                    q - h
                } else {
                    0.0
                };
                self.combine(acc, self.term(dim, diff))
            })
    }
}
