//! Spatial index over the pose database: weighted metrics and the k-d tree.

pub mod distance;
pub mod kdtree;

pub use distance::{DistanceMetric, WeightedDistance};
pub use kdtree::{KdTree, Neighbor, DEFAULT_LEAF_SIZE};
