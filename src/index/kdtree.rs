//! Exact k-nearest-neighbour k-d tree with category filtering.
//!
//! The tree owns a copy of the coordinates and of each row's category mask.
//! Point `i` of the tree is row `i` of the pose database it was built from.
//! Splits are made at the median of the widest dimension; leaves hold up to
//! `leaf_size` rows. Every node keeps the bounding box of its points, which
//! gives the lower bound used to prune subtrees.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::types::{CategoryFilter, CategoryMask, MotionError, MotionResult};

use super::distance::{DistanceMetric, WeightedDistance};

/// Default maximum number of rows per leaf.
pub const DEFAULT_LEAF_SIZE: usize = 8;

/// One search hit.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    /// Row index in the pose database.
    pub row: usize,
    /// Distance under the tree's weighted metric.
    pub distance: f32,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.row.cmp(&other.row))
    }
}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct Node {
    lo: Vec<f32>,
    hi: Vec<f32>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Leaf { rows: Vec<u32> },
    Split { left: Box<Node>, right: Box<Node> },
}

/// Immutable spatial index over the rows of a pose database.
#[derive(Debug, Clone)]
pub struct KdTree {
    dimension: usize,
    points: Vec<f32>,
    categories: Vec<CategoryMask>,
    distance: WeightedDistance,
    leaf_size: usize,
    root: Option<Node>,
}

impl KdTree {
    /// A tree with no points. Every search on it returns nothing.
    pub fn empty(dimension: usize, distance: WeightedDistance) -> Self {
        Self {
            dimension,
            points: Vec::new(),
            categories: Vec::new(),
            distance,
            leaf_size: DEFAULT_LEAF_SIZE,
            root: None,
        }
    }

    /// Build a tree over a row-major `N x dimension` matrix.
    pub fn build(
        dimension: usize,
        points: Vec<f32>,
        categories: Vec<CategoryMask>,
        distance: WeightedDistance,
        leaf_size: usize,
    ) -> MotionResult<Self> {
        let count = categories.len();
        if points.len() != count * dimension {
            return Err(MotionError::DimensionMismatch {
                expected: count * dimension,
                got: points.len(),
            });
        }
        if leaf_size == 0 {
            return Err(MotionError::InvalidConfig(
                "leaf_size must be at least 1".to_string(),
            ));
        }

        let mut tree = Self {
            dimension,
            points,
            categories,
            distance,
            leaf_size,
            root: None,
        };
        if count > 0 && dimension > 0 {
            let mut rows: Vec<u32> = (0..count as u32).collect();
            tree.root = Some(tree.build_node(&mut rows));
        }
        Ok(tree)
    }

    #[inline]
    fn point(&self, row: u32) -> &[f32] {
        let start = row as usize * self.dimension;
        &self.points[start..start + self.dimension]
    }

    fn bounds(&self, rows: &[u32]) -> (Vec<f32>, Vec<f32>) {
        let mut lo = vec![f32::INFINITY; self.dimension];
        let mut hi = vec![f32::NEG_INFINITY; self.dimension];
        for &row in rows {
            for (dim, &x) in self.point(row).iter().enumerate() {
                lo[dim] = lo[dim].min(x);
                hi[dim] = hi[dim].max(x);
            }
        }
        (lo, hi)
    }

    fn build_node(&self, rows: &mut [u32]) -> Node {
        let (lo, hi) = self.bounds(rows);

        let (axis, spread) = lo
            .iter()
            .zip(&hi)
            .map(|(l, h)| h - l)
            .enumerate()
            .fold((0, 0.0f32), |best, (dim, spread)| {
                if spread > best.1 {
                    (dim, spread)
                } else {
                    best
                }
            });

        if rows.len() <= self.leaf_size || spread <= 0.0 {
            return Node {
                lo,
                hi,
                kind: NodeKind::Leaf {
                    rows: rows.to_vec(),
                },
            };
        }

        let mid = rows.len() / 2;
        rows.select_nth_unstable_by(mid, |&a, &b| {
            self.point(a)[axis]
                .total_cmp(&self.point(b)[axis])
                .then(a.cmp(&b))
        });
        let (left_rows, right_rows) = rows.split_at_mut(mid);
        let left = self.build_node(left_rows);
        let right = self.build_node(right_rows);

        Node {
            lo,
            hi,
            kind: NodeKind::Split {
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    /// Number of indexed rows.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Whether the tree indexes no row.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Coordinate dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Leaf bucket size the tree was built with.
    pub fn leaf_size(&self) -> usize {
        self.leaf_size
    }

    /// The weighted metric used for search.
    pub fn distance(&self) -> &WeightedDistance {
        &self.distance
    }

    /// Replace the weighted metric. The tree structure does not depend on it.
    pub fn set_distance(&mut self, distance: WeightedDistance) {
        self.distance = distance;
    }

    /// Switch the metric, keeping the weights.
    pub fn set_metric(&mut self, metric: DistanceMetric) {
        self.distance.metric = metric;
    }

    /// Replace the weights, keeping the metric.
    pub fn set_weights(&mut self, weights: Vec<f32>) {
        self.distance.weights = weights;
    }

    /// The `k` rows nearest to `query`, ascending by distance.
    ///
    /// Ties are broken by row index, so the result is fully determined by
    /// the data. With a filter, only rows it accepts are considered; fewer
    /// than `k` hits come back when fewer rows pass.
    pub fn k_nearest(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&CategoryFilter>,
    ) -> MotionResult<Vec<Neighbor>> {
        let root = match &self.root {
            Some(root) => root,
            None => return Ok(Vec::new()),
        };
        if query.len() != self.dimension {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let filter = filter.filter(|f| !f.is_unfiltered());
        let mut heap = BinaryHeap::with_capacity(k.min(self.len()) + 1);
        self.search(root, query, k, filter, &mut heap);
        Ok(heap.into_sorted_vec())
    }

    fn search(
        &self,
        node: &Node,
        query: &[f32],
        k: usize,
        filter: Option<&CategoryFilter>,
        heap: &mut BinaryHeap<Neighbor>,
    ) {
        match &node.kind {
            NodeKind::Leaf { rows } => {
                for &row in rows {
                    if let Some(filter) = filter {
                        if !filter.accepts(self.categories[row as usize]) {
                            continue;
                        }
                    }
                    let candidate = Neighbor {
                        row: row as usize,
                        distance: self.distance.distance(self.point(row), query),
                    };
                    if heap.len() < k {
                        heap.push(candidate);
                    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                        heap.pop();
                        heap.push(candidate);
                    }
                }
            }
            NodeKind::Split { left, right } => {
                let left_bound = self.distance.box_lower_bound(query, &left.lo, &left.hi);
                let right_bound = self.distance.box_lower_bound(query, &right.lo, &right.hi);
                let (near, near_bound, far, far_bound) = if right_bound < left_bound {
                    (right, right_bound, left, left_bound)
                } else {
                    (left, left_bound, right, right_bound)
                };
                if self.worth_visiting(near_bound, k, heap) {
                    self.search(near, query, k, filter, heap);
                }
                if self.worth_visiting(far_bound, k, heap) {
                    self.search(far, query, k, filter, heap);
                }
            }
        }
    }

    #[inline]
    fn worth_visiting(&self, bound: f32, k: usize, heap: &BinaryHeap<Neighbor>) -> bool {
        if heap.len() < k {
            return true;
        }
        heap.peek().map_or(true, |worst| bound <= worst.distance)
    }
}
