//! Bake engine: clips + providers -> a fresh, immutable match snapshot.

use std::sync::atomic::AtomicBool;
use std::time::Instant;

use crate::config::MatcherConfig;
use crate::database::PoseDatabase;
use crate::features::{total_dimension, FeatureProvider};
use crate::index::{DistanceMetric, KdTree, WeightedDistance};
use crate::types::{now_micros, ClipLibrary, MotionError, MotionResult};

use super::sampler::{BakeReport, SampleCollector};
use super::weights::compute_weights;

/// Everything a query needs, produced together by one bake.
///
/// The tree, the weights and the database always come from the same bake,
/// so queries never mix statistics from different bakes.
#[derive(Debug, Clone)]
pub struct MatchSnapshot {
    pub database: PoseDatabase,
    pub weights: Vec<f32>,
    pub index: KdTree,
    /// Bake time, Unix epoch microseconds (0 for the initial empty snapshot).
    pub baked_at: u64,
}

impl MatchSnapshot {
    /// Snapshot with no poses.
    pub fn empty(dimension: usize, metric: DistanceMetric) -> Self {
        Self {
            database: PoseDatabase::empty(dimension),
            weights: Vec::new(),
            index: KdTree::empty(dimension, WeightedDistance::uniform(metric)),
            baked_at: 0,
        }
    }

    /// Index `database` with the given weights and metric.
    pub fn from_database(
        database: PoseDatabase,
        weights: Vec<f32>,
        metric: DistanceMetric,
        leaf_size: usize,
        baked_at: u64,
    ) -> MotionResult<Self> {
        if !weights.is_empty() && weights.len() != database.dimension() {
            return Err(MotionError::DimensionMismatch {
                expected: database.dimension(),
                got: weights.len(),
            });
        }
        let index = KdTree::build(
            database.dimension(),
            database.poses().to_vec(),
            database.categories().to_vec(),
            WeightedDistance::new(metric, weights.clone()),
            leaf_size,
        )?;
        Ok(Self {
            database,
            weights,
            index,
            baked_at,
        })
    }

    /// Feature dimension of the snapshot.
    pub fn dimension(&self) -> usize {
        self.database.dimension()
    }

    /// Metric currently used for search.
    pub fn metric(&self) -> DistanceMetric {
        self.index.distance().metric
    }

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.database.len()
    }

    /// Whether the snapshot holds no pose.
    pub fn is_empty(&self) -> bool {
        self.database.is_empty()
    }

    /// Install new weights in both the snapshot and its index.
    pub fn set_weights(&mut self, weights: Vec<f32>) -> MotionResult<()> {
        if !weights.is_empty() && weights.len() != self.dimension() {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimension(),
                got: weights.len(),
            });
        }
        self.index.set_weights(weights.clone());
        self.weights = weights;
        Ok(())
    }

    /// Switch the search metric.
    pub fn set_metric(&mut self, metric: DistanceMetric) {
        self.index.set_metric(metric);
    }
}

/// Runs the full offline pipeline.
pub struct BakeEngine<'a> {
    config: &'a MatcherConfig,
}

impl<'a> BakeEngine<'a> {
    /// Create a bake engine for `config`.
    pub fn new(config: &'a MatcherConfig) -> Self {
        Self { config }
    }

    /// Sample, compute stats, normalize, weigh and index.
    ///
    /// Nothing outside the returned snapshot is touched, so a failure at any
    /// step leaves the caller's current snapshot as it was.
    pub fn bake(
        &self,
        providers: &mut [Box<dyn FeatureProvider>],
        library: &ClipLibrary,
        cancel: Option<&AtomicBool>,
    ) -> MotionResult<(MatchSnapshot, BakeReport)> {
        if providers.is_empty() {
            return Err(MotionError::NoProviders);
        }
        self.config.validate()?;
        let started = Instant::now();
        let dimension = total_dimension(providers);
        let weights = compute_weights(providers)?;
        log::info!(
            "Baking {} clips with {} providers, dimension {}",
            library.len(),
            providers.len(),
            dimension
        );

        let mut collector = SampleCollector::new(self.config);
        if let Some(flag) = cancel {
            collector = collector.with_cancel(flag);
        }
        let collected = collector.collect(providers, library)?;
        let mut report = collected.report;

        let (stats, floored) = collected.stats.finish();
        if !collected.builder.is_empty() {
            for &dim in &floored {
                log::warn!("Dimension {dim} is constant, variance floored to 1.0");
            }
        }
        report.floored_dimensions = floored;

        let database = collected.builder.build(stats, library.names())?;
        let snapshot = MatchSnapshot::from_database(
            database,
            weights,
            self.config.metric,
            self.config.leaf_size,
            now_micros(),
        )?;

        report.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        log::info!(
            "Baked {} poses ({} discarded, {} dropped) in {:.2} ms",
            report.poses,
            report.discarded,
            report.dropped,
            report.elapsed_ms
        );
        Ok((snapshot, report))
    }
}
