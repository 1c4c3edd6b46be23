//! The motion matcher: owns the providers and the installed snapshot.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::config::MatcherConfig;
use crate::features::{build_providers, total_dimension, Blackboard, CharacterContext, FeatureProvider};
use crate::format::{MmdbReader, MmdbWriter};
use crate::index::DistanceMetric;
use crate::types::{CategoryFilter, CategoryMask, ClipLibrary, MotionError, MotionResult};

use super::bake::{BakeEngine, MatchSnapshot};
use super::query::{QueryEngine, QueryParams, QueryResult, RawHit};
use super::sampler::BakeReport;
use super::weights::compute_weights;

/// Bakes clip libraries and answers live pose queries.
///
/// The baked state lives in an `Arc<MatchSnapshot>`. A bake builds a new
/// snapshot and swaps it in only when every step succeeded; clones handed
/// out by [`snapshot`](Self::snapshot) stay valid and can be queried from
/// other threads through [`QueryEngine`].
pub struct MotionMatcher {
    config: MatcherConfig,
    providers: Vec<Box<dyn FeatureProvider>>,
    context: Option<CharacterContext>,
    blackboard: Blackboard,
    snapshot: Arc<MatchSnapshot>,
    engine: QueryEngine,
}

impl MotionMatcher {
    /// Create a matcher with no providers.
    pub fn new(config: MatcherConfig) -> Self {
        let snapshot = Arc::new(MatchSnapshot::empty(0, config.metric));
        Self {
            config,
            providers: Vec::new(),
            context: None,
            blackboard: Blackboard::new(),
            snapshot,
            engine: QueryEngine::new(),
        }
    }

    /// Create a matcher with the built-in providers declared in `config`.
    pub fn from_config(config: MatcherConfig) -> MotionResult<Self> {
        config.validate()?;
        let providers = build_providers(&config.providers);
        let mut matcher = Self::new(config);
        matcher.providers = providers;
        Ok(matcher)
    }

    /// Append a provider. Unbinds the matcher: call [`setup`](Self::setup) again.
    pub fn add_provider(&mut self, provider: Box<dyn FeatureProvider>) {
        self.providers.push(provider);
        self.context = None;
    }

    /// Bind every provider to `context`.
    pub fn setup(&mut self, context: CharacterContext) -> MotionResult<()> {
        if self.providers.is_empty() {
            return Err(MotionError::NoProviders);
        }
        for provider in &mut self.providers {
            provider.setup(&context)?;
        }
        log::info!(
            "Bound {} providers to {:?} (dimension {})",
            self.providers.len(),
            context.name,
            self.dimension()
        );
        self.context = Some(context);
        Ok(())
    }

    fn ensure_ready(&self) -> MotionResult<()> {
        if self.providers.is_empty() {
            return Err(MotionError::NoProviders);
        }
        if self.context.is_none() {
            return Err(MotionError::ContextUnbound);
        }
        Ok(())
    }

    /// Current configuration.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Sum of provider dimensions.
    pub fn dimension(&self) -> usize {
        total_dimension(&self.providers)
    }

    /// Number of registered providers.
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Runtime state read by providers during [`query_pose`](Self::query_pose).
    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    /// Mutable runtime state.
    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// The installed snapshot.
    pub fn snapshot(&self) -> Arc<MatchSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Bake `library`, replacing the installed snapshot on success.
    pub fn bake(&mut self, library: &ClipLibrary) -> MotionResult<BakeReport> {
        self.bake_inner(library, None)
    }

    /// Like [`bake`](Self::bake), but stops between clips once `cancel` is set.
    pub fn bake_with_cancel(
        &mut self,
        library: &ClipLibrary,
        cancel: &AtomicBool,
    ) -> MotionResult<BakeReport> {
        self.bake_inner(library, Some(cancel))
    }

    fn bake_inner(
        &mut self,
        library: &ClipLibrary,
        cancel: Option<&AtomicBool>,
    ) -> MotionResult<BakeReport> {
        self.ensure_ready()?;
        let (snapshot, report) =
            BakeEngine::new(&self.config).bake(&mut self.providers, library, cancel)?;
        self.snapshot = Arc::new(snapshot);
        Ok(report)
    }

    /// Install a previously baked snapshot.
    ///
    /// Its dimension must match the providers when any are registered.
    pub fn install(&mut self, snapshot: MatchSnapshot) -> MotionResult<()> {
        if !self.providers.is_empty() && snapshot.dimension() != self.dimension() {
            return Err(MotionError::DimensionMismatch {
                expected: self.dimension(),
                got: snapshot.dimension(),
            });
        }
        self.config.metric = snapshot.metric();
        self.snapshot = Arc::new(snapshot);
        Ok(())
    }

    /// Recompute weights from the current provider hints and install them.
    pub fn recalculate_weights(&mut self) -> MotionResult<Vec<f32>> {
        if self.providers.is_empty() {
            return Err(MotionError::NoProviders);
        }
        let weights = compute_weights(&self.providers)?;
        // nothing baked yet: the next bake picks the hints up itself
        if !self.snapshot.is_empty() || self.snapshot.dimension() == weights.len() {
            Arc::make_mut(&mut self.snapshot).set_weights(weights.clone())?;
        }
        Ok(weights)
    }

    /// Switch the search metric without rebaking.
    pub fn set_metric(&mut self, metric: DistanceMetric) {
        self.config.metric = metric;
        Arc::make_mut(&mut self.snapshot).set_metric(metric);
        log::info!("Distance metric set to {metric}");
    }

    /// Forward a simulation step to every provider.
    pub fn tick(&mut self, dt: f32) {
        for provider in &mut self.providers {
            provider.per_tick_update(dt);
        }
    }

    /// Assemble the live query vector from the providers.
    pub fn live_features(&mut self) -> MotionResult<Vec<f32>> {
        self.ensure_ready()?;
        let dt = self.config.query_dt;
        let mut query = Vec::with_capacity(self.dimension());
        for provider in &mut self.providers {
            let values = provider.sample_live(&self.blackboard, dt);
            if values.len() != provider.dimension() {
                return Err(MotionError::DimensionMismatch {
                    expected: provider.dimension(),
                    got: values.len(),
                });
            }
            query.extend_from_slice(&values);
        }
        Ok(query)
    }

    /// Best matches for the live state, `config.results` of them.
    pub fn query_pose(
        &mut self,
        include: CategoryMask,
        exclude: CategoryMask,
    ) -> MotionResult<Vec<QueryResult>> {
        let k = self.config.results;
        self.query_pose_k(include, exclude, k)
    }

    /// Up to `k` matches for the live state.
    pub fn query_pose_k(
        &mut self,
        include: CategoryMask,
        exclude: CategoryMask,
        k: usize,
    ) -> MotionResult<Vec<QueryResult>> {
        let raw = self.live_features()?;
        if self.snapshot.is_empty() {
            return Ok(Vec::new());
        }
        let query = self.snapshot.database.stats().normalize(&raw)?;
        let params = QueryParams::filtered(include, exclude).with_max_results(k);
        self.engine.search(&self.snapshot, &query, &params)
    }

    /// Search the installed index directly with an already-normalized vector.
    pub fn search_raw(
        &self,
        query: &[f32],
        k: usize,
        filter: Option<&CategoryFilter>,
    ) -> MotionResult<Vec<RawHit>> {
        self.engine.search_raw(&self.snapshot, query, k, filter)
    }

    /// Write the installed snapshot to an .mmdb file.
    pub fn save(&self, path: &Path) -> MotionResult<()> {
        MmdbWriter::new().write_to_file(&self.snapshot, path)
    }

    /// Load an .mmdb file and [`install`](Self::install) it.
    pub fn load(&mut self, path: &Path) -> MotionResult<()> {
        let snapshot = MmdbReader::read_from_file(path, self.config.leaf_size)?;
        self.install(snapshot)
    }
}
