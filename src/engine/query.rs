//! Query executor: filtered nearest-pose search over a match snapshot.

use std::time::Instant;

use serde::Serialize;

use crate::index::Neighbor;
use crate::types::{CategoryFilter, CategoryMask, MotionResult};

use super::bake::MatchSnapshot;

/// Parameters for a pose query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryParams {
    /// Category include/exclude masks.
    pub filter: CategoryFilter,
    /// Maximum number of results.
    pub max_results: usize,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            filter: CategoryFilter::ANY,
            max_results: 1,
        }
    }
}

impl QueryParams {
    /// Single best match under `filter`.
    pub fn filtered(include: CategoryMask, exclude: CategoryMask) -> Self {
        Self {
            filter: CategoryFilter::new(include, exclude),
            ..Self::default()
        }
    }

    /// Set the maximum number of results.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

/// A matched pose, as returned to animation code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Source clip name.
    pub clip_name: String,
    /// Seconds into the clip.
    pub timestamp: f32,
    /// Weighted L1 difference between query and match, lower is better.
    pub cost: f32,
}

/// A raw search hit with full provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawHit {
    pub row: usize,
    pub clip_name: String,
    pub timestamp: f32,
    pub category: CategoryMask,
    /// Distance under the index metric.
    pub distance: f32,
}

/// Weighted per-dimension absolute difference. Empty `weights` means uniform.
pub fn match_cost(weights: &[f32], candidate: &[f32], query: &[f32]) -> f32 {
    candidate
        .iter()
        .zip(query)
        .enumerate()
        .map(|(dim, (c, q))| weights.get(dim).copied().unwrap_or(1.0) * (c - q).abs())
        .sum()
}

/// Executes searches against a [`MatchSnapshot`]. Holds no state of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryEngine;

impl QueryEngine {
    /// Create a new query engine.
    pub fn new() -> Self {
        Self
    }

    /// Search with an already-normalized query vector and map hits to clips.
    ///
    /// Hits whose row or clip index no longer resolves are skipped.
    pub fn search(
        &self,
        snapshot: &MatchSnapshot,
        normalized_query: &[f32],
        params: &QueryParams,
    ) -> MotionResult<Vec<QueryResult>> {
        let started = Instant::now();
        let hits = snapshot
            .index
            .k_nearest(normalized_query, params.max_results, Some(&params.filter))?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(result) = self.resolve(snapshot, hit, normalized_query) {
                results.push(result);
            }
        }
        log::debug!(
            "Query returned {} results in {:.1} us",
            results.len(),
            started.elapsed().as_secs_f64() * 1e6
        );
        Ok(results)
    }

    fn resolve(
        &self,
        snapshot: &MatchSnapshot,
        hit: Neighbor,
        query: &[f32],
    ) -> Option<QueryResult> {
        let database = &snapshot.database;
        let Some(record) = database.record(hit.row) else {
            log::warn!("Skipping stale row {} ({} rows)", hit.row, database.len());
            return None;
        };
        let Some(clip_name) = database.clip_name(record.clip_index) else {
            log::warn!(
                "Skipping row {} with stale clip index {}",
                hit.row,
                record.clip_index
            );
            return None;
        };
        Some(QueryResult {
            clip_name: clip_name.to_string(),
            timestamp: record.timestamp,
            cost: match_cost(&snapshot.weights, record.features, query),
        })
    }

    /// Search the index directly with a caller-supplied vector, bypassing
    /// providers and normalization.
    pub fn search_raw(
        &self,
        snapshot: &MatchSnapshot,
        query: &[f32],
        k: usize,
        filter: Option<&CategoryFilter>,
    ) -> MotionResult<Vec<RawHit>> {
        let hits = snapshot.index.k_nearest(query, k, filter)?;
        let database = &snapshot.database;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let record = database.record(hit.row)?;
                Some(RawHit {
                    row: hit.row,
                    clip_name: database.clip_name(record.clip_index)?.to_string(),
                    timestamp: record.timestamp,
                    category: record.category,
                    distance: hit.distance,
                })
            })
            .collect())
    }
}
