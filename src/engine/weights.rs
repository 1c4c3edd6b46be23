//! Weight calculator: turns provider weight hints into the per-dimension weight vector.

use crate::features::FeatureProvider;
use crate::types::{MotionError, MotionResult};

/// Normalize grouped weight hints into one weight vector.
///
/// Every hint becomes `|hint| / sum(|all hints|) / group_len`. When the
/// smallest resulting weight lies strictly between 0 and 1 the whole vector
/// is scaled so that it becomes 1. A zero (or non-finite) hint sum yields
/// uniform weights.
pub fn normalize_weight_hints(groups: &[Vec<f32>]) -> Vec<f32> {
    let dimension: usize = groups.iter().map(|g| g.len()).sum();
    let sum: f32 = groups.iter().flatten().map(|w| w.abs()).sum();
    if !sum.is_finite() || sum <= 0.0 {
        if dimension > 0 {
            log::warn!("Weight hints sum to {sum}, falling back to uniform weights");
        }
        return vec![1.0; dimension];
    }

    let mut weights = Vec::with_capacity(dimension);
    for group in groups {
        let group_len = group.len() as f32;
        weights.extend(group.iter().map(|w| w.abs() / sum / group_len));
    }

    let min = weights.iter().copied().fold(f32::INFINITY, f32::min);
    if min > 0.0 && min < 1.0 {
        let scale = 1.0 / min;
        for w in &mut weights {
            *w *= scale;
        }
    }
    weights
}

/// Collect hints from `providers` and normalize them.
pub fn compute_weights(providers: &[Box<dyn FeatureProvider>]) -> MotionResult<Vec<f32>> {
    let mut groups = Vec::with_capacity(providers.len());
    for provider in providers {
        let hint = provider.weight_hint();
        if hint.len() != provider.dimension() {
            return Err(MotionError::WeightHintMismatch {
                provider: provider.name().to_string(),
                expected: provider.dimension(),
                got: hint.len(),
            });
        }
        groups.push(hint);
    }
    Ok(normalize_weight_hints(&groups))
}
