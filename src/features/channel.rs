//! Built-in providers over named clip channels.

use crate::types::{AnimationClip, FeatureVector, MotionResult};

use super::{Blackboard, CharacterContext, FeatureProvider};

/// Finite-difference step used when baking velocities (30 Hz).
pub const VELOCITY_DELTA: f32 = 1.0 / 30.0;

fn uniform_if_empty(weights: Vec<f32>, dimension: usize) -> Vec<f32> {
    if weights.is_empty() {
        vec![1.0; dimension]
    } else {
        weights
    }
}

/// Samples a clip channel at bake time and the same-named blackboard entry at runtime.
#[derive(Debug, Clone)]
pub struct ChannelFeature {
    name: String,
    channel: String,
    dimension: usize,
    weights: Vec<f32>,
    scale_by_motion: bool,
    motion_scale: f32,
}

impl ChannelFeature {
    /// Create a channel feature. Empty `weights` means uniform hints.
    pub fn new(
        name: impl Into<String>,
        channel: impl Into<String>,
        dimension: usize,
        weights: Vec<f32>,
    ) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            dimension,
            weights: uniform_if_empty(weights, dimension),
            scale_by_motion: false,
            motion_scale: 1.0,
        }
    }

    /// Multiply baked values by the context's motion scale.
    pub fn scaled_by_motion(mut self, enabled: bool) -> Self {
        self.scale_by_motion = enabled;
        self
    }
}

impl FeatureProvider for ChannelFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn setup(&mut self, context: &CharacterContext) -> MotionResult<()> {
        self.motion_scale = if self.scale_by_motion {
            context.motion_scale
        } else {
            1.0
        };
        Ok(())
    }

    fn sample_at(&mut self, clip: &AnimationClip, time: f32) -> FeatureVector {
        let scale = self.motion_scale;
        clip.channel_at(&self.channel, time)
            .map(|v| v.into_iter().map(|x| x * scale).collect())
            .unwrap_or_default()
    }

    fn sample_live(&mut self, state: &Blackboard, _dt: f32) -> FeatureVector {
        state
            .get(&self.channel)
            .map(|v| v.to_vec())
            .unwrap_or_default()
    }

    fn weight_hint(&self) -> Vec<f32> {
        self.weights.clone()
    }
}

/// Rate of change of a channel.
///
/// Baking differences the clip channel over [`VELOCITY_DELTA`]. At runtime the
/// current blackboard value is differenced against the value seen by the
/// previous query, over the time accumulated through `per_tick_update`
/// (or the query's `dt` when no tick happened in between).
#[derive(Debug, Clone)]
pub struct VelocityFeature {
    name: String,
    channel: String,
    dimension: usize,
    weights: Vec<f32>,
    previous: Option<Vec<f32>>,
    elapsed: f32,
}

impl VelocityFeature {
    /// Create a velocity feature. Empty `weights` means uniform hints.
    pub fn new(
        name: impl Into<String>,
        channel: impl Into<String>,
        dimension: usize,
        weights: Vec<f32>,
    ) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            dimension,
            weights: uniform_if_empty(weights, dimension),
            previous: None,
            elapsed: 0.0,
        }
    }
}

impl FeatureProvider for VelocityFeature {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn setup(&mut self, _context: &CharacterContext) -> MotionResult<()> {
        self.previous = None;
        self.elapsed = 0.0;
        Ok(())
    }

    fn sample_at(&mut self, clip: &AnimationClip, time: f32) -> FeatureVector {
        let now = clip.channel_at(&self.channel, time);
        let before = clip.channel_at(&self.channel, time - VELOCITY_DELTA);
        match (now, before) {
            (Some(now), Some(before)) => now
                .iter()
                .zip(before.iter())
                .map(|(a, b)| (a - b) / VELOCITY_DELTA)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn sample_live(&mut self, state: &Blackboard, dt: f32) -> FeatureVector {
        let current = match state.get(&self.channel) {
            Some(v) => v.to_vec(),
            None => return Vec::new(),
        };
        let span = if self.elapsed > 0.0 { self.elapsed } else { dt };
        let velocity = match &self.previous {
            Some(prev) if prev.len() == current.len() && span > 0.0 => current
                .iter()
                .zip(prev.iter())
                .map(|(a, b)| (a - b) / span)
                .collect(),
            _ => vec![0.0; current.len()],
        };
        self.previous = Some(current);
        self.elapsed = 0.0;
        velocity
    }

    fn weight_hint(&self) -> Vec<f32> {
        self.weights.clone()
    }

    fn per_tick_update(&mut self, dt: f32) {
        self.elapsed += dt;
    }
}
