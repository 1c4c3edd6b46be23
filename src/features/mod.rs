//! Feature providers: the pluggable extractors that turn a clip sample or a
//! live character state into a fixed-width slice of the pose vector.

pub mod channel;
pub mod registry;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AnimationClip, FeatureVector, MotionResult};

pub use channel::{ChannelFeature, VelocityFeature};
pub use registry::{build_provider, build_providers, ProviderConfig};

/// The character a set of providers is bound to.
///
/// Carries no engine types; hosts fill it from whatever scene they own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterContext {
    /// Character identifier, used in log output.
    pub name: String,
    /// Skeleton motion scale applied to positional channels at bake time.
    pub motion_scale: f32,
}

impl CharacterContext {
    /// Create a context with unit motion scale.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            motion_scale: 1.0,
        }
    }

    /// Set the motion scale.
    pub fn with_motion_scale(mut self, scale: f32) -> Self {
        self.motion_scale = scale;
        self
    }
}

impl Default for CharacterContext {
    fn default() -> Self {
        Self::new("character")
    }
}

/// Named runtime values handed to providers during a live query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blackboard {
    values: BTreeMap<String, Vec<f32>>,
}

impl Blackboard {
    /// Create an empty blackboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an entry, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<f32>) {
        self.values.insert(key.into(), values);
    }

    /// Read an entry.
    pub fn get(&self, key: &str) -> Option<&[f32]> {
        self.values.get(key).map(|v| v.as_slice())
    }

    /// Remove an entry.
    pub fn remove(&mut self, key: &str) -> Option<Vec<f32>> {
        self.values.remove(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the blackboard is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Capability set every feature extractor implements.
///
/// `dimension()` must stay fixed for the provider's lifetime; every vector
/// returned by `sample_at` / `sample_live` is expected to have exactly that
/// many elements. Wrong-length output is dropped at bake time and rejected
/// at query time.
pub trait FeatureProvider: Send {
    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// Declared vector width.
    fn dimension(&self) -> usize;

    /// One-time binding to a character, before any extraction.
    fn setup(&mut self, _context: &CharacterContext) -> MotionResult<()> {
        Ok(())
    }

    /// Called once per clip before it is sampled.
    fn prepare_for_clip(&mut self, _clip: &AnimationClip) {}

    /// Offline extraction at `time` seconds into `clip`.
    fn sample_at(&mut self, clip: &AnimationClip, time: f32) -> FeatureVector;

    /// Online extraction from the live state; `dt` is the per-query time budget.
    fn sample_live(&mut self, state: &Blackboard, dt: f32) -> FeatureVector;

    /// Per-dimension importance hints, `dimension()` long.
    fn weight_hint(&self) -> Vec<f32>;

    /// Called once per simulation step.
    fn per_tick_update(&mut self, _dt: f32) {}
}

/// Sum of the declared dimensions of `providers`.
pub fn total_dimension(providers: &[Box<dyn FeatureProvider>]) -> usize {
    providers.iter().map(|p| p.dimension()).sum()
}
