//! Motion matching: bake animation clips into a normalized pose database and
//! search it for the pose closest to a live character state.
//!
//! Baking samples every clip through pluggable feature providers, computes
//! per-dimension statistics, normalizes the rows and indexes them in a k-d
//! tree. Queries build the same feature vector from runtime state and return
//! the best matching clip and time, optionally filtered by category masks.

pub mod cli;
pub mod config;
pub mod database;
pub mod engine;
pub mod features;
pub mod format;
pub mod index;
pub mod stats;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::MatcherConfig;
pub use database::{PoseDatabase, PoseDatabaseBuilder, PoseRecord};
pub use engine::{
    BakeEngine, BakeReport, ClipReport, MatchSnapshot, MotionMatcher, QueryEngine, QueryParams,
    QueryResult, RawHit, SampleCollector,
};
pub use features::{
    build_provider, build_providers, Blackboard, ChannelFeature, CharacterContext,
    FeatureProvider, ProviderConfig, VelocityFeature,
};
pub use format::{MmdbReader, MmdbWriter};
pub use index::{DistanceMetric, KdTree, Neighbor, WeightedDistance};
pub use stats::{DatasetStats, StatsAccumulator};
pub use types::{
    now_micros, AnimationClip, CategoryFilter, CategoryMask, ClipLibrary, FeatureVector,
    FileHeader, MotionError, MotionResult,
};
