//! High-level operations: sampling, baking, querying and the matcher facade.

pub mod bake;
pub mod matcher;
pub mod query;
pub mod sampler;
pub mod weights;

pub use bake::{BakeEngine, MatchSnapshot};
pub use matcher::MotionMatcher;
pub use query::{match_cost, QueryEngine, QueryParams, QueryResult, RawHit};
pub use sampler::{BakeReport, ClipReport, CollectedSamples, SampleCollector};
pub use weights::{compute_weights, normalize_weight_hints};
