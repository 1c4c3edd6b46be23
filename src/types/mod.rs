//! All data types for the motion matching library.

pub mod category;
pub mod clip;
pub mod error;
pub mod header;

pub use category::{CategoryFilter, CategoryMask};
pub use clip::{AnimationClip, CategoryTrack, ChannelTrack, ClipLibrary};
pub use error::{MotionError, MotionResult};
pub use header::{FileHeader, HEADER_SIZE};

/// Magic bytes at the start of every .mmdb file.
pub const MMDB_MAGIC: [u8; 4] = [0x4D, 0x4D, 0x44, 0x42]; // "MMDB"

/// Current format version.
pub const FORMAT_VERSION: u32 = 1;

/// Ordered per-dimension values of one pose or query.
pub type FeatureVector = Vec<f32>;

/// Seconds between two baked samples.
pub const DEFAULT_SAMPLE_INTERVAL: f32 = 0.1;

/// Seconds dropped at the end of a non-looping clip.
pub const DEFAULT_TAIL_TRIM: f32 = 0.2;

/// Time step handed to providers that need a delta during a live query.
pub const DEFAULT_QUERY_DT: f32 = 1.0 / 60.0;

/// Category bit that marks a sample as discarded during baking.
pub const DEFAULT_DISCARD_BIT: u32 = 31;

/// Minimum number of density histogram bins.
pub const MIN_HISTOGRAM_BINS: usize = 10;

/// Returns the current time as Unix epoch microseconds.
pub fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros() as u64
}
