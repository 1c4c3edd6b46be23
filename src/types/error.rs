//! Error types for the motion matching library.

use thiserror::Error;

/// All errors that can occur in the motion matching library.
#[derive(Error, Debug)]
pub enum MotionError {
    /// Baking or querying was requested with no feature providers.
    #[error("No feature providers configured")]
    NoProviders,

    /// Providers were never bound to a character context.
    #[error("Feature providers are not bound to a character context")]
    ContextUnbound,

    /// A clip carries none of the configured category tracks.
    #[error("Clip {clip:?} has none of the category tracks {tracks:?}")]
    MissingCategoryTrack { clip: String, tracks: Vec<String> },

    /// Feature vector dimension mismatch.
    #[error("Feature vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A provider's weight hint does not cover its declared dimension.
    #[error("Provider {provider:?} returned {got} weight hints for {expected} dimensions")]
    WeightHintMismatch {
        provider: String,
        expected: usize,
        got: usize,
    },

    /// Unknown distance metric selector.
    #[error("Invalid distance metric selector: {0}")]
    InvalidMetric(u8),

    /// Configuration rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Bake stopped through its cancellation flag.
    #[error("Bake cancelled")]
    Cancelled,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression error.
    #[error("Compression error: {0}")]
    Compression(String),

    /// Invalid magic bytes in file header.
    #[error("Invalid magic bytes in file header")]
    InvalidMagic,

    /// Unsupported format version.
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// File is empty or truncated.
    #[error("File is empty or truncated")]
    Truncated,

    /// Corrupt data at a given offset.
    #[error("Corrupt data at offset {0}")]
    Corrupt(u64),
}

/// Convenience result type for motion matching operations.
pub type MotionResult<T> = Result<T, MotionError>;
