//! Matcher configuration with TOML persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::features::ProviderConfig;
use crate::index::{DistanceMetric, DEFAULT_LEAF_SIZE};
use crate::types::{
    MotionError, MotionResult, DEFAULT_DISCARD_BIT, DEFAULT_QUERY_DT, DEFAULT_SAMPLE_INTERVAL,
    DEFAULT_TAIL_TRIM, MIN_HISTOGRAM_BINS,
};

/// Complete matcher configuration. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Seconds between baked samples
    pub sample_interval: f32,

    /// Seconds excluded at the end of non-looping clips
    pub tail_trim: f32,

    /// Category tracks read at bake time; their values are OR-ed
    pub category_tracks: Vec<String>,

    /// Category bit that drops a sample at bake time
    pub discard_bit: u32,

    /// Distance metric for search
    pub metric: DistanceMetric,

    /// Time budget handed to providers during a live query
    pub query_dt: f32,

    /// Default number of results per query
    pub results: usize,

    /// Density histogram bins per dimension
    pub histogram_bins: usize,

    /// Samples cached before the histogram range is fixed
    pub histogram_cache: usize,

    /// k-d tree leaf bucket size
    pub leaf_size: usize,

    /// Built-in feature providers
    pub providers: Vec<ProviderConfig>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
            tail_trim: DEFAULT_TAIL_TRIM,
            category_tracks: Vec::new(),
            discard_bit: DEFAULT_DISCARD_BIT,
            metric: DistanceMetric::Manhattan,
            query_dt: DEFAULT_QUERY_DT,
            results: 1,
            histogram_bins: MIN_HISTOGRAM_BINS,
            histogram_cache: 15,
            leaf_size: DEFAULT_LEAF_SIZE,
            providers: Vec::new(),
        }
    }
}

impl MatcherConfig {
    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> MotionResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| MotionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> MotionResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML text.
    pub fn to_toml_string(&self) -> MotionResult<String> {
        toml::to_string_pretty(self).map_err(|e| MotionError::InvalidConfig(e.to_string()))
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> MotionResult<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Reject values the bake or query path cannot work with.
    pub fn validate(&self) -> MotionResult<()> {
        if !(self.sample_interval.is_finite() && self.sample_interval > 0.0) {
            return Err(MotionError::InvalidConfig(format!(
                "sample_interval must be positive, got {}",
                self.sample_interval
            )));
        }
        if !self.tail_trim.is_finite() || self.tail_trim < 0.0 {
            return Err(MotionError::InvalidConfig(format!(
                "tail_trim must be non-negative, got {}",
                self.tail_trim
            )));
        }
        if self.discard_bit > 63 {
            return Err(MotionError::InvalidConfig(format!(
                "discard_bit must be below 64, got {}",
                self.discard_bit
            )));
        }
        if !self.query_dt.is_finite() || self.query_dt < 0.0 {
            return Err(MotionError::InvalidConfig(format!(
                "query_dt must be non-negative, got {}",
                self.query_dt
            )));
        }
        if self.histogram_bins < MIN_HISTOGRAM_BINS {
            return Err(MotionError::InvalidConfig(format!(
                "histogram_bins must be at least {MIN_HISTOGRAM_BINS}, got {}",
                self.histogram_bins
            )));
        }
        if self.leaf_size == 0 {
            return Err(MotionError::InvalidConfig(
                "leaf_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
