//! Declarative provider configuration and the registry of built-in variants.

use serde::{Deserialize, Serialize};

use super::{ChannelFeature, FeatureProvider, VelocityFeature};

/// A built-in provider declaration, as written in the matcher config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Raw channel values.
    Channel {
        name: String,
        channel: String,
        dimension: usize,
        #[serde(default)]
        weights: Vec<f32>,
        #[serde(default)]
        scale_by_motion: bool,
    },
    /// Channel rate of change.
    Velocity {
        name: String,
        channel: String,
        dimension: usize,
        #[serde(default)]
        weights: Vec<f32>,
    },
}

impl ProviderConfig {
    /// Channel provider with uniform weights.
    pub fn channel(name: &str, channel: &str, dimension: usize) -> Self {
        Self::Channel {
            name: name.to_string(),
            channel: channel.to_string(),
            dimension,
            weights: Vec::new(),
            scale_by_motion: false,
        }
    }

    /// Velocity provider with uniform weights.
    pub fn velocity(name: &str, channel: &str, dimension: usize) -> Self {
        Self::Velocity {
            name: name.to_string(),
            channel: channel.to_string(),
            dimension,
            weights: Vec::new(),
        }
    }

    /// The provider's declared name.
    pub fn name(&self) -> &str {
        match self {
            Self::Channel { name, .. } | Self::Velocity { name, .. } => name,
        }
    }
}

/// Instantiate one provider from its declaration.
pub fn build_provider(config: &ProviderConfig) -> Box<dyn FeatureProvider> {
    match config {
        ProviderConfig::Channel {
            name,
            channel,
            dimension,
            weights,
            scale_by_motion,
        } => Box::new(
            ChannelFeature::new(name.as_str(), channel.as_str(), *dimension, weights.clone())
                .scaled_by_motion(*scale_by_motion),
        ),
        ProviderConfig::Velocity {
            name,
            channel,
            dimension,
            weights,
        } => Box::new(VelocityFeature::new(
            name.as_str(),
            channel.as_str(),
            *dimension,
            weights.clone(),
        )),
    }
}

/// Instantiate providers in declaration order.
pub fn build_providers(configs: &[ProviderConfig]) -> Vec<Box<dyn FeatureProvider>> {
    configs.iter().map(build_provider).collect()
}
