//! Animation clips and the clip library that baking iterates.
//!
//! A clip carries two kinds of keyed data: category tracks (integer bitmasks,
//! each key held until the next one) and numeric channels (vectors, evaluated
//! with linear interpolation). Feature providers read channels; the sample
//! collector reads category tracks.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::category::CategoryMask;
use crate::types::error::MotionResult;

/// Discrete category keys `(time, mask)`, sorted by time.
///
/// Deserialized keys go through [`CategoryTrack::new`], so file order does not matter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(f32, CategoryMask)>", into = "Vec<(f32, CategoryMask)>")]
pub struct CategoryTrack {
    pub keys: Vec<(f32, CategoryMask)>,
}

impl CategoryTrack {
    /// Create a track, sorting the keys by time.
    pub fn new(mut keys: Vec<(f32, CategoryMask)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    /// Value of the last key at or before `time`; the first key before that.
    pub fn value_at(&self, time: f32) -> Option<CategoryMask> {
        let after = self.keys.partition_point(|&(t, _)| t <= time);
        match after {
            0 => self.keys.first().map(|&(_, v)| v),
            n => Some(self.keys[n - 1].1),
        }
    }
}

impl From<Vec<(f32, CategoryMask)>> for CategoryTrack {
    fn from(keys: Vec<(f32, CategoryMask)>) -> Self {
        Self::new(keys)
    }
}

impl From<CategoryTrack> for Vec<(f32, CategoryMask)> {
    fn from(track: CategoryTrack) -> Self {
        track.keys
    }
}

/// Numeric vector keys `(time, values)`, sorted by time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(f32, Vec<f32>)>", into = "Vec<(f32, Vec<f32>)>")]
pub struct ChannelTrack {
    pub keys: Vec<(f32, Vec<f32>)>,
}

impl ChannelTrack {
    /// Create a channel, sorting the keys by time.
    pub fn new(mut keys: Vec<(f32, Vec<f32>)>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { keys }
    }

    /// Linearly interpolated value at `time`, clamped to the first and last key.
    pub fn value_at(&self, time: f32) -> Option<Vec<f32>> {
        let after = self.keys.partition_point(|(t, _)| *t <= time);
        if after == 0 {
            return self.keys.first().map(|(_, v)| v.clone());
        }
        if after == self.keys.len() {
            return self.keys.last().map(|(_, v)| v.clone());
        }
        let (t0, v0) = &self.keys[after - 1];
        let (t1, v1) = &self.keys[after];
        let span = t1 - t0;
        if span <= 0.0 {
            return Some(v1.clone());
        }
        let c = (time - t0) / span;
        Some(
            v0.iter()
                .zip(v1.iter())
                .map(|(a, b)| a + (b - a) * c)
                .collect(),
        )
    }
}

impl From<Vec<(f32, Vec<f32>)>> for ChannelTrack {
    fn from(keys: Vec<(f32, Vec<f32>)>) -> Self {
        Self::new(keys)
    }
}

impl From<ChannelTrack> for Vec<(f32, Vec<f32>)> {
    fn from(track: ChannelTrack) -> Self {
        track.keys
    }
}

/// One animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    /// Clip name, reported back by queries.
    pub name: String,
    /// Length in seconds.
    pub length: f32,
    /// Looping clips are sampled up to their full length.
    #[serde(default)]
    pub looping: bool,
    /// Category tracks by name.
    #[serde(default)]
    pub categories: BTreeMap<String, CategoryTrack>,
    /// Numeric channels by name.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelTrack>,
}

impl AnimationClip {
    /// Create an empty clip.
    pub fn new(name: impl Into<String>, length: f32, looping: bool) -> Self {
        Self {
            name: name.into(),
            length,
            looping,
            categories: BTreeMap::new(),
            channels: BTreeMap::new(),
        }
    }

    /// Attach a category track.
    pub fn with_category_track(
        mut self,
        name: impl Into<String>,
        keys: Vec<(f32, CategoryMask)>,
    ) -> Self {
        self.categories.insert(name.into(), CategoryTrack::new(keys));
        self
    }

    /// Attach a numeric channel.
    pub fn with_channel(mut self, name: impl Into<String>, keys: Vec<(f32, Vec<f32>)>) -> Self {
        self.channels.insert(name.into(), ChannelTrack::new(keys));
        self
    }

    /// Evaluate a category track at `time`.
    pub fn category_at(&self, track: &str, time: f32) -> Option<CategoryMask> {
        self.categories.get(track).and_then(|t| t.value_at(time))
    }

    /// Evaluate a numeric channel at `time`.
    pub fn channel_at(&self, channel: &str, time: f32) -> Option<Vec<f32>> {
        self.channels.get(channel).and_then(|c| c.value_at(time))
    }

    /// Exclusive upper bound for sample times.
    pub fn sample_end(&self, tail_trim: f32) -> f32 {
        if self.looping {
            self.length
        } else {
            self.length - tail_trim
        }
    }
}

/// Ordered collection of clips. A clip's position is its clip index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipLibrary {
    pub clips: Vec<AnimationClip>,
}

impl ClipLibrary {
    /// Create an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clip, returning its index.
    pub fn add(&mut self, clip: AnimationClip) -> usize {
        self.clips.push(clip);
        self.clips.len() - 1
    }

    /// Number of clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether the library has no clips.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Clip names in index order.
    pub fn names(&self) -> Vec<String> {
        self.clips.iter().map(|c| c.name.clone()).collect()
    }

    /// Parse a library from JSON text.
    pub fn from_json_str(json: &str) -> MotionResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a library from a JSON file.
    pub fn from_json_file(path: &Path) -> MotionResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
