//! Sample collector: walks every clip at a fixed step and gathers raw pose rows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;

use crate::config::MatcherConfig;
use crate::database::PoseDatabaseBuilder;
use crate::features::{total_dimension, FeatureProvider};
use crate::stats::StatsAccumulator;
use crate::types::category::is_discarded;
use crate::types::{AnimationClip, CategoryMask, ClipLibrary, MotionError, MotionResult};

/// Per-clip sampling counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClipReport {
    pub name: String,
    /// Rows added to the database.
    pub poses: usize,
    /// Samples skipped because of the discard bit.
    pub discarded: usize,
    /// Samples dropped because a provider returned the wrong length.
    pub dropped: usize,
}

/// Summary of one bake.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BakeReport {
    pub dimension: usize,
    pub poses: usize,
    pub discarded: usize,
    pub dropped: usize,
    pub clips: Vec<ClipReport>,
    /// Dimensions whose variance was floored.
    pub floored_dimensions: Vec<usize>,
    pub elapsed_ms: f64,
}

/// Raw rows plus the streaming statistics gathered while collecting them.
pub struct CollectedSamples {
    pub builder: PoseDatabaseBuilder,
    pub stats: StatsAccumulator,
    pub report: BakeReport,
}

/// Iterates clips and invokes providers for every kept timestep.
pub struct SampleCollector<'a> {
    config: &'a MatcherConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> SampleCollector<'a> {
    /// Create a collector for the given settings.
    pub fn new(config: &'a MatcherConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Check `flag` between clips and stop with [`MotionError::Cancelled`] once it is set.
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Timesteps sampled for `clip`: `interval, 2*interval, ...` strictly below the sample end.
    pub fn sample_times(&self, clip: &AnimationClip) -> Vec<f32> {
        let end = clip.sample_end(self.config.tail_trim);
        let interval = self.config.sample_interval;
        let mut times = Vec::new();
        if interval.is_nan() || interval <= 0.0 {
            return times;
        }
        // multiply instead of accumulating so late samples do not drift
        let mut step = 1u32;
        let mut t = interval;
        while t < end {
            times.push(t);
            step += 1;
            t = step as f32 * interval;
        }
        times
    }

    /// Category mask of `clip` at `time`: the OR of every configured track it carries.
    pub fn category_at(&self, clip: &AnimationClip, time: f32) -> MotionResult<CategoryMask> {
        let tracks = &self.config.category_tracks;
        if tracks.is_empty() {
            return Ok(0);
        }
        let mut found = false;
        let mut mask = 0;
        for track in tracks {
            if clip.categories.contains_key(track) {
                found = true;
                mask |= clip.category_at(track, time).unwrap_or(0);
            }
        }
        if !found {
            return Err(MotionError::MissingCategoryTrack {
                clip: clip.name.clone(),
                tracks: tracks.clone(),
            });
        }
        Ok(mask)
    }

    /// Sample every clip of `library`.
    pub fn collect(
        &self,
        providers: &mut [Box<dyn FeatureProvider>],
        library: &ClipLibrary,
    ) -> MotionResult<CollectedSamples> {
        let started = Instant::now();
        let dimension = total_dimension(providers);
        let mut builder = PoseDatabaseBuilder::new(dimension);
        let mut stats = StatsAccumulator::new(
            dimension,
            self.config.histogram_bins,
            self.config.histogram_cache,
        );
        let mut report = BakeReport {
            dimension,
            ..BakeReport::default()
        };

        let mut row = Vec::with_capacity(dimension);
        for (clip_index, clip) in library.clips.iter().enumerate() {
            if self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                log::info!("Bake cancelled before clip {:?}", clip.name);
                return Err(MotionError::Cancelled);
            }

            let clip_started = Instant::now();
            let mut clip_report = ClipReport {
                name: clip.name.clone(),
                ..ClipReport::default()
            };
            for provider in providers.iter_mut() {
                provider.prepare_for_clip(clip);
            }

            for t in self.sample_times(clip) {
                let category = self.category_at(clip, t)?;
                if is_discarded(category, self.config.discard_bit) {
                    clip_report.discarded += 1;
                    continue;
                }

                row.clear();
                let mut complete = true;
                for provider in providers.iter_mut() {
                    let values = provider.sample_at(clip, t);
                    if values.len() != provider.dimension() {
                        log::warn!(
                            "Provider {:?} returned {} values for {} dimensions at {:?}@{t:.3}s, sample dropped",
                            provider.name(),
                            values.len(),
                            provider.dimension(),
                            clip.name
                        );
                        complete = false;
                        break;
                    }
                    row.extend_from_slice(&values);
                }
                if !complete {
                    clip_report.dropped += 1;
                    continue;
                }

                builder.push(clip_index as u32, t, category, &row)?;
                stats.push(&row)?;
                clip_report.poses += 1;
            }

            log::info!(
                "Clip {:?}: {} poses ({} discarded, {} dropped) in {:.2} ms",
                clip.name,
                clip_report.poses,
                clip_report.discarded,
                clip_report.dropped,
                clip_started.elapsed().as_secs_f64() * 1000.0
            );
            report.poses += clip_report.poses;
            report.discarded += clip_report.discarded;
            report.dropped += clip_report.dropped;
            report.clips.push(clip_report);
        }

        report.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(CollectedSamples {
            builder,
            stats,
            report,
        })
    }
}
