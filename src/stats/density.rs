//! Streaming density histogram.
//!
//! The first `cache_size` samples are buffered to fix the histogram range
//! (their min and max). After that every sample lands in one of
//! `num_bins + 2` bins: an underflow bin, `num_bins` regular bins spanning
//! `[min, max)`, and an overflow bin. Memory stays constant per dimension.

/// Histogram accumulator for one dimension.
#[derive(Debug, Clone)]
pub struct DensityAccumulator {
    num_bins: usize,
    cache_size: usize,
    cache: Vec<f32>,
    bins: Vec<u64>,
    lower: f32,
    bin_size: f32,
    count: u64,
    fixed: bool,
}

impl DensityAccumulator {
    /// Create an accumulator with `num_bins` regular bins.
    pub fn new(num_bins: usize, cache_size: usize) -> Self {
        let cache_size = cache_size.max(1);
        Self {
            num_bins,
            cache_size,
            cache: Vec::with_capacity(cache_size),
            bins: Vec::new(),
            lower: 0.0,
            bin_size: 0.0,
            count: 0,
            fixed: false,
        }
    }

    /// Add a sample.
    pub fn push(&mut self, value: f32) {
        self.count += 1;
        if self.fixed {
            self.bin(value);
            return;
        }
        self.cache.push(value);
        if self.cache.len() >= self.cache_size {
            self.fix_range();
        }
    }

    /// Number of samples seen.
    pub fn count(&self) -> u64 {
        self.count
    }

    fn fix_range(&mut self) {
        let min = self.cache.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.cache.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        self.lower = min;
        self.bin_size = (max - min) / self.num_bins as f32;
        self.bins = vec![0; self.num_bins + 2];
        self.fixed = true;
        let cached = std::mem::take(&mut self.cache);
        for value in cached {
            self.bin(value);
        }
    }

    fn bin(&mut self, value: f32) {
        let overflow = self.num_bins + 1;
        let index = if value < self.lower {
            0
        } else if self.bin_size <= 0.0 {
            if value > self.lower {
                overflow
            } else {
                1
            }
        } else if value >= self.lower + self.num_bins as f32 * self.bin_size {
            overflow
        } else {
            (1 + ((value - self.lower) / self.bin_size) as usize).min(self.num_bins)
        };
        self.bins[index] += 1;
    }

    /// `(bin lower bound, relative frequency)` pairs, underflow bin first.
    ///
    /// Empty when no sample was seen. If fewer than `cache_size` samples
    /// arrived, the range is fixed from what is cached.
    pub fn histogram(&self) -> Vec<(f32, f32)> {
        if self.count == 0 {
            return Vec::new();
        }
        if !self.fixed {
            let mut settled = self.clone();
            settled.fix_range();
            return settled.histogram();
        }
        let total = self.count as f32;
        self.bins
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let position = self.lower + (i as f32 - 1.0) * self.bin_size;
                (position, n as f32 / total)
            })
            .collect()
    }
}
