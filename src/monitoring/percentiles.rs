/// Nearest-rank percentile over an ascending-sorted sample.
///
/// Picks the element at `ceil(len * fraction) - 1`, clamped to the first
/// element. Returns `None` for an empty sample.
pub fn nearest_rank(sorted: &[i64], fraction: f64) -> Option<i64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (sorted.len() as f64 * fraction).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    Some(sorted[index])
}

/// Latency breakdown for one window of raw samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileSet {
    pub count: usize,
    pub mean: f64,
    pub min: i64,
    pub max: i64,
    pub p50: i64,
    pub p95: i64,
    pub p99: i64,
}

impl PercentileSet {
    /// Sorts the samples in place and extracts the set.
    /// Returns `None` when there is nothing to summarize.
    pub fn from_samples(samples: &mut [i64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable();

        // Wide accumulator; a handful of huge samples must not overflow
        let sum: i128 = samples.iter().map(|&s| s as i128).sum();
        Some(Self {
            count: samples.len(),
            mean: sum as f64 / samples.len() as f64,
            min: samples[0],
            max: samples[samples.len() - 1],
            p50: nearest_rank(samples, 0.50)?,
            p95: nearest_rank(samples, 0.95)?,
            p99: nearest_rank(samples, 0.99)?,
        })
    }
}
