//! Matcher observability: a monotonic hit counter and latency percentiles
//! over a sampled rolling window.
//!
//! Every match call bumps the atomic counters; only one call in
//! [`SAMPLE_INTERVAL`] records its latency into the fixed ring, keeping the
//! hot path free of shared writes beyond two relaxed atomics.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// One latency sample per this many calls (~0.8%).
pub const SAMPLE_INTERVAL: u64 = 128;

/// Rolling window size in samples.
pub const SAMPLE_WINDOW: usize = 512;

/// Shared counters updated by concurrent match calls.
pub struct MatchCounters {
    hits_total: AtomicU64,
    calls_total: AtomicU64,
    samples: Vec<AtomicU64>,
    cursor: AtomicUsize,
}

impl MatchCounters {
    pub fn new() -> Self {
        Self {
            hits_total: AtomicU64::new(0),
            calls_total: AtomicU64::new(0),
            samples: (0..SAMPLE_WINDOW).map(|_| AtomicU64::new(0)).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Record one completed match call.
    pub fn record(&self, hits: usize, elapsed_us: u64) {
        self.hits_total.fetch_add(hits as u64, Ordering::Relaxed);
        let call = self.calls_total.fetch_add(1, Ordering::Relaxed);

        if call % SAMPLE_INTERVAL == 0 {
            let slot = self.cursor.fetch_add(1, Ordering::Relaxed) % SAMPLE_WINDOW;
            // Stored +1 so an untouched slot is distinguishable from a
            // genuine zero-microsecond sample.
            self.samples[slot].store(elapsed_us + 1, Ordering::Relaxed);
        }
    }

    pub fn hits_total(&self) -> u64 {
        self.hits_total.load(Ordering::Relaxed)
    }

    pub fn calls_total(&self) -> u64 {
        self.calls_total.load(Ordering::Relaxed)
    }

    /// p50/p95/p99 latency estimates in microseconds over the current
    /// window. Zeros until the first sample lands.
    pub fn latency_percentiles(&self) -> (u64, u64, u64) {
        let mut snapshot: Vec<u64> = self
            .samples
            .iter()
            .map(|s| s.load(Ordering::Relaxed))
            .filter(|&v| v > 0)
            .map(|v| v - 1)
            .collect();

        if snapshot.is_empty() {
            return (0, 0, 0);
        }

        snapshot.sort_unstable();
        let pick = |p: f64| {
            let idx = ((snapshot.len() as f64 - 1.0) * p).round() as usize;
            snapshot[idx]
        };
        (pick(0.50), pick(0.95), pick(0.99))
    }
}

impl Default for MatchCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of the loaded matcher's state for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct MatcherStats {
    pub version: String,
    pub loaded_at_ms: u64,
    pub num_patterns: usize,
    pub heap_mb: f64,
    pub hits_total: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hits_accumulate() {
        let counters = MatchCounters::new();
        counters.record(3, 10);
        counters.record(0, 10);
        counters.record(2, 10);
        assert_eq!(counters.hits_total(), 5);
        assert_eq!(counters.calls_total(), 3);
    }

    #[test]
    fn test_percentiles_empty() {
        let counters = MatchCounters::new();
        assert_eq!(counters.latency_percentiles(), (0, 0, 0));
    }

    #[test]
    fn test_percentiles_from_samples() {
        let counters = MatchCounters::new();
        // Call 0 of every interval is sampled; spread values across the
        // window by recording SAMPLE_INTERVAL calls per value.
        for v in 1..=100u64 {
            for _ in 0..SAMPLE_INTERVAL {
                counters.record(0, v);
            }
        }

        let (p50, p95, p99) = counters.latency_percentiles();
        assert!(p50 >= 40 && p50 <= 60, "p50 = {p50}");
        assert!(p95 >= 90, "p95 = {p95}");
        assert!(p99 >= p95);
    }

    #[test]
    fn test_zero_latency_sample_counts() {
        let counters = MatchCounters::new();
        counters.record(0, 0);
        assert_eq!(counters.latency_percentiles(), (0, 0, 0));
        // The slot is occupied even though the sample was 0us: a second
        // sampled call lands in the next slot, not the same one.
        for _ in 0..SAMPLE_INTERVAL {
            counters.record(0, 7);
        }
        let (p50, _, p99) = counters.latency_percentiles();
        assert!(p99 >= 7);
        assert!(p50 <= 7);
    }
}
