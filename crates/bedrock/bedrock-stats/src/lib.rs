//! `bedrock-stats`: measurement helpers for the simulation reports.
//!
//! Two flavours of aggregation live here:
//! - [`BinnedHistogram`]: equal-width binning over a recorded trace, for the
//!   end-of-run bandwidth / fullness summaries
//! - [`LatencyStats`]: HDR-histogram quantiles for request round-trip times
//!
//! The crate computes; the engines and bins decide how to print.

#![forbid(unsafe_code)]

use hdrhistogram::Histogram;

/// Equal-width histogram over `f64` samples.
///
/// `edges` has `bins + 1` entries; `counts[i]` covers `[edges[i], edges[i+1])`
/// except the last bin, which also includes the maximum sample.
#[derive(Debug, Clone)]
pub struct BinnedHistogram {
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl BinnedHistogram {
    /// Bins `samples` into `bins` equal-width buckets between the observed
    /// min and max. Returns `None` when there is nothing to bin.
    pub fn from_samples(samples: &[f64], bins: usize) -> Option<Self> {
        if samples.is_empty() || bins == 0 {
            return None;
        }
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

        let edges: Vec<f64> = (0..=bins).map(|i| min + width * i as f64).collect();
        let mut counts = vec![0u64; bins];
        for &s in samples {
            let mut idx = ((s - min) / width) as usize;
            if idx >= bins {
                idx = bins - 1;
            }
            counts[idx] += 1;
        }
        Some(Self { edges, counts })
    }

    /// Mean of the binned data, weighting each bin's left edge by its count
    /// (the same estimate the run summaries have always printed).
    pub fn weighted_mean(&self) -> f64 {
        let total: u64 = self.counts.iter().sum();
        if total == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .edges
            .iter()
            .zip(&self.counts)
            .map(|(edge, &n)| edge * n as f64)
            .sum();
        sum / total as f64
    }
}

pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Round-trip latency quantiles backed by an auto-resizing HDR histogram.
pub struct LatencyStats {
    hist: Histogram<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
    pub count: u64,
}

impl LatencyStats {
    pub fn new() -> Self {
        Self {
            hist: Histogram::new(3).expect("3 significant figures is always valid"),
        }
    }

    pub fn record(&mut self, value: u64) {
        // Auto-resize keeps this infallible in practice.
        let _ = self.hist.record(value);
    }

    pub fn is_empty(&self) -> bool {
        self.hist.is_empty()
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            p50: self.hist.value_at_quantile(0.50),
            p90: self.hist.value_at_quantile(0.90),
            p99: self.hist.value_at_quantile(0.99),
            p999: self.hist.value_at_quantile(0.999),
            max: self.hist.max(),
            count: self.hist.len(),
        }
    }
}

impl Default for LatencyStats {
    fn default() -> Self {
        Self::new()
    }
}
