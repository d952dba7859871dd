//! Value histograms with percentile snapshots
//!
//! Wraps `hdrhistogram` in a fixed-point recorder shared by task
//! durations, mark values, measure durations, and loop-lag samples.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Values are recorded in thousandths of a unit
const SCALE: f64 = 1000.0;

/// Histogram over durations (milliseconds) or raw mark values.
///
/// Configured for milli-unit precision with a max of ~1 hour when the
/// unit is milliseconds.
#[derive(Debug)]
pub struct DurationHistogram {
    histogram: hdrhistogram::Histogram<u64>,
}

impl DurationHistogram {
    /// Create an empty histogram
    pub fn new() -> Self {
        let histogram = hdrhistogram::Histogram::new_with_bounds(1, 3_600_000_000, 3)
            .expect("histogram bounds are static and valid");
        Self { histogram }
    }

    /// Record a duration (stored in milliseconds)
    pub fn record(&mut self, duration: Duration) {
        self.record_value(duration.as_secs_f64() * 1_000.0);
    }

    /// Record a raw value (milliseconds for durations, unit-less for marks)
    pub fn record_value(&mut self, value: f64) {
        let fixed = (value * SCALE).ceil() as u64;
        let _ = self.histogram.record(fixed);
    }

    /// Number of recorded values
    pub fn count(&self) -> u64 {
        self.histogram.len()
    }

    /// True when nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.histogram.is_empty()
    }

    /// Summary statistics over the recorded values
    pub fn snapshot(&self) -> HistogramSnapshot {
        if self.histogram.is_empty() {
            return HistogramSnapshot::default();
        }

        HistogramSnapshot {
            count: self.histogram.len(),
            min: self.histogram.min() as f64 / SCALE,
            max: self.histogram.max() as f64 / SCALE,
            mean: self.histogram.mean() / SCALE,
            p50: self.histogram.value_at_quantile(0.50) as f64 / SCALE,
            p75: self.histogram.value_at_quantile(0.75) as f64 / SCALE,
            p100: self.histogram.value_at_quantile(1.00) as f64 / SCALE,
            stddev: self.histogram.stdev() / SCALE,
        }
    }
}

impl Default for DurationHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time summary of a [`DurationHistogram`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    /// Number of recorded values
    pub count: u64,
    /// Minimum recorded value
    pub min: f64,
    /// Maximum recorded value
    pub max: f64,
    /// Mean of recorded values
    pub mean: f64,
    /// 50th percentile
    pub p50: f64,
    /// 75th percentile
    pub p75: f64,
    /// 100th percentile
    pub p100: f64,
    /// Standard deviation
    pub stddev: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let histogram = DurationHistogram::new();
        let snapshot = histogram.snapshot();

        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.mean, 0.0);
        assert_eq!(snapshot.max, 0.0);
    }

    #[test]
    fn test_record_values() {
        let mut histogram = DurationHistogram::new();
        for i in 1..=100 {
            histogram.record_value(i as f64);
        }

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 100);
        assert!((snapshot.min - 1.0).abs() < 0.1);
        assert!((snapshot.max - 100.0).abs() < 0.1);
        assert!((snapshot.p50 - 50.0).abs() < 1.0);
        assert!((snapshot.p100 - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_record_duration() {
        let mut histogram = DurationHistogram::new();
        histogram.record(Duration::from_millis(100));
        histogram.record(Duration::from_millis(300));

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 2);
        assert!((snapshot.mean - 200.0).abs() < 5.0);
    }

    #[test]
    fn test_sub_millisecond_values_are_kept() {
        let mut histogram = DurationHistogram::new();
        histogram.record(Duration::from_micros(250));

        let snapshot = histogram.snapshot();
        assert_eq!(snapshot.count, 1);
        assert!(snapshot.max > 0.0);
    }
}
