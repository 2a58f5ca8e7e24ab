//! Fixed-capacity sliding window of latency samples.
//!
//! The window keeps a running sum and sum of squares so that the mean and the
//! population standard deviation are available in O(1) after every insertion,
//! including the insertions that evict the oldest sample.

use std::num::NonZeroUsize;

/// Default number of samples held by a [`LatencyWindow`].
pub const DEFAULT_CAPACITY: usize = 256;

/// A ring of the most recent latency samples with incremental mean/variance.
///
/// Partial windows divide by the number of samples actually held, never by the
/// capacity.
///
/// ```
/// use std::num::NonZeroUsize;
/// use hedged_resolver::LatencyWindow;
///
/// let mut window = LatencyWindow::new(NonZeroUsize::new(4).unwrap());
/// window.add_sample(10);
/// window.add_sample(20);
/// assert_eq!(window.mean(), 15.0);
/// assert_eq!(window.stdev(), 5.0);
/// ```
#[derive(Debug, Clone)]
pub struct LatencyWindow {
    samples: Vec<u32>,
    capacity: usize,
    // next slot to write; once full it is also the oldest sample
    head: usize,
    sum: f64,
    sum_sq: f64,
}

impl LatencyWindow {
    /// Creates an empty window holding at most `capacity` samples.
    pub fn new(capacity: NonZeroUsize) -> Self {
        let capacity = capacity.get();
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            head: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Inserts a sample, evicting the oldest one when the window is full.
    pub fn add_sample(&mut self, value: u32) {
        let v = f64::from(value);

        if self.samples.len() < self.capacity {
            self.samples.push(value);
        } else {
            let old = f64::from(self.samples[self.head]);
            self.samples[self.head] = value;
            self.sum -= old;
            self.sum_sq -= old * old;
        }

        self.head = (self.head + 1) % self.capacity;
        self.sum += v;
        self.sum_sq += v * v;
    }

    /// Arithmetic mean of the held samples, `0.0` when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.sum / self.samples.len() as f64
    }

    /// Population standard deviation of the held samples, `0.0` when empty.
    pub fn stdev(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        // Accumulated rounding error can push the difference slightly below zero.
        let variance = (self.sum_sq / self.samples.len() as f64 - mean * mean).max(0.0);
        variance.sqrt()
    }

    /// Number of samples currently held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no sample has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of samples held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(capacity: usize) -> LatencyWindow {
        LatencyWindow::new(NonZeroUsize::new(capacity).unwrap())
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn empty_window_reports_zero() {
        let w = window(8);
        assert!(w.is_empty());
        assert_eq!(w.mean(), 0.0);
        assert_eq!(w.stdev(), 0.0);
    }

    #[test]
    fn partial_window_divides_by_count() {
        let mut w = window(256);
        for v in [2, 4, 4, 4, 5, 5, 7, 9] {
            w.add_sample(v);
        }
        assert_eq!(w.len(), 8);
        assert_close(w.mean(), 5.0);
        assert_close(w.stdev(), 2.0);
    }

    #[test]
    fn full_window_evicts_oldest() {
        let mut w = window(3);
        for v in [100, 200, 1, 2, 3] {
            w.add_sample(v);
        }
        assert_eq!(w.len(), 3);
        assert_close(w.mean(), 2.0);
        assert_close(w.stdev(), (2.0f64 / 3.0).sqrt());
    }

    #[test]
    fn eviction_wraps_many_times() {
        let mut w = window(4);
        for v in 0..1_000u32 {
            w.add_sample(v);
        }
        // holds 996..=999
        assert_close(w.mean(), 997.5);
        assert_close(w.stdev(), 1.25f64.sqrt());
    }

    #[test]
    fn constant_samples_have_zero_stdev() {
        let mut w = window(16);
        for _ in 0..100 {
            w.add_sample(u32::MAX);
        }
        assert_close(w.mean(), f64::from(u32::MAX));
        // rounding noise must never turn into a NaN deviation
        assert!(w.stdev() >= 0.0);
        assert!(!w.stdev().is_nan());
    }

    #[test]
    fn capacity_of_one_tracks_latest() {
        let mut w = window(1);
        w.add_sample(7);
        w.add_sample(42);
        assert_eq!(w.len(), 1);
        assert_close(w.mean(), 42.0);
        assert_close(w.stdev(), 0.0);
    }
}
