//! Hedge delay estimation.
//!
//! A [`PercentileEstimator`] turns observed latencies into the delay after which a
//! backup request is issued. The default [`StdevEstimator`] approximates a high
//! percentile as `mean + k * stdev` over a [`LatencyWindow`]; the
//! [`ConstantEstimator`] always reports a fixed delay and ignores samples.

use std::{num::NonZeroUsize, time::Duration};

use crate::window::{LatencyWindow, DEFAULT_CAPACITY};

/// Default multiplier applied to the standard deviation.
pub const DEFAULT_MULTIPLIER: f64 = 3.0;

/// Source of the hedge delay.
///
/// Implementations are interchangeable: the orchestrator only feeds samples in
/// and reads the current delay back.
pub trait PercentileEstimator: Send + 'static {
    /// Records the latency of a completed (not cancelled) call.
    fn add_sample(&mut self, latency: Duration);

    /// Delay after which a backup should be issued.
    ///
    /// `None` is the unbounded delay: the request must never be hedged.
    fn current_delay(&self) -> Option<Duration>;
}

/// Estimates the hedge delay as `round(mean + multiplier * stdev)` milliseconds.
///
/// Reports the unbounded delay until the first sample arrives, so no request is
/// hedged before there is data to base the delay on.
#[derive(Debug, Clone)]
pub struct StdevEstimator {
    window: LatencyWindow,
    multiplier: f64,
}

impl StdevEstimator {
    /// Creates an estimator over a window of `capacity` samples.
    ///
    /// The multiplier is expected to be finite and non-negative; use
    /// [`HedgeConfig::validate`](crate::HedgeConfig::validate) to check
    /// user-supplied values.
    pub fn new(multiplier: f64, capacity: NonZeroUsize) -> Self {
        Self {
            window: LatencyWindow::new(capacity),
            multiplier,
        }
    }

    /// The underlying sample window.
    pub fn window(&self) -> &LatencyWindow {
        &self.window
    }

    /// The standard deviation multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }
}

impl Default for StdevEstimator {
    fn default() -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self::new(DEFAULT_MULTIPLIER, capacity)
    }
}

impl PercentileEstimator for StdevEstimator {
    fn add_sample(&mut self, latency: Duration) {
        self.window.add_sample(clip_millis(latency));
    }

    fn current_delay(&self) -> Option<Duration> {
        if self.window.is_empty() {
            return None;
        }
        let threshold = (self.window.mean() + self.multiplier * self.window.stdev()).round();
        // float-to-int casts saturate, and the threshold is never negative
        Some(Duration::from_millis(threshold.max(0.0) as u64))
    }
}

/// Reports a fixed delay regardless of observed latencies.
///
/// Useful to force deterministic hedging, or to disable it with
/// [`ConstantEstimator::never`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantEstimator {
    delay: Option<Duration>,
}

impl ConstantEstimator {
    /// Always hedge after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }

    /// Never hedge.
    pub fn never() -> Self {
        Self { delay: None }
    }
}

impl PercentileEstimator for ConstantEstimator {
    fn add_sample(&mut self, _latency: Duration) {}

    fn current_delay(&self) -> Option<Duration> {
        self.delay
    }
}

/// Whole milliseconds of `latency`, saturating at `u32::MAX`.
fn clip_millis(latency: Duration) -> u32 {
    u32::try_from(latency.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator(multiplier: f64, capacity: usize) -> StdevEstimator {
        StdevEstimator::new(multiplier, NonZeroUsize::new(capacity).unwrap())
    }

    #[test]
    fn unbounded_until_first_sample() {
        let mut e = StdevEstimator::default();
        assert_eq!(e.current_delay(), None);

        e.add_sample(Duration::from_millis(12));
        assert_eq!(e.current_delay(), Some(Duration::from_millis(12)));
    }

    #[test]
    fn zero_latency_sample_is_still_a_sample() {
        let mut e = StdevEstimator::default();
        e.add_sample(Duration::ZERO);
        assert_eq!(e.current_delay(), Some(Duration::ZERO));
    }

    #[test]
    fn delay_is_mean_plus_k_stdev() {
        let mut e = estimator(3.0, 16);
        for ms in [2, 4, 4, 4, 5, 5, 7, 9] {
            e.add_sample(Duration::from_millis(ms));
        }
        // mean 5, stdev 2
        assert_eq!(e.current_delay(), Some(Duration::from_millis(11)));
    }

    #[test]
    fn delay_rounds_to_nearest_millisecond() {
        let mut e = estimator(0.5, 16);
        e.add_sample(Duration::from_millis(10));
        e.add_sample(Duration::from_millis(13));
        // mean 11.5, stdev 1.5 -> 12.25
        assert_eq!(e.current_delay(), Some(Duration::from_millis(12)));
    }

    #[test]
    fn zero_multiplier_tracks_the_mean() {
        let mut e = estimator(0.0, 4);
        for ms in [10, 20, 30, 40, 50] {
            e.add_sample(Duration::from_millis(ms));
        }
        assert_eq!(e.current_delay(), Some(Duration::from_millis(35)));
    }

    #[test]
    fn huge_latency_is_clipped() {
        let mut e = estimator(3.0, 4);
        e.add_sample(Duration::from_secs(u64::MAX));
        assert_eq!(
            e.current_delay(),
            Some(Duration::from_millis(u64::from(u32::MAX)))
        );
    }

    #[test]
    fn sub_millisecond_latency_truncates() {
        assert_eq!(clip_millis(Duration::from_micros(999)), 0);
        assert_eq!(clip_millis(Duration::from_micros(1_500)), 1);
    }

    #[test]
    fn constant_estimator_ignores_samples() {
        let mut c = ConstantEstimator::new(Duration::from_millis(10));
        c.add_sample(Duration::from_secs(5));
        assert_eq!(c.current_delay(), Some(Duration::from_millis(10)));

        let mut never = ConstantEstimator::never();
        never.add_sample(Duration::from_millis(1));
        assert_eq!(never.current_delay(), None);
    }
}
