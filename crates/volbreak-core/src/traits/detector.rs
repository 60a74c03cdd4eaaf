//! Signal detector trait.

use crate::types::{CandleSeries, Signal};
use chrono::{DateTime, Utc};

/// Decides, candle by candle, whether an instrument shows an entry signal.
///
/// Detectors are pure: everything they need is in the series they are
/// handed, so the same series always yields the same answer.
pub trait SignalDetector: Send + Sync {
    /// Get the unique name of this detector.
    fn name(&self) -> &str;

    /// Whether signals may be evaluated for a candle closing at `at`.
    ///
    /// The engine checks this before doing any per-instrument work for the
    /// candle.
    fn is_active_at(&self, _at: DateTime<Utc>) -> bool {
        true
    }

    /// Evaluate the newest candle of `series`.
    ///
    /// # Returns
    /// * `Some(Signal)` if the newest candle is a breakout
    /// * `None` otherwise, including when history is too short
    fn evaluate(&self, series: &CandleSeries) -> Option<Signal>;

    /// Number of candles needed before signals can fire.
    fn warmup_period(&self) -> usize;

    fn is_warmed_up(&self, candles_available: usize) -> bool {
        candles_available >= self.warmup_period()
    }

    fn description(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timeframe;

    struct NeverFires {
        warmup: usize,
    }

    impl SignalDetector for NeverFires {
        fn name(&self) -> &str {
            "never"
        }

        fn evaluate(&self, _series: &CandleSeries) -> Option<Signal> {
            None
        }

        fn warmup_period(&self) -> usize {
            self.warmup
        }
    }

    #[test]
    fn test_detector_defaults() {
        let detector = NeverFires { warmup: 21 };

        assert!(!detector.is_warmed_up(20));
        assert!(detector.is_warmed_up(21));
        assert!(detector.is_active_at(Utc::now()));
        assert!(detector
            .evaluate(&CandleSeries::new("SBER", Timeframe::Minute5))
            .is_none());
        assert_eq!(detector.description(), "");
    }
}
