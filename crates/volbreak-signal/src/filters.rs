//! Candle shape and volume filters.

use rust_decimal::Decimal;
use volbreak_core::types::{Candle, CandleSeries};

/// Body size relative to the close, in percent, rounded to 2 decimals.
///
/// Zero when the close is zero.
pub fn candle_size_percent(candle: &Candle) -> Decimal {
    if candle.close.is_zero() {
        return Decimal::ZERO;
    }
    (candle.body() / candle.close * Decimal::ONE_HUNDRED)
        .abs()
        .round_dp(2)
}

/// Body size relative to the high-low range, in whole percent.
///
/// Zero when the candle has no range.
pub fn body_percent(candle: &Candle) -> Decimal {
    let range = candle.range();
    if range.is_zero() {
        return Decimal::ZERO;
    }
    (candle.body() / range * Decimal::ONE_HUNDRED).abs().round_dp(0)
}

/// Trailing volumes the newest candle is compared against.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingVolumeWindow {
    volumes: Vec<Decimal>,
}

impl RollingVolumeWindow {
    /// Volumes of `length` candles ending `offset` bars before the newest one,
    /// newest first.
    ///
    /// With `offset = 1` the window is the `length` candles preceding the
    /// newest candle. Returns `None` until the series holds enough history.
    pub fn trailing(series: &CandleSeries, length: usize, offset: usize) -> Option<Self> {
        if length == 0 || series.len() < length + offset {
            return None;
        }
        let volumes = series
            .iter_rev()
            .skip(offset)
            .take(length)
            .map(|c| c.volume)
            .collect();
        Some(Self { volumes })
    }

    pub fn sum(&self) -> Decimal {
        self.volumes.iter().sum()
    }

    /// Arithmetic mean of the window. Reporting only: the division rounds
    /// at 28 digits, so spike decisions go through [`Self::is_exceeded_by`].
    pub fn average(&self) -> Option<Decimal> {
        if self.is_empty() {
            return None;
        }
        Some(self.sum() / Decimal::from(self.len()))
    }

    /// Whether `volume` is strictly above `factor` times the mean, compared
    /// as `volume * len > sum * factor`.
    pub fn is_exceeded_by(&self, volume: Decimal, factor: Decimal) -> bool {
        if self.is_empty() {
            return false;
        }
        volume * Decimal::from(self.len()) > self.sum() * factor
    }

    pub fn volumes(&self) -> &[Decimal] {
        &self.volumes
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}
