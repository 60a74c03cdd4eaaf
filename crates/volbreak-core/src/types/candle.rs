//! Candle (OHLCV) types and the per-instrument candle series.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::{Side, Timeframe};

/// A completed price candle.
///
/// `timestamp` marks the moment the candle closed. Candles are immutable once
/// delivered by the market-data collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Instrument code
    pub symbol: String,
    /// Close time of the candle
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: Decimal,
    /// Highest price
    pub high: Decimal,
    /// Lowest price
    pub low: Decimal,
    /// Closing price
    pub close: Decimal,
    /// Traded volume
    pub volume: Decimal,
}

impl Candle {
    /// Create a new candle.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Calculate the candle's range (high - low).
    #[inline]
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// Calculate the body size (absolute difference between open and close).
    #[inline]
    pub fn body(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// Check if the candle is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Side a breakout on this candle trades in. Anything that is not
    /// strictly bullish is treated as a sell.
    #[inline]
    pub fn direction(&self) -> Side {
        if self.is_bullish() {
            Side::Buy
        } else {
            Side::Sell
        }
    }
}

/// Time-ordered candles of one instrument, newest at the back.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    /// Instrument code
    pub symbol: String,
    /// Timeframe of the candles
    pub timeframe: Timeframe,
    candles: VecDeque<Candle>,
    /// Maximum capacity (0 = unlimited)
    capacity: usize,
}

impl CandleSeries {
    /// Create a new empty series.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles: VecDeque::new(),
            capacity: 0,
        }
    }

    /// Create a series with a maximum capacity.
    /// When capacity is reached, oldest candles are removed.
    pub fn with_capacity(symbol: impl Into<String>, timeframe: Timeframe, capacity: usize) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            candles: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a newly closed candle, removing the oldest if at capacity.
    pub fn push(&mut self, candle: Candle) {
        if self.capacity > 0 && self.candles.len() >= self.capacity {
            self.candles.pop_front();
        }
        self.candles.push_back(candle);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// The most recently closed candle.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Iterate from newest to oldest.
    pub fn iter_rev(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter().rev()
    }
}
