//! Breakout signal types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Side;

/// Filter values computed for one candle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignalMetrics {
    /// Body size relative to close, percent, 2 decimals
    pub candle_size_pct: Decimal,
    /// Body size relative to the high-low range, whole percent
    pub body_pct: Decimal,
    /// Volume of the evaluated candle
    pub volume: Decimal,
    /// Mean volume of the trailing window, `None` when history is too short
    pub average_volume: Option<Decimal>,
}

/// A fired breakout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Instrument code
    pub symbol: String,
    /// Direction of the breakout candle
    pub side: Side,
    /// Close of the breakout candle
    pub reference_price: Decimal,
    /// Close time of the breakout candle
    pub timestamp: DateTime<Utc>,
    pub metrics: SignalMetrics,
}
