//! Volume Breakout detector.
//!
//! Fires on a candle whose body is large relative to both its close and its
//! high-low range, traded on a volume spike well above the trailing average.
//! Bullish candles signal a buy, everything else a sell.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use volbreak_core::{
    error::StrategyError,
    traits::SignalDetector,
    types::{Candle, CandleSeries, Signal, SignalMetrics, Timeframe},
};

use crate::filters::{body_percent, candle_size_percent, RollingVolumeWindow};
use crate::session::{SessionConfig, SessionGate};

/// Configuration for the Volume Breakout detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeBreakoutConfig {
    /// Candle timeframe
    pub timeframe: Timeframe,
    /// Number of candles in the volume window
    pub length: usize,
    /// Volume multiple of the window average that counts as a spike
    pub volume_factor: Decimal,
    /// Minimum body size relative to close, percent (exclusive)
    pub candle_size_pct: Decimal,
    /// Minimum body share of the high-low range, percent (exclusive)
    pub body_pct: Decimal,
    /// How many of the newest candles the volume window skips
    pub volume_window_offset: usize,
    pub session: SessionConfig,
}

impl Default for VolumeBreakoutConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::Minute5,
            length: 20,
            volume_factor: dec!(3),
            candle_size_pct: dec!(1),
            body_pct: dec!(60),
            volume_window_offset: 1,
            session: SessionConfig::default(),
        }
    }
}

impl VolumeBreakoutConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.length == 0 {
            return Err(StrategyError::InvalidConfig(
                "Volume window length must be greater than 0".into(),
            ));
        }
        if self.volume_factor <= Decimal::ZERO {
            return Err(StrategyError::InvalidConfig(
                "Volume factor must be positive".into(),
            ));
        }
        if self.candle_size_pct < Decimal::ZERO || self.body_pct < Decimal::ZERO {
            return Err(StrategyError::InvalidConfig(
                "Candle size and body thresholds must not be negative".into(),
            ));
        }
        if self.body_pct >= Decimal::ONE_HUNDRED {
            return Err(StrategyError::InvalidConfig(
                "Body threshold must be below 100%".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of the three filters for one candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub metrics: SignalMetrics,
    pub is_candle_big: bool,
    pub is_body_dominant: bool,
    pub is_volume_spike: bool,
}

impl Assessment {
    pub fn fires(&self) -> bool {
        self.is_candle_big && self.is_body_dominant && self.is_volume_spike
    }
}

/// Volume Breakout detector.
pub struct VolumeBreakoutDetector {
    config: VolumeBreakoutConfig,
    gate: SessionGate,
}

impl VolumeBreakoutDetector {
    /// Create a new detector.
    pub fn new(config: VolumeBreakoutConfig) -> Self {
        let gate = SessionGate::new(&config.session, config.timeframe.minutes(), config.length);
        Self { config, gate }
    }

    pub fn config(&self) -> &VolumeBreakoutConfig {
        &self.config
    }

    /// Run the filters on `candle` against a trailing volume window.
    ///
    /// Without a window the volume filter cannot pass.
    pub fn assess(&self, candle: &Candle, window: Option<&RollingVolumeWindow>) -> Assessment {
        let candle_size_pct = candle_size_percent(candle);
        let body_pct = body_percent(candle);
        let average_volume = window.and_then(RollingVolumeWindow::average);
        let is_volume_spike =
            window.is_some_and(|w| w.is_exceeded_by(candle.volume, self.config.volume_factor));

        Assessment {
            is_candle_big: candle_size_pct > self.config.candle_size_pct,
            is_body_dominant: body_pct > self.config.body_pct,
            is_volume_spike,
            metrics: SignalMetrics {
                candle_size_pct,
                body_pct,
                volume: candle.volume,
                average_volume,
            },
        }
    }
}

impl SignalDetector for VolumeBreakoutDetector {
    fn name(&self) -> &str {
        "Vol"
    }

    fn description(&self) -> &str {
        "Enters in the direction of a large-bodied candle traded on a volume spike"
    }

    fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.gate.is_open(at)
    }

    fn evaluate(&self, series: &CandleSeries) -> Option<Signal> {
        let candle = series.last()?;
        let window = RollingVolumeWindow::trailing(
            series,
            self.config.length,
            self.config.volume_window_offset,
        );
        let assessment = self.assess(candle, window.as_ref());

        debug!(
            symbol = %candle.symbol,
            candle_size_pct = %assessment.metrics.candle_size_pct,
            body_pct = %assessment.metrics.body_pct,
            volume = %candle.volume,
            average_volume = ?assessment.metrics.average_volume.map(|v| v.round_dp(0)),
            "Evaluated candle"
        );

        if !assessment.fires() {
            return None;
        }

        Some(Signal {
            symbol: candle.symbol.clone(),
            side: candle.direction(),
            reference_price: candle.close,
            timestamp: candle.timestamp,
            metrics: assessment.metrics,
        })
    }

    fn warmup_period(&self) -> usize {
        self.config.length + self.config.volume_window_offset
    }
}
