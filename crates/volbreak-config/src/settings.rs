//! Configuration structures.

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use volbreak_broker::PaperVenueConfig;
use volbreak_core::types::{Instrument, InstrumentRegistry, Timeframe};
use volbreak_engine::EngineSettings;
use volbreak_signal::{SessionConfig, VolumeBreakoutConfig};

use crate::SettingsError;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub strategy: StrategySettings,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub instruments: Vec<InstrumentSettings>,
    #[serde(default)]
    pub paper: PaperVenueConfig,
    #[serde(default)]
    pub journal: JournalSettings,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "volbreak".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Volume breakout strategy parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    /// Strategy name, also the key active trades are persisted under
    pub name: String,
    pub timeframe: Timeframe,
    /// Candles in the volume window
    pub length: usize,
    /// Spike threshold as a multiple of the window average
    pub volume_factor: Decimal,
    /// Minimum body size relative to close, percent
    pub candle_size_pct: Decimal,
    /// Minimum body share of the high-low range, percent
    pub body_pct: Decimal,
    /// Newest candles left out of the volume window
    pub volume_window_offset: usize,
    pub take_profit_pct: Decimal,
    pub stop_loss_pct: Decimal,
    /// Restore persisted trades at start-up
    pub load_active_trades: bool,
    pub cancel_unfilled_entries_each_bar: bool,
    pub entry_expiry_hours: i64,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            name: "Vol".to_string(),
            timeframe: Timeframe::Minute5,
            length: 20,
            volume_factor: dec!(3),
            candle_size_pct: dec!(1),
            body_pct: dec!(60),
            volume_window_offset: 1,
            take_profit_pct: dec!(2),
            stop_loss_pct: dec!(1),
            load_active_trades: false,
            cancel_unfilled_entries_each_bar: true,
            entry_expiry_hours: 24,
        }
    }
}

impl StrategySettings {
    pub fn detector_config(&self, session: &SessionConfig) -> VolumeBreakoutConfig {
        VolumeBreakoutConfig {
            timeframe: self.timeframe,
            length: self.length,
            volume_factor: self.volume_factor,
            candle_size_pct: self.candle_size_pct,
            body_pct: self.body_pct,
            volume_window_offset: self.volume_window_offset,
            session: session.clone(),
        }
    }

    /// Entry lifetime. Hour counts chrono cannot represent are rejected.
    pub fn entry_expiry(&self) -> Result<Duration, SettingsError> {
        Duration::try_hours(self.entry_expiry_hours).ok_or_else(|| {
            SettingsError::Invalid(format!(
                "Entry expiry of {} hours is out of range",
                self.entry_expiry_hours
            ))
        })
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, SettingsError> {
        Ok(EngineSettings {
            strategy_name: self.name.clone(),
            timeframe: self.timeframe,
            take_profit_pct: self.take_profit_pct,
            stop_loss_pct: self.stop_loss_pct,
            load_active_trades: self.load_active_trades,
            cancel_unfilled_entries_each_bar: self.cancel_unfilled_entries_each_bar,
            entry_expiry: self.entry_expiry()?,
            ..EngineSettings::default()
        })
    }
}

/// One tradable instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSettings {
    pub code: String,
    /// Volume of each entry order
    pub volume: Decimal,
    /// Minimum price increment
    pub price_step: Decimal,
}

impl From<&InstrumentSettings> for Instrument {
    fn from(settings: &InstrumentSettings) -> Self {
        Instrument::new(settings.code.clone(), settings.price_step, settings.volume)
    }
}

/// Active-trade journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalSettings {
    /// Persist open trades on every change
    pub enabled: bool,
    pub path: String,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "data/active_trades.json".to_string(),
        }
    }
}

impl AppConfig {
    /// Default configuration with one example instrument, as printed by
    /// `default-config`.
    pub fn sample() -> Self {
        Self {
            instruments: vec![InstrumentSettings {
                code: "SBER".to_string(),
                volume: dec!(10),
                price_step: dec!(0.01),
            }],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        self.detector_config().validate()?;
        self.engine_settings()?.validate()?;

        if self.instruments.is_empty() {
            return Err(SettingsError::Invalid("At least one instrument must be configured".into()));
        }
        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if instrument.code.trim().is_empty() {
                return Err(SettingsError::Invalid("Instrument code must not be empty".into()));
            }
            if !seen.insert(instrument.code.as_str()) {
                return Err(SettingsError::Invalid(format!(
                    "Instrument {} is configured twice",
                    instrument.code
                )));
            }
            if instrument.volume <= Decimal::ZERO {
                return Err(SettingsError::Invalid(format!(
                    "Volume of {} must be positive",
                    instrument.code
                )));
            }
            if instrument.price_step < Decimal::ZERO {
                return Err(SettingsError::Invalid(format!(
                    "Price step of {} must not be negative",
                    instrument.code
                )));
            }
        }
        if self.journal.enabled && self.journal.path.trim().is_empty() {
            return Err(SettingsError::Invalid("Journal path must not be empty".into()));
        }
        Ok(())
    }

    pub fn detector_config(&self) -> VolumeBreakoutConfig {
        self.strategy.detector_config(&self.session)
    }

    pub fn engine_settings(&self) -> Result<EngineSettings, SettingsError> {
        self.strategy.engine_settings()
    }

    pub fn instrument_registry(&self) -> InstrumentRegistry {
        InstrumentRegistry::new(self.instruments.iter().map(Instrument::from))
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.code.clone()).collect()
    }
}
