//! Configuration management.

mod settings;

pub use settings::{
    AppConfig, AppSettings, InstrumentSettings, JournalSettings, LoggingConfig, StrategySettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use thiserror::Error;
use volbreak_core::error::StrategyError;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Load configuration from file and `VOLBREAK__*` environment variables.
pub fn load_config(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("VOLBREAK")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}

/// Load and validate.
pub fn load_validated(path: &Path) -> Result<AppConfig, SettingsError> {
    let config = load_config(path)?;
    config.validate()?;
    Ok(config)
}

/// Sample configuration as TOML.
pub fn default_toml() -> Result<String, SettingsError> {
    Ok(toml::to_string_pretty(&AppConfig::sample())?)
}
