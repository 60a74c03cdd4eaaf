//! CLI definitions.

pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use volbreak_config::LoggingConfig;

#[derive(Parser)]
#[command(name = "volbreak")]
#[command(author, version, about = "Volume breakout strategy with take-profit trade management")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "VOLBREAK_CONFIG")]
    pub config: PathBuf,

    /// Log level, overrides `[logging] level`
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format, overrides `[logging] format`
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log level and JSON flag, command line first, then the config file.
    pub fn logging(&self, config: &LoggingConfig) -> (String, bool) {
        let level = match self.log_level {
            Some(level) => level.as_str().to_string(),
            None => config.level.clone(),
        };
        (level, self.json_logs || config.is_json())
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay CSV candles through the strategy against the paper venue
    Replay(ReplayArgs),
    /// Show the persisted active trades
    Trades(TradesArgs),
    /// Validate configuration
    ValidateConfig,
    /// Print a default configuration
    DefaultConfig,
}

#[derive(clap::Args)]
pub struct ReplayArgs {
    /// Candle data: a directory of <SYMBOL>.csv files or one file with a symbol column
    #[arg(short, long)]
    pub data: PathBuf,

    /// Symbols to replay (comma-separated), defaults to the configured instruments
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Timestamps in the data mark the candle close rather than its start
    #[arg(long)]
    pub close_times: bool,

    /// Do not write the active-trade journal
    #[arg(long)]
    pub no_journal: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(clap::Args)]
pub struct TradesArgs {
    /// Strategy name, defaults to the configured one
    #[arg(short, long)]
    pub strategy: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}
