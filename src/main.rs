//! Volume breakout strategy CLI application.

mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use volbreak_config::load_config;
use volbreak_monitor::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; commands report a broken config file themselves
    let logging = load_config(&cli.config).map(|c| c.logging).unwrap_or_default();
    let (level, json) = cli.logging(&logging);
    if let Err(e) = setup_logging(&level, json) {
        eprintln!("Logging already initialized: {}", e);
    }

    // Execute command
    match cli.command {
        Commands::Replay(args) => cli::commands::replay::run(args, &cli.config).await,
        Commands::Trades(args) => cli::commands::trades::run(args, &cli.config).await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
        Commands::DefaultConfig => cli::commands::default_config::run().await,
    }
}
