//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use volbreak_config::load_validated;

pub async fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_validated(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Environment: {}", config.app.environment);
            println!("Log level: {}", config.logging.level);
            println!("Strategy: {} on {}", config.strategy.name, config.strategy.timeframe);
            println!(
                "Signal: length={}, volume factor={}, candle size={}%, body={}%",
                config.strategy.length,
                config.strategy.volume_factor,
                config.strategy.candle_size_pct,
                config.strategy.body_pct
            );
            println!(
                "Take profit: {}%, stop loss: {}%",
                config.strategy.take_profit_pct, config.strategy.stop_loss_pct
            );
            println!(
                "Session open: {} (UTC{:+} min)",
                config.session.open, config.session.utc_offset_minutes
            );
            for instrument in &config.instruments {
                println!(
                    "Instrument {}: volume={}, price step={}",
                    instrument.code, instrument.volume, instrument.price_step
                );
            }
            if config.journal.enabled {
                println!("Journal: {}", config.journal.path);
            } else {
                println!("Journal: disabled");
            }
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
