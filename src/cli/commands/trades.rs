//! Show the active trades persisted by the journal.

use anyhow::{Context, Result};
use std::path::Path;
use volbreak_config::load_config;
use volbreak_core::traits::TradeStore;
use volbreak_data::JsonTradeStore;

use crate::cli::{OutputFormat, TradesArgs};

pub async fn run(args: TradesArgs, config_path: &Path) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    let strategy = args.strategy.unwrap_or(config.strategy.name);

    let store = JsonTradeStore::new(&config.journal.path);
    let trades = store
        .load_active_trades(&strategy)
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trades)?),
        OutputFormat::Text => {
            if trades.is_empty() {
                println!("No active trades for {}", strategy);
                return Ok(());
            }
            println!("Active trades for {} ({})", strategy, store.path().display());
            println!("{}", "=".repeat(40));
            for trade in &trades {
                let exit = trade
                    .exit_order
                    .as_ref()
                    .map(|exit| exit.order_id.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!(
                    "{} {} {} x {} @ {} ({:?}) opened {}, exit {}",
                    trade.id, trade.side, trade.symbol, trade.volume, trade.price, trade.tranche, trade.opened_at, exit
                );
            }
        }
    }

    Ok(())
}
