//! Replay command: historical candles through the engine and the paper venue.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use volbreak_broker::PaperVenue;
use volbreak_config::{load_validated, AppConfig};
use volbreak_core::traits::{OrderRouter, TradeStore};
use volbreak_core::types::{ActiveTrade, Candle};
use volbreak_data::{load_csv_replay, JsonTradeStore, TimestampKind};
use volbreak_engine::{BreakoutEngine, EngineHandle, EngineStats};
use volbreak_monitor::{JournalStats, TradeJournal};
use volbreak_signal::VolumeBreakoutDetector;

use crate::cli::{OutputFormat, ReplayArgs};

/// Snapshot rounds after the last candle, letting chained venue callbacks
/// drain.
const SETTLE_ROUNDS: usize = 3;

/// Outcome of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct ReplaySummary {
    pub strategy: String,
    pub candles: usize,
    pub stats: EngineStats,
    pub open_trades: Vec<ActiveTrade>,
    pub live_orders: usize,
    pub venue_orders: usize,
    pub journal: Option<JournalStats>,
}

impl ReplaySummary {
    fn print(&self) {
        println!("Replay of {}", self.strategy);
        println!("{}", "=".repeat(40));
        println!("Candles replayed:  {}", self.candles);
        println!("Candles processed: {}", self.stats.candles_processed);
        println!("Signals fired:     {}", self.stats.signals_fired);
        println!("Entries submitted: {}", self.stats.entries_submitted);
        println!("Trades opened:     {}", self.stats.trades_opened);
        println!("Trades closed:     {}", self.stats.trades_closed);
        println!("Live orders:       {}", self.live_orders);
        println!("Resting at venue:  {}", self.venue_orders);
        if let Some(journal) = &self.journal {
            println!(
                "Journal saves:     {} ({} failed)",
                journal.saves, journal.failed_saves
            );
        }

        if self.open_trades.is_empty() {
            println!("\nNo open trades");
            return;
        }
        println!("\nOpen trades:");
        for trade in &self.open_trades {
            println!(
                "  {} {} {} x {} @ {} ({:?}, opened {})",
                trade.id, trade.side, trade.symbol, trade.volume, trade.price, trade.tranche, trade.opened_at
            );
        }
    }
}

pub async fn run(args: ReplayArgs, config_path: &Path) -> Result<()> {
    let config = load_validated(config_path).context("Failed to load configuration")?;

    if !args.data.exists() {
        anyhow::bail!(
            "Data path '{}' does not exist. Provide a CSV file or a directory of <SYMBOL>.csv files",
            args.data.display()
        );
    }
    let data = args
        .data
        .to_str()
        .context("Data path is not valid UTF-8")?;

    let symbols = if args.symbols.is_empty() {
        config.symbols()
    } else {
        args.symbols.clone()
    };
    let timestamps = if args.close_times {
        TimestampKind::Close
    } else {
        TimestampKind::Open
    };

    info!("Loading candles for {} from {}", symbols.join(","), data);
    let candles = load_csv_replay(data, &symbols, config.strategy.timeframe, timestamps)?;
    info!("Loaded {} candles", candles.len());

    let store: Option<Arc<dyn TradeStore>> = if config.journal.enabled && !args.no_journal {
        Some(Arc::new(JsonTradeStore::new(&config.journal.path)))
    } else {
        None
    };

    let summary = replay(&config, candles, store).await?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => summary.print(),
    }

    Ok(())
}

/// Drive `candles` through a fresh engine wired to a paper venue.
///
/// Each candle is offered to the venue first, so resting orders fill against
/// it before the engine sees it close.
pub async fn replay(
    config: &AppConfig,
    candles: Vec<Candle>,
    store: Option<Arc<dyn TradeStore>>,
) -> Result<ReplaySummary> {
    let (handle, events) = EngineHandle::channel();
    let venue = Arc::new(PaperVenue::with_config(
        Arc::new(handle.clone()),
        config.paper.clone(),
    ));
    let router: Arc<dyn OrderRouter> = venue.clone();

    let detector = VolumeBreakoutDetector::new(config.detector_config());
    let mut engine = BreakoutEngine::new(
        config.engine_settings()?,
        Box::new(detector),
        config.instrument_registry(),
        router,
    );
    engine.log_parameters();

    let journal = store.as_ref().map(|store| {
        TradeJournal::new(Arc::clone(store), config.strategy.name.clone()).spawn(engine.subscribe())
    });
    if let Some(store) = &store {
        let restored = engine.rehydrate(store.as_ref()).await?;
        if restored > 0 {
            info!("Replay starts with {} restored trades", restored);
        }
    }

    let task = volbreak_engine::spawn(engine, events);

    let total = candles.len();
    for candle in candles {
        venue.on_candle(&candle);
        handle.candle(candle)?;
        handle.snapshot().await?;
    }

    let mut snapshot = handle.snapshot().await?;
    for _ in 1..SETTLE_ROUNDS {
        snapshot = handle.snapshot().await?;
    }

    handle.shutdown()?;
    let engine = task.await.context("Engine task failed")?;
    drop(engine);

    let journal = match journal {
        Some(task) => match task.await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("Trade journal task failed: {}", e);
                None
            }
        },
        None => None,
    };

    Ok(ReplaySummary {
        strategy: snapshot.strategy,
        candles: total,
        stats: snapshot.stats,
        open_trades: snapshot.trades,
        live_orders: snapshot.live_orders.len(),
        venue_orders: venue.open_orders().len(),
        journal,
    })
}
