//! Trade journal: persists the open trades after every change.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use volbreak_core::traits::TradeStore;
use volbreak_core::types::ActiveTrade;
use volbreak_engine::{TradeChangeKind, TradesChanged};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JournalStats {
    pub changes_seen: u64,
    pub saves: u64,
    pub failed_saves: u64,
    /// Notifications skipped because the journal fell behind
    pub lagged: u64,
}

/// Follows the trade-change channel until it closes.
pub struct TradeJournal {
    store: Arc<dyn TradeStore>,
    strategy: String,
    stats: JournalStats,
}

impl TradeJournal {
    pub fn new(store: Arc<dyn TradeStore>, strategy: impl Into<String>) -> Self {
        Self {
            store,
            strategy: strategy.into(),
            stats: JournalStats::default(),
        }
    }

    /// Run on its own task.
    pub fn spawn(self, changes: broadcast::Receiver<TradesChanged>) -> JoinHandle<JournalStats> {
        tokio::spawn(self.run(changes))
    }

    pub async fn run(mut self, mut changes: broadcast::Receiver<TradesChanged>) -> JournalStats {
        loop {
            match changes.recv().await {
                Ok(change) => self.record(change).await,
                Err(RecvError::Lagged(skipped)) => {
                    // the next notification carries the full set again
                    warn!("Trade journal lagged behind by {} notifications", skipped);
                    self.stats.lagged += skipped;
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Trade journal for {} finished: {:?}", self.strategy, self.stats);
        self.stats
    }

    async fn record(&mut self, change: TradesChanged) {
        self.stats.changes_seen += 1;
        log_change(&change);
        self.save(change.trades).await;
    }

    async fn save(&mut self, trades: Arc<Vec<ActiveTrade>>) {
        let store = Arc::clone(&self.store);
        let strategy = self.strategy.clone();
        let result = tokio::task::spawn_blocking(move || store.save_active_trades(&strategy, &trades)).await;

        match result {
            Ok(Ok(())) => self.stats.saves += 1,
            Ok(Err(e)) => {
                self.stats.failed_saves += 1;
                warn!("Failed to persist active trades of {}: {}", self.strategy, e);
            }
            Err(e) => {
                self.stats.failed_saves += 1;
                warn!("Trade journal save task failed: {}", e);
            }
        }
    }
}

fn log_change(change: &TradesChanged) {
    let open = change.trades.len();
    match (change.kind, change.trade_id) {
        (TradeChangeKind::Restored, _) => info!("Restored trades, {} open", open),
        (kind, Some(id)) => match change.trades.iter().find(|t| t.id == id) {
            Some(trade) => info!(
                "Trade {} {:?}: {} {} x {} @ {}, {} open",
                id, kind, trade.side, trade.symbol, trade.volume, trade.price, open
            ),
            None => info!("Trade {} {:?}, {} open", id, kind, open),
        },
        (kind, None) => info!("Trades {:?}, {} open", kind, open),
    }
}
