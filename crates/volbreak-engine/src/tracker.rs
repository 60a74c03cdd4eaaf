//! Registry of the strategy's open trades.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use volbreak_core::types::{ActiveTrade, ExitOrderRef, Side, TradeId, Tranche};

/// What changed in the trade set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeChangeKind {
    Opened,
    Restored,
    ExitRegistered,
    VolumeChanged,
    Closed,
}

/// Notification published after every mutation of the trade set.
#[derive(Debug, Clone)]
pub struct TradesChanged {
    pub kind: TradeChangeKind,
    /// `None` for bulk changes such as a restore
    pub trade_id: Option<TradeId>,
    /// Open trades after the change
    pub trades: Arc<Vec<ActiveTrade>>,
}

/// Open trades keyed by id.
///
/// Owned by the engine task; observers follow it through [`subscribe`](Self::subscribe).
/// Publishing never blocks: a lagging subscriber loses old notifications,
/// which is harmless since each one carries the full trade set.
pub struct ActiveTradeTracker {
    trades: HashMap<TradeId, ActiveTrade>,
    changes: broadcast::Sender<TradesChanged>,
}

impl ActiveTradeTracker {
    pub fn new(notify_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(notify_capacity.max(1));
        Self {
            trades: HashMap::new(),
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradesChanged> {
        self.changes.subscribe()
    }

    /// Open a trade and return its id.
    pub fn create(
        &mut self,
        tranche: Tranche,
        symbol: &str,
        side: Side,
        price: Decimal,
        volume: Decimal,
    ) -> TradeId {
        let trade = ActiveTrade::new(tranche, symbol, side, price, volume);
        let id = trade.id;
        self.trades.insert(id, trade);
        self.notify(TradeChangeKind::Opened, Some(id));
        id
    }

    /// Load previously persisted trades. Existing entries with the same id
    /// are replaced.
    pub fn restore(&mut self, trades: Vec<ActiveTrade>) -> Vec<TradeId> {
        let ids: Vec<TradeId> = trades.iter().map(|t| t.id).collect();
        for trade in trades {
            self.trades.insert(trade.id, trade);
        }
        if !ids.is_empty() {
            self.notify(TradeChangeKind::Restored, None);
        }
        ids
    }

    pub fn remove(&mut self, id: &TradeId) -> Option<ActiveTrade> {
        let removed = self.trades.remove(id)?;
        self.notify(TradeChangeKind::Closed, Some(*id));
        Some(removed)
    }

    pub fn set_exit_order(&mut self, id: &TradeId, exit: ExitOrderRef) -> bool {
        let Some(trade) = self.trades.get_mut(id) else {
            return false;
        };
        trade.exit_order = Some(exit);
        self.notify(TradeChangeKind::ExitRegistered, Some(*id));
        true
    }

    pub fn set_volume(&mut self, id: &TradeId, volume: Decimal) -> bool {
        let Some(trade) = self.trades.get_mut(id) else {
            return false;
        };
        trade.volume = volume;
        self.notify(TradeChangeKind::VolumeChanged, Some(*id));
        true
    }

    pub fn get(&self, id: &TradeId) -> Option<&ActiveTrade> {
        self.trades.get(id)
    }

    pub fn has_open_trade(&self, symbol: &str) -> bool {
        self.trades.values().any(|t| t.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Open trades, oldest first.
    pub fn snapshot(&self) -> Vec<ActiveTrade> {
        let mut trades: Vec<ActiveTrade> = self.trades.values().cloned().collect();
        trades.sort_by(|a, b| a.opened_at.cmp(&b.opened_at).then(a.id.cmp(&b.id)));
        trades
    }

    fn notify(&self, kind: TradeChangeKind, trade_id: Option<TradeId>) {
        let change = TradesChanged {
            kind,
            trade_id,
            trades: Arc::new(self.snapshot()),
        };
        // no receivers is fine
        if self.changes.send(change).is_err() {
            debug!(?kind, "No trade observers subscribed");
        }
    }
}

impl Default for ActiveTradeTracker {
    fn default() -> Self {
        Self::new(64)
    }
}
