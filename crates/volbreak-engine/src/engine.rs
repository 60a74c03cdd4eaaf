//! The strategy engine: candles in, orders out, trades tracked to closure.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use volbreak_core::{
    error::{EngineResult, StrategyError, VenueError},
    traits::{OrderRouter, SignalDetector, TradeStore, VenueEvent},
    types::{
        ActiveTrade, Candle, CandleSeries, Execution, ExitOrderRef, Instrument, InstrumentRegistry, Order,
        OrderId, OrderRequest, OrderState, Timeframe, TradeId,
    },
};

use crate::book::OrderBook;
use crate::order_engine::OrderEngine;
use crate::profit::{FullMatch, ProfitOrderManager, Registration, TradeLifecycle};
use crate::tracker::{ActiveTradeTracker, TradesChanged};

/// Engine parameters not owned by the detector.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Strategy name, also the key active trades are persisted under
    pub strategy_name: String,
    pub timeframe: Timeframe,
    /// Take-profit distance from the entry price, percent
    pub take_profit_pct: Decimal,
    /// Stop distance reported with each entry, percent
    pub stop_loss_pct: Decimal,
    /// Restore persisted trades at start-up
    pub load_active_trades: bool,
    /// Cancel resting entries on every candle, not only before new entries
    pub cancel_unfilled_entries_each_bar: bool,
    /// Venue-side lifetime of entry orders
    pub entry_expiry: Duration,
    /// Candles kept per instrument; raised to the detector warm-up if lower
    pub series_capacity: usize,
    /// Buffer of the trade-change broadcast channel
    pub notify_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            strategy_name: "Vol".to_string(),
            timeframe: Timeframe::Minute5,
            take_profit_pct: dec!(2),
            stop_loss_pct: dec!(1),
            load_active_trades: false,
            cancel_unfilled_entries_each_bar: true,
            entry_expiry: Duration::days(1),
            series_capacity: 500,
            notify_capacity: 256,
        }
    }
}

impl EngineSettings {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.strategy_name.trim().is_empty() {
            return Err(StrategyError::InvalidConfig("Strategy name must not be empty".into()));
        }
        if self.take_profit_pct <= Decimal::ZERO {
            return Err(StrategyError::InvalidConfig("Take profit must be positive".into()));
        }
        if self.stop_loss_pct < Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE_HUNDRED {
            return Err(StrategyError::InvalidConfig("Stop loss must be within [0, 100)".into()));
        }
        if self.entry_expiry <= Duration::zero() {
            return Err(StrategyError::InvalidConfig("Entry expiry must be positive".into()));
        }
        Ok(())
    }
}

/// Running counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    pub candles_processed: u64,
    pub signals_fired: u64,
    pub entries_submitted: u64,
    pub trades_opened: u64,
    pub trades_closed: u64,
}

/// Point-in-time view of the engine state.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSnapshot {
    pub strategy: String,
    pub stats: EngineStats,
    pub trades: Vec<ActiveTrade>,
    pub lifecycles: Vec<TradeLifecycle>,
    pub live_orders: Vec<Order>,
}

/// Owns all strategy state. Every method runs to completion before the next
/// event is looked at, so no locking is needed inside.
pub struct BreakoutEngine {
    settings: EngineSettings,
    detector: Box<dyn SignalDetector>,
    instruments: InstrumentRegistry,
    router: Arc<dyn OrderRouter>,
    series: HashMap<String, CandleSeries>,
    book: OrderBook,
    tracker: ActiveTradeTracker,
    order_engine: OrderEngine,
    profit: ProfitOrderManager,
    stats: EngineStats,
}

impl BreakoutEngine {
    pub fn new(
        settings: EngineSettings,
        detector: Box<dyn SignalDetector>,
        instruments: InstrumentRegistry,
        router: Arc<dyn OrderRouter>,
    ) -> Self {
        let order_engine = OrderEngine::new(settings.entry_expiry, settings.stop_loss_pct);
        let profit = ProfitOrderManager::new(settings.take_profit_pct);
        let tracker = ActiveTradeTracker::new(settings.notify_capacity);
        Self {
            settings,
            detector,
            instruments,
            router,
            series: HashMap::new(),
            book: OrderBook::new(),
            tracker,
            order_engine,
            profit,
            stats: EngineStats::default(),
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TradesChanged> {
        self.tracker.subscribe()
    }

    pub fn tracker(&self) -> &ActiveTradeTracker {
        &self.tracker
    }

    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn profit(&self) -> &ProfitOrderManager {
        &self.profit
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            strategy: self.settings.strategy_name.clone(),
            stats: self.stats.clone(),
            trades: self.tracker.snapshot(),
            lifecycles: self.profit.lifecycles(),
            live_orders: self.book.live_orders(),
        }
    }

    /// Log the strategy parameters.
    pub fn log_parameters(&self) {
        info!(
            "Strategy {} ({}) via {}: timeframe={}, take_profit={}%, stop_loss={}%, warmup={} candles",
            self.settings.strategy_name,
            self.detector.name(),
            self.router.name(),
            self.settings.timeframe,
            self.settings.take_profit_pct,
            self.settings.stop_loss_pct,
            self.detector.warmup_period(),
        );
        info!(
            "Entry expiry={}h, cancel unfilled entries each bar={}, load active trades={}",
            self.settings.entry_expiry.num_hours(),
            self.settings.cancel_unfilled_entries_each_bar,
            self.settings.load_active_trades,
        );
        for code in self.instruments.codes() {
            if let Some(instrument) = self.instruments.get(&code) {
                info!(
                    "Instrument {}: volume={}, price_step={}",
                    instrument.code, instrument.volume, instrument.price_step
                );
            }
        }
    }

    /// Add or replace instrument reference data.
    pub async fn upsert_instrument(&mut self, instrument: Instrument) {
        let code = instrument.code.clone();
        info!("Instrument {} updated: volume={}, price_step={}", code, instrument.volume, instrument.price_step);
        self.instruments.insert(instrument);
        self.place_pending_exits(Some(&code)).await;
    }

    /// Load persisted trades when configured to, and place their exits.
    pub async fn rehydrate(&mut self, store: &dyn TradeStore) -> EngineResult<usize> {
        if !self.settings.load_active_trades {
            return Ok(0);
        }
        let trades = store.load_active_trades(&self.settings.strategy_name)?;
        Ok(self.restore(trades).await)
    }

    /// Track `trades` as open and place a fresh exit order for each.
    pub async fn restore(&mut self, trades: Vec<ActiveTrade>) -> usize {
        let trades: Vec<ActiveTrade> = trades
            .into_iter()
            .filter(|t| self.profit.state(&t.id).is_none())
            .map(|mut t| {
                // the exit that was resting before the restart is not ours to track
                t.exit_order = None;
                t
            })
            .collect();

        let ids = self.tracker.restore(trades);
        for id in &ids {
            self.profit.track(*id);
        }
        info!("Restored {} active trades", ids.len());
        self.place_pending_exits(None).await;
        ids.len()
    }

    /// Process a closed candle.
    pub async fn on_candle(&mut self, candle: Candle) {
        self.stats.candles_processed += 1;
        let symbol = candle.symbol.clone();
        let timestamp = candle.timestamp;

        self.place_pending_exits(Some(&symbol)).await;

        let Some(instrument) = self.instruments.get(&symbol).cloned() else {
            debug!("Ignoring candle for unconfigured instrument {}", symbol);
            return;
        };

        let capacity = self.settings.series_capacity.max(self.detector.warmup_period() + 1);
        let timeframe = self.settings.timeframe;
        self.series
            .entry(symbol.clone())
            .or_insert_with(|| CandleSeries::with_capacity(symbol.clone(), timeframe, capacity))
            .push(candle);

        if !self.detector.is_active_at(timestamp) {
            return;
        }
        if self.tracker.has_open_trade(&symbol) {
            return;
        }

        if self.settings.cancel_unfilled_entries_each_bar {
            for order_id in self.order_engine.stale_entries(&self.book, &symbol) {
                self.cancel(order_id).await;
            }
        }

        let Some(signal) = self.series.get(&symbol).and_then(|s| self.detector.evaluate(s)) else {
            self.book.prune_terminal();
            return;
        };
        self.stats.signals_fired += 1;

        let plan = self.order_engine.plan_entries(&self.book, &signal, &instrument);
        for order_id in plan.cancels {
            self.cancel(order_id).await;
        }

        let stop = self.order_engine.stop_level(signal.side, signal.reference_price, &instrument);
        for request in plan.entries {
            info!(
                "{} {} {} x {} @ {} ({}), stop {}, candle {}%, body {}%, volume {} vs avg {}",
                self.settings.strategy_name,
                request.tag,
                request.side,
                request.volume,
                request.price,
                symbol,
                stop,
                signal.metrics.candle_size_pct,
                signal.metrics.body_pct,
                signal.metrics.volume,
                signal.metrics.average_volume.unwrap_or_default().round_dp(0),
            );
            self.stats.entries_submitted += 1;
            self.submit(request).await;
        }

        self.book.prune_terminal();
    }

    /// Process a venue callback.
    pub async fn on_venue_event(&mut self, event: VenueEvent) {
        match event {
            VenueEvent::Registered { order_id, venue_id } => {
                self.on_registered(order_id, venue_id).await;
            }
            VenueEvent::Executions { order_id, executions } => {
                self.on_executions(order_id, &executions);
            }
            VenueEvent::FullyMatched { order_id } => {
                self.on_fully_matched(order_id).await;
            }
            VenueEvent::Cancelled { order_id } => {
                self.book.mark_terminal(order_id, OrderState::Cancelled);
                if let Some(trade_id) = self.profit.trade_for_exit(&order_id) {
                    warn!("Exit order {} of trade {} was cancelled, trade stays open", order_id, trade_id);
                } else {
                    debug!("Order {} cancelled", order_id);
                }
            }
            VenueEvent::Rejected { order_id, reason } => {
                self.book.mark_terminal(order_id, OrderState::Rejected);
                if let Some(trade_id) = self.profit.trade_for_exit(&order_id) {
                    warn!("Exit order {} of trade {} rejected: {}", order_id, trade_id, reason);
                } else {
                    warn!("Order {} rejected: {}", order_id, reason);
                }
            }
        }
    }

    async fn on_registered(&mut self, order_id: OrderId, venue_id: Option<String>) {
        self.book.mark_registered(order_id, venue_id.clone());
        if self.book.take_deferred_cancel(order_id) {
            self.cancel(order_id).await;
        }

        match self.profit.on_registered(order_id) {
            Registration::Registered { trade_id, close_now } => {
                self.tracker.set_exit_order(&trade_id, ExitOrderRef { order_id, venue_id });
                info!("Exit order {} registered for trade {}", order_id, trade_id);
                if close_now {
                    self.close_trade(trade_id, order_id).await;
                }
            }
            Registration::Ignored => {
                debug!("Order {} registered", order_id);
            }
        }
    }

    fn on_executions(&mut self, order_id: OrderId, executions: &[Execution]) {
        let remaining = self.book.record_executions(order_id, executions);
        if let Some((trade_id, filled)) = self.profit.on_executions(order_id, executions) {
            debug!(
                "Exit order {} of trade {}: {} filled, {:?} remaining",
                order_id, trade_id, filled, remaining
            );
        }
    }

    async fn on_fully_matched(&mut self, order_id: OrderId) {
        let transitioned = self.book.mark_terminal(order_id, OrderState::Matched);

        match self.profit.on_fully_matched(order_id) {
            FullMatch::Close(trade_id) => self.close_trade(trade_id, order_id).await,
            FullMatch::Deferred(trade_id) => {
                info!(
                    "Exit order {} of trade {} matched before registration, closing once registered",
                    order_id, trade_id
                );
            }
            FullMatch::Ignored => match transitioned {
                Some(order) if order.tag.is_entry() => self.on_entry_matched(order).await,
                Some(_) => {}
                None => debug!("Ignoring repeated or unknown fill of order {}", order_id),
            },
        }
    }

    async fn on_entry_matched(&mut self, order: Order) {
        let Some(tranche) = order.tag.tranche() else {
            return;
        };
        let price = order.avg_fill_price.unwrap_or(order.price);
        let volume = if order.filled_volume > Decimal::ZERO {
            order.filled_volume
        } else {
            order.volume
        };

        let trade_id = self.tracker.create(tranche, &order.symbol, order.side, price, volume);
        self.book.link_sibling_entry(&order.symbol, tranche, trade_id);
        self.profit.track(trade_id);
        self.stats.trades_opened += 1;
        info!(
            "Trade {} opened from {}: {} {} x {} @ {}",
            trade_id, order.tag, order.side, order.symbol, volume, price
        );

        self.place_exit(trade_id).await;
    }

    async fn close_trade(&mut self, trade_id: TradeId, exit_order: OrderId) {
        if self.tracker.remove(&trade_id).is_none() {
            debug!("Trade {} already closed", trade_id);
        }
        self.profit.mark_closed(trade_id);
        self.stats.trades_closed += 1;
        info!("Trade {} closed by exit order {}", trade_id, exit_order);

        for order_id in self.book.live_referencing(trade_id, exit_order) {
            self.cancel(order_id).await;
        }
    }

    /// Place exits for trades still lacking one, optionally only for `symbol`.
    async fn place_pending_exits(&mut self, symbol: Option<&str>) {
        for trade_id in self.profit.awaiting_exit() {
            let matches = match (symbol, self.tracker.get(&trade_id)) {
                (Some(symbol), Some(trade)) => trade.symbol == symbol,
                (None, Some(_)) => true,
                (_, None) => false,
            };
            if matches {
                self.place_exit(trade_id).await;
            }
        }
    }

    async fn place_exit(&mut self, trade_id: TradeId) {
        let Some(trade) = self.tracker.get(&trade_id).cloned() else {
            return;
        };
        let Some(instrument) = self.instruments.get(&trade.symbol) else {
            warn!(
                "No reference data for {}, exit of trade {} postponed",
                trade.symbol, trade_id
            );
            return;
        };

        let request = self.profit.exit_request(&trade, instrument);
        let order = Order::from_request(&request);
        self.profit.exit_submitted(trade_id, order.id);
        info!(
            "{} take profit for trade {}: {} {} x {} @ {}",
            self.settings.strategy_name, trade_id, order.side, order.symbol, order.volume, order.price
        );
        self.route(order).await;
    }

    async fn submit(&mut self, request: OrderRequest) {
        self.route(Order::from_request(&request)).await;
    }

    async fn route(&mut self, order: Order) {
        let order_id = order.id;
        self.book.insert(order.clone());
        if let Err(e) = self.router.submit(&order).await {
            warn!("Submission of {} order {} refused: {}", order.tag, order_id, e);
            self.book.mark_terminal(order_id, OrderState::Rejected);
        }
    }

    async fn cancel(&mut self, order_id: OrderId) {
        let Some(tracked) = self.book.get(&order_id) else {
            return;
        };
        if !tracked.is_cancel_candidate() {
            return;
        }
        if tracked.order.state == OrderState::Pending {
            debug!("Order {} not registered yet, cancel deferred", order_id);
            self.book.defer_cancel(order_id);
            return;
        }
        let order = tracked.order.clone();
        self.book.request_cancel(order_id);

        match self.router.cancel(&order).await {
            Ok(()) => debug!("Cancel requested for {} order {}", order.tag, order_id),
            Err(VenueError::AlreadyTerminal(_)) => {
                debug!("Order {} already terminal, nothing to cancel", order_id)
            }
            Err(e) => warn!("Cancel of order {} refused: {}", order_id, e),
        }
    }
}
