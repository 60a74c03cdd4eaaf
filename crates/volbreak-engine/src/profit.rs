//! Take-profit lifecycle of each open trade.
//!
//! ```text
//! EntryFilled -> ExitPending -> ExitRegistered -> Closed
//! ```
//!
//! The manager only tracks state. Placing orders, mutating the trade tracker
//! and cancelling siblings is left to the engine, driven by the outcomes
//! returned here. Venue callbacks may arrive duplicated or with the full match
//! ahead of the registration; both are absorbed by the state checks.

use std::collections::{HashMap, HashSet, VecDeque};

use rust_decimal::Decimal;
use serde::Serialize;
use volbreak_core::types::{ActiveTrade, Execution, Instrument, OrderId, OrderRequest, OrderTag, TradeId};

/// Closed trade ids remembered for idempotence; the oldest are forgotten
/// first. Events for a forgotten trade still find no lifecycle and are
/// ignored.
const CLOSED_RETAINED: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Trade open, no exit order yet
    EntryFilled,
    /// Exit order submitted, venue has not registered it
    ExitPending,
    /// Exit order resting on the venue
    ExitRegistered,
    Closed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TradeLifecycle {
    pub trade_id: TradeId,
    pub state: LifecycleState,
    pub exit_order: Option<OrderId>,
    /// Full match seen while the exit was still pending
    pub matched_early: bool,
    /// Volume executed on the exit so far
    pub exit_filled_volume: Decimal,
}

impl TradeLifecycle {
    fn new(trade_id: TradeId) -> Self {
        Self {
            trade_id,
            state: LifecycleState::EntryFilled,
            exit_order: None,
            matched_early: false,
            exit_filled_volume: Decimal::ZERO,
        }
    }
}

/// Outcome of an exit registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Not an exit order, or a duplicate
    Ignored,
    /// First registration; `close_now` when the full match already arrived
    Registered { trade_id: TradeId, close_now: bool },
}

/// Outcome of a full match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullMatch {
    /// Not an exit order, or the trade is already closed
    Ignored,
    /// Exit not registered yet; closure waits for the registration
    Deferred(TradeId),
    /// Close the trade now
    Close(TradeId),
}

/// Drives every trade from entry fill to closure.
#[derive(Debug)]
pub struct ProfitOrderManager {
    take_profit_pct: Decimal,
    lifecycles: HashMap<TradeId, TradeLifecycle>,
    exits: HashMap<OrderId, TradeId>,
    closed: HashSet<TradeId>,
    closed_order: VecDeque<TradeId>,
}

impl ProfitOrderManager {
    pub fn new(take_profit_pct: Decimal) -> Self {
        Self {
            take_profit_pct,
            lifecycles: HashMap::new(),
            exits: HashMap::new(),
            closed: HashSet::new(),
            closed_order: VecDeque::new(),
        }
    }

    pub fn take_profit_pct(&self) -> Decimal {
        self.take_profit_pct
    }

    /// Start tracking a freshly opened or restored trade.
    pub fn track(&mut self, trade_id: TradeId) {
        if self.closed.contains(&trade_id) {
            return;
        }
        self.lifecycles
            .entry(trade_id)
            .or_insert_with(|| TradeLifecycle::new(trade_id));
    }

    pub fn lifecycle(&self, trade_id: &TradeId) -> Option<&TradeLifecycle> {
        self.lifecycles.get(trade_id)
    }

    pub fn state(&self, trade_id: &TradeId) -> Option<LifecycleState> {
        if self.closed.contains(trade_id) {
            return Some(LifecycleState::Closed);
        }
        self.lifecycles.get(trade_id).map(|l| l.state)
    }

    /// Take-profit price of `trade`, on the instrument's price step.
    pub fn target_price(&self, trade: &ActiveTrade, instrument: &Instrument) -> Decimal {
        instrument.shrink_price(trade.take_profit_target(self.take_profit_pct))
    }

    /// Exit order for `trade`: opposite side, full trade volume, tagged with
    /// the trade id.
    pub fn exit_request(&self, trade: &ActiveTrade, instrument: &Instrument) -> OrderRequest {
        OrderRequest::limit(
            trade.symbol.clone(),
            trade.exit_side(),
            self.target_price(trade, instrument),
            trade.volume,
            OrderTag::Profit(trade.id),
        )
    }

    /// Trades still waiting for an exit order.
    pub fn awaiting_exit(&self) -> Vec<TradeId> {
        let mut ids: Vec<TradeId> = self
            .lifecycles
            .values()
            .filter(|l| l.state == LifecycleState::EntryFilled)
            .map(|l| l.trade_id)
            .collect();
        ids.sort();
        ids
    }

    /// EntryFilled -> ExitPending.
    pub fn exit_submitted(&mut self, trade_id: TradeId, order_id: OrderId) -> bool {
        let Some(lifecycle) = self.lifecycles.get_mut(&trade_id) else {
            return false;
        };
        if lifecycle.state != LifecycleState::EntryFilled {
            return false;
        }
        lifecycle.state = LifecycleState::ExitPending;
        lifecycle.exit_order = Some(order_id);
        self.exits.insert(order_id, trade_id);
        true
    }

    /// Trade the exit order `order_id` belongs to.
    pub fn trade_for_exit(&self, order_id: &OrderId) -> Option<TradeId> {
        self.exits.get(order_id).copied()
    }

    /// ExitPending -> ExitRegistered.
    pub fn on_registered(&mut self, order_id: OrderId) -> Registration {
        let Some(lifecycle) = self.exit_lifecycle_mut(&order_id) else {
            return Registration::Ignored;
        };
        if lifecycle.state != LifecycleState::ExitPending {
            return Registration::Ignored;
        }
        lifecycle.state = LifecycleState::ExitRegistered;
        Registration::Registered {
            trade_id: lifecycle.trade_id,
            close_now: lifecycle.matched_early,
        }
    }

    /// Record exit executions. Partial fills do not move the trade.
    ///
    /// Returns the trade and the exit volume filled so far.
    pub fn on_executions(&mut self, order_id: OrderId, executions: &[Execution]) -> Option<(TradeId, Decimal)> {
        let lifecycle = self.exit_lifecycle_mut(&order_id)?;
        lifecycle.exit_filled_volume += executions.iter().map(|e| e.volume).sum::<Decimal>();
        Some((lifecycle.trade_id, lifecycle.exit_filled_volume))
    }

    /// ExitRegistered -> Closed, or buffered while ExitPending.
    pub fn on_fully_matched(&mut self, order_id: OrderId) -> FullMatch {
        let Some(lifecycle) = self.exit_lifecycle_mut(&order_id) else {
            return FullMatch::Ignored;
        };
        match lifecycle.state {
            LifecycleState::ExitPending => {
                lifecycle.matched_early = true;
                FullMatch::Deferred(lifecycle.trade_id)
            }
            LifecycleState::ExitRegistered => FullMatch::Close(lifecycle.trade_id),
            LifecycleState::EntryFilled | LifecycleState::Closed => FullMatch::Ignored,
        }
    }

    /// Terminal. Later events for the trade are ignored.
    pub fn mark_closed(&mut self, trade_id: TradeId) {
        if let Some(lifecycle) = self.lifecycles.remove(&trade_id) {
            if let Some(order_id) = lifecycle.exit_order {
                self.exits.remove(&order_id);
            }
        }
        if self.closed.insert(trade_id) {
            self.closed_order.push_back(trade_id);
        }
        while self.closed_order.len() > CLOSED_RETAINED {
            if let Some(oldest) = self.closed_order.pop_front() {
                self.closed.remove(&oldest);
            }
        }
    }

    /// Open lifecycles, sorted by trade id.
    pub fn lifecycles(&self) -> Vec<TradeLifecycle> {
        let mut all: Vec<TradeLifecycle> = self.lifecycles.values().cloned().collect();
        all.sort_by_key(|l| l.trade_id);
        all
    }

    fn exit_lifecycle_mut(&mut self, order_id: &OrderId) -> Option<&mut TradeLifecycle> {
        let trade_id = self.exits.get(order_id)?;
        self.lifecycles.get_mut(trade_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use volbreak_core::types::{Side, Tranche};

    fn manager_with_pending_exit() -> (ProfitOrderManager, TradeId, OrderId) {
        let mut manager = ProfitOrderManager::new(dec!(2));
        let trade_id = TradeId::new();
        let order_id = OrderId::new();
        manager.track(trade_id);
        assert!(manager.exit_submitted(trade_id, order_id));
        (manager, trade_id, order_id)
    }

    #[test]
    fn test_exit_request() {
        let manager = ProfitOrderManager::new(dec!(2));
        let instrument = Instrument::new("SBER", dec!(0.01), dec!(10));
        let trade = ActiveTrade::new(Tranche::Secondary, "SBER", Side::Buy, dec!(105), dec!(10));

        let request = manager.exit_request(&trade, &instrument);
        assert_eq!(request.side, Side::Sell);
        assert_eq!(request.price, dec!(109.2));
        assert_eq!(request.volume, dec!(10));
        assert_eq!(request.tag, OrderTag::Profit(trade.id));
        assert!(request.expiry.is_none());
    }

    #[test]
    fn test_target_rounds_to_price_step() {
        let manager = ProfitOrderManager::new(dec!(1.5));
        let instrument = Instrument::new("GAZP", dec!(0.05), dec!(1));
        // 151.23 * 1.015 = 153.49845
        let trade = ActiveTrade::new(Tranche::Primary, "GAZP", Side::Buy, dec!(151.23), dec!(1));
        assert_eq!(manager.target_price(&trade, &instrument), dec!(153.5));
    }

    #[test]
    fn test_happy_path() {
        let (mut manager, trade_id, order_id) = manager_with_pending_exit();
        assert_eq!(manager.state(&trade_id), Some(LifecycleState::ExitPending));
        assert_eq!(manager.trade_for_exit(&order_id), Some(trade_id));

        assert_eq!(
            manager.on_registered(order_id),
            Registration::Registered {
                trade_id,
                close_now: false
            }
        );
        assert_eq!(manager.on_fully_matched(order_id), FullMatch::Close(trade_id));

        manager.mark_closed(trade_id);
        assert_eq!(manager.state(&trade_id), Some(LifecycleState::Closed));
        assert!(manager.lifecycles().is_empty());
    }

    #[test]
    fn test_duplicate_callbacks_are_ignored() {
        let (mut manager, trade_id, order_id) = manager_with_pending_exit();

        assert!(matches!(manager.on_registered(order_id), Registration::Registered { .. }));
        assert_eq!(manager.on_registered(order_id), Registration::Ignored);

        assert_eq!(manager.on_fully_matched(order_id), FullMatch::Close(trade_id));
        manager.mark_closed(trade_id);
        assert_eq!(manager.on_fully_matched(order_id), FullMatch::Ignored);
        assert_eq!(manager.on_registered(order_id), Registration::Ignored);

        // closed trades are never tracked again
        manager.track(trade_id);
        assert!(manager.awaiting_exit().is_empty());
    }

    #[test]
    fn test_match_before_registration_is_buffered() {
        let (mut manager, trade_id, order_id) = manager_with_pending_exit();

        assert_eq!(manager.on_fully_matched(order_id), FullMatch::Deferred(trade_id));
        assert!(manager.lifecycle(&trade_id).unwrap().matched_early);
        // a repeated early match stays deferred
        assert_eq!(manager.on_fully_matched(order_id), FullMatch::Deferred(trade_id));

        assert_eq!(
            manager.on_registered(order_id),
            Registration::Registered {
                trade_id,
                close_now: true
            }
        );
    }

    #[test]
    fn test_partial_fills_do_not_move_state() {
        let (mut manager, trade_id, order_id) = manager_with_pending_exit();
        manager.on_registered(order_id);

        let exec = Execution {
            order_id,
            volume: dec!(3),
            price: dec!(107.1),
            timestamp: Utc::now(),
        };
        assert_eq!(manager.on_executions(order_id, &[exec.clone()]), Some((trade_id, dec!(3))));
        assert_eq!(manager.on_executions(order_id, &[exec]), Some((trade_id, dec!(6))));
        assert_eq!(manager.state(&trade_id), Some(LifecycleState::ExitRegistered));
        assert_eq!(manager.on_executions(OrderId::new(), &[]), None);
    }

    #[test]
    fn test_unknown_orders_are_ignored() {
        let mut manager = ProfitOrderManager::new(dec!(2));
        assert_eq!(manager.on_registered(OrderId::new()), Registration::Ignored);
        assert_eq!(manager.on_fully_matched(OrderId::new()), FullMatch::Ignored);
    }

    #[test]
    fn test_exit_submitted_once() {
        let (mut manager, trade_id, _) = manager_with_pending_exit();
        assert!(!manager.exit_submitted(trade_id, OrderId::new()));
        assert!(!manager.exit_submitted(TradeId::new(), OrderId::new()));
        assert!(manager.awaiting_exit().is_empty());
    }

    #[test]
    fn test_closed_ids_are_bounded() {
        let mut manager = ProfitOrderManager::new(dec!(2));
        let ids: Vec<TradeId> = (0..CLOSED_RETAINED + 10).map(|_| TradeId::new()).collect();
        for id in &ids {
            manager.track(*id);
            manager.mark_closed(*id);
        }
        manager.mark_closed(ids[ids.len() - 1]);

        assert_eq!(manager.closed.len(), CLOSED_RETAINED);
        assert_eq!(manager.closed_order.len(), CLOSED_RETAINED);
        assert_eq!(manager.state(&ids[0]), None);
        assert_eq!(manager.state(&ids[ids.len() - 1]), Some(LifecycleState::Closed));
        assert!(manager.lifecycles().is_empty());
    }
}
