//! Local mirror of the orders the strategy has routed.
//!
//! The venue is authoritative; this book follows it through venue events so
//! the engine can find the orders to cancel without querying the venue.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use volbreak_core::types::{Execution, Order, OrderId, OrderState, TradeId, Tranche};

/// A routed order plus the engine's bookkeeping about it.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedOrder {
    pub order: Order,
    /// Trade this order is cancelled together with, besides its own tag
    pub linked_trade: Option<TradeId>,
    /// A cancel was already sent for this order
    pub cancel_requested: bool,
    /// Wanted cancelled while still unacknowledged; the cancel goes out on
    /// registration
    pub cancel_deferred: bool,
}

impl TrackedOrder {
    fn references(&self, trade_id: TradeId) -> bool {
        self.order.tag.trade_id() == Some(trade_id) || self.linked_trade == Some(trade_id)
    }

    /// Not terminal and no cancel sent or scheduled yet. Pending orders
    /// count: they may still come to rest on the venue.
    pub fn is_cancel_candidate(&self) -> bool {
        !self.order.state.is_terminal() && !self.cancel_requested && !self.cancel_deferred
    }
}

#[derive(Debug, Default)]
pub struct OrderBook {
    orders: HashMap<OrderId, TrackedOrder>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, order: Order) {
        self.orders.insert(
            order.id,
            TrackedOrder {
                order,
                linked_trade: None,
                cancel_requested: false,
                cancel_deferred: false,
            },
        );
    }

    pub fn get(&self, id: &OrderId) -> Option<&TrackedOrder> {
        self.orders.get(id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Pending -> Active. Returns `false` for unknown orders and for orders
    /// that already left the pending state.
    pub fn mark_registered(&mut self, id: OrderId, venue_id: Option<String>) -> bool {
        let Some(tracked) = self.orders.get_mut(&id) else {
            return false;
        };
        if venue_id.is_some() {
            tracked.order.venue_id = venue_id;
        }
        if tracked.order.state != OrderState::Pending {
            return false;
        }
        tracked.order.set_state(OrderState::Active);
        true
    }

    /// Add executions to an order. Returns the volume still open, or `None`
    /// for unknown orders.
    pub fn record_executions(&mut self, id: OrderId, executions: &[Execution]) -> Option<Decimal> {
        let tracked = self.orders.get_mut(&id)?;
        for execution in executions {
            tracked.order.add_execution(execution);
        }
        Some(tracked.order.remaining_volume())
    }

    /// Move an order into a terminal state.
    ///
    /// Returns a copy of the order if this call performed the transition;
    /// `None` for unknown orders and for orders that were already terminal.
    pub fn mark_terminal(&mut self, id: OrderId, state: OrderState) -> Option<Order> {
        debug_assert!(state.is_terminal());
        let tracked = self.orders.get_mut(&id)?;
        if tracked.order.state.is_terminal() {
            return None;
        }
        tracked.order.set_state(state);
        Some(tracked.order.clone())
    }

    pub fn request_cancel(&mut self, id: OrderId) {
        if let Some(tracked) = self.orders.get_mut(&id) {
            tracked.cancel_requested = true;
        }
    }

    /// Remember to cancel a pending order once the venue registers it.
    pub fn defer_cancel(&mut self, id: OrderId) {
        if let Some(tracked) = self.orders.get_mut(&id) {
            tracked.cancel_deferred = true;
        }
    }

    /// Clear and return the deferred-cancel flag of a registered order.
    pub fn take_deferred_cancel(&mut self, id: OrderId) -> bool {
        match self.orders.get_mut(&id) {
            Some(tracked) if tracked.cancel_deferred && tracked.order.state == OrderState::Active => {
                tracked.cancel_deferred = false;
                true
            }
            _ => false,
        }
    }

    /// Live entry orders of `symbol`, pending or resting, that still need a
    /// cancel.
    pub fn live_entries(&self, symbol: &str) -> Vec<OrderId> {
        let mut ids: Vec<&TrackedOrder> = self
            .orders
            .values()
            .filter(|t| t.order.symbol == symbol && t.order.tag.is_entry() && t.is_cancel_candidate())
            .collect();
        ids.sort_by_key(|t| t.order.created_at);
        ids.into_iter().map(|t| t.order.id).collect()
    }

    /// Live orders tied to `trade_id`, other than `except`, that still need
    /// a cancel.
    pub fn live_referencing(&self, trade_id: TradeId, except: OrderId) -> Vec<OrderId> {
        let mut ids: Vec<&TrackedOrder> = self
            .orders
            .values()
            .filter(|t| t.order.id != except && t.references(trade_id) && t.is_cancel_candidate())
            .collect();
        ids.sort_by_key(|t| t.order.created_at);
        ids.into_iter().map(|t| t.order.id).collect()
    }

    /// Tie the live entry order of the other tranche on `symbol` to the trade
    /// opened by `filled`, so it is cancelled when that trade closes.
    pub fn link_sibling_entry(&mut self, symbol: &str, filled: Tranche, trade_id: TradeId) -> Option<OrderId> {
        let sibling = self.orders.values_mut().find(|t| {
            t.order.symbol == symbol
                && t.order.tag.tranche() == Some(filled.sibling())
                && !t.order.state.is_terminal()
                && t.linked_trade.is_none()
        })?;
        sibling.linked_trade = Some(trade_id);
        Some(sibling.order.id)
    }

    /// Orders not yet terminal, oldest first.
    pub fn live_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .values()
            .filter(|t| !t.order.state.is_terminal())
            .map(|t| t.order.clone())
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    /// Drop orders that reached a terminal state.
    pub fn prune_terminal(&mut self) -> usize {
        let before = self.orders.len();
        self.orders.retain(|_, t| !t.order.state.is_terminal());
        before - self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use volbreak_core::types::{OrderRequest, OrderTag, Side};

    fn order(symbol: &str, tag: OrderTag) -> Order {
        Order::from_request(&OrderRequest::limit(symbol, Side::Buy, dec!(100), dec!(10), tag))
    }

    fn active(book: &mut OrderBook, order: Order) -> OrderId {
        let id = order.id;
        book.insert(order);
        assert!(book.mark_registered(id, Some(format!("v-{}", id))));
        id
    }

    #[test]
    fn test_registration_only_from_pending() {
        let mut book = OrderBook::new();
        let o = order("SBER", OrderTag::Entry(Tranche::Primary));
        let id = o.id;
        book.insert(o);

        assert!(book.mark_registered(id, Some("777".into())));
        assert!(!book.mark_registered(id, None));
        assert_eq!(book.get(&id).unwrap().order.venue_id.as_deref(), Some("777"));
        assert!(!book.mark_registered(OrderId::new(), None));
    }

    #[test]
    fn test_terminal_transition_happens_once() {
        let mut book = OrderBook::new();
        let id = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Primary)));

        assert!(book.mark_terminal(id, OrderState::Matched).is_some());
        assert!(book.mark_terminal(id, OrderState::Matched).is_none());
        assert!(book.mark_terminal(id, OrderState::Cancelled).is_none());
        // a late registration does not revive it
        assert!(!book.mark_registered(id, None));
        assert_eq!(book.get(&id).unwrap().order.state, OrderState::Matched);
    }

    #[test]
    fn test_live_entries_by_symbol() {
        let mut book = OrderBook::new();
        let a = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Primary)));
        let b = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Secondary)));
        active(&mut book, order("GAZP", OrderTag::Entry(Tranche::Primary)));
        active(&mut book, order("SBER", OrderTag::Profit(TradeId::new())));
        let done = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Primary)));
        book.mark_terminal(done, OrderState::Cancelled);

        let mut found = book.live_entries("SBER");
        found.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(found, expected);

        book.request_cancel(a);
        assert_eq!(book.live_entries("SBER"), vec![b]);
    }

    #[test]
    fn test_pending_entry_cancel_waits_for_registration() {
        let mut book = OrderBook::new();
        let pending = order("SBER", OrderTag::Entry(Tranche::Primary));
        let id = pending.id;
        book.insert(pending);

        assert_eq!(book.live_entries("SBER"), vec![id]);
        book.defer_cancel(id);
        assert!(book.live_entries("SBER").is_empty());
        assert!(!book.take_deferred_cancel(id));

        assert!(book.mark_registered(id, None));
        assert!(book.take_deferred_cancel(id));
        assert!(!book.take_deferred_cancel(id));
        assert_eq!(book.live_entries("SBER"), vec![id]);
    }

    #[test]
    fn test_live_referencing_trade() {
        let mut book = OrderBook::new();
        let trade = TradeId::new();
        let exit = active(&mut book, order("SBER", OrderTag::Profit(trade)));
        let duplicate = active(&mut book, order("SBER", OrderTag::Profit(trade)));
        let sibling = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Secondary)));
        active(&mut book, order("SBER", OrderTag::Profit(TradeId::new())));

        assert_eq!(book.link_sibling_entry("SBER", Tranche::Primary, trade), Some(sibling));

        let mut found = book.live_referencing(trade, exit);
        found.sort();
        let mut expected = vec![duplicate, sibling];
        expected.sort();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_sibling_link_skips_terminal_orders() {
        let mut book = OrderBook::new();
        let old = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Secondary)));
        book.mark_terminal(old, OrderState::Cancelled);

        assert_eq!(book.link_sibling_entry("SBER", Tranche::Primary, TradeId::new()), None);
    }

    #[test]
    fn test_executions_and_pruning() {
        let mut book = OrderBook::new();
        let id = active(&mut book, order("SBER", OrderTag::Entry(Tranche::Primary)));
        let remaining = book.record_executions(
            id,
            &[Execution {
                order_id: id,
                volume: dec!(4),
                price: dec!(100),
                timestamp: Utc::now(),
            }],
        );
        assert_eq!(remaining, Some(dec!(6)));
        assert_eq!(book.live_orders().len(), 1);

        book.mark_terminal(id, OrderState::Matched);
        assert!(book.live_orders().is_empty());
        assert_eq!(book.prune_terminal(), 1);
        assert!(book.is_empty());
    }
}
