//! Entry order planning.

use chrono::Duration;
use rust_decimal::Decimal;
use volbreak_core::types::{Instrument, OrderId, OrderRequest, OrderTag, Side, Signal, Tranche};

use crate::book::OrderBook;

/// Orders to cancel and to submit for one fired signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPlan {
    /// Stale entry orders of the instrument
    pub cancels: Vec<OrderId>,
    /// Primary then secondary entry
    pub entries: Vec<OrderRequest>,
}

/// Turns signals into entry orders.
#[derive(Debug, Clone)]
pub struct OrderEngine {
    entry_expiry: Duration,
    stop_loss_pct: Decimal,
}

impl OrderEngine {
    pub fn new(entry_expiry: Duration, stop_loss_pct: Decimal) -> Self {
        Self {
            entry_expiry,
            stop_loss_pct,
        }
    }

    /// Live entry orders of `symbol` that should be cancelled before new
    /// entries go out.
    pub fn stale_entries(&self, book: &OrderBook, symbol: &str) -> Vec<OrderId> {
        book.live_entries(symbol)
    }

    /// Plan the cancels and the two entry orders for `signal`.
    pub fn plan_entries(&self, book: &OrderBook, signal: &Signal, instrument: &Instrument) -> EntryPlan {
        let price = instrument.shrink_price(signal.reference_price);
        let expiry = signal.timestamp + self.entry_expiry;

        let entries = Tranche::both()
            .into_iter()
            .map(|tranche| {
                OrderRequest::limit(
                    instrument.code.clone(),
                    signal.side,
                    price,
                    instrument.volume,
                    OrderTag::Entry(tranche),
                )
                .with_expiry(expiry)
            })
            .collect();

        EntryPlan {
            cancels: self.stale_entries(book, &signal.symbol),
            entries,
        }
    }

    /// Prospective stop level for an entry at `price`, on the price step.
    pub fn stop_level(&self, side: Side, price: Decimal, instrument: &Instrument) -> Decimal {
        let distance = self.stop_loss_pct / Decimal::ONE_HUNDRED;
        instrument.shrink_price(price * (Decimal::ONE - side.sign() * distance))
    }
}
