//! Active trade types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::{OrderId, Side, Tranche};

/// Unique identifier of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub Uuid);

impl TradeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TradeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifiers of a registered take-profit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOrderRef {
    /// Client order ID (transaction id)
    pub order_id: OrderId,
    /// Exchange-assigned ID
    pub venue_id: Option<String>,
}

/// An open position created from a matched entry order, tracked until its
/// take-profit order is fully matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveTrade {
    pub id: TradeId,
    /// Instrument code
    pub symbol: String,
    /// Side of the entry
    pub side: Side,
    /// Entry price
    pub price: Decimal,
    /// Remaining volume
    pub volume: Decimal,
    /// Entry order the trade came from
    pub tranche: Tranche,
    /// Take-profit order, set once the venue registered it
    pub exit_order: Option<ExitOrderRef>,
    pub opened_at: DateTime<Utc>,
}

impl ActiveTrade {
    /// Create a new trade with a fresh id.
    pub fn new(
        tranche: Tranche,
        symbol: impl Into<String>,
        side: Side,
        price: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            id: TradeId::new(),
            symbol: symbol.into(),
            side,
            price,
            volume,
            tranche,
            exit_order: None,
            opened_at: Utc::now(),
        }
    }

    /// Side of the order that closes this trade.
    pub fn exit_side(&self) -> Side {
        self.side.opposite()
    }

    /// Unrounded take-profit level for `take_profit_pct`.
    ///
    /// The secondary tranche aims twice as far as the primary one.
    pub fn take_profit_target(&self, take_profit_pct: Decimal) -> Decimal {
        let distance = take_profit_pct * self.tranche.take_profit_multiplier() / Decimal::ONE_HUNDRED;
        self.price * (Decimal::ONE + self.side.sign() * distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_take_profit_target_long() {
        let primary = ActiveTrade::new(Tranche::Primary, "SBER", Side::Buy, dec!(105), dec!(1));
        let secondary = ActiveTrade::new(Tranche::Secondary, "SBER", Side::Buy, dec!(105), dec!(1));

        assert_eq!(primary.take_profit_target(dec!(2)), dec!(107.1));
        assert_eq!(secondary.take_profit_target(dec!(2)), dec!(109.2));
        assert_eq!(primary.exit_side(), Side::Sell);
    }

    #[test]
    fn test_take_profit_target_short() {
        let primary = ActiveTrade::new(Tranche::Primary, "SBER", Side::Sell, dec!(200), dec!(1));
        let secondary = ActiveTrade::new(Tranche::Secondary, "SBER", Side::Sell, dec!(200), dec!(1));

        assert_eq!(primary.take_profit_target(dec!(1.5)), dec!(197));
        assert_eq!(secondary.take_profit_target(dec!(1.5)), dec!(194));
        assert_eq!(secondary.exit_side(), Side::Buy);
    }

    #[test]
    fn test_trade_ids_are_unique() {
        let a = ActiveTrade::new(Tranche::Primary, "SBER", Side::Buy, dec!(1), dec!(1));
        let b = ActiveTrade::new(Tranche::Primary, "SBER", Side::Buy, dec!(1), dec!(1));
        assert_ne!(a.id, b.id);
        assert!(a.exit_order.is_none());
    }
}
