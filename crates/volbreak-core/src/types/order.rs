//! Order types and structures.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::TradeId;

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// +1 for buy, -1 for sell.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Buy => Decimal::ONE,
            Side::Sell => -Decimal::ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Client-side order identifier, assigned before the order is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which of the two simultaneously placed entry orders an order or trade
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tranche {
    /// `enter`
    Primary,
    /// `enter2`, exits at double the take-profit distance
    Secondary,
}

impl Tranche {
    pub fn both() -> [Tranche; 2] {
        [Tranche::Primary, Tranche::Secondary]
    }

    /// Tag the tranche is known by on the venue.
    pub fn tag(&self) -> &'static str {
        match self {
            Tranche::Primary => "enter",
            Tranche::Secondary => "enter2",
        }
    }

    /// Multiplier applied to the take-profit percentage.
    pub fn take_profit_multiplier(&self) -> Decimal {
        match self {
            Tranche::Primary => Decimal::ONE,
            Tranche::Secondary => Decimal::TWO,
        }
    }

    pub fn sibling(&self) -> Tranche {
        match self {
            Tranche::Primary => Tranche::Secondary,
            Tranche::Secondary => Tranche::Primary,
        }
    }
}

/// Purpose of an order, carried with it through the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum OrderTag {
    /// Entry order of one tranche.
    Entry(Tranche),
    /// Take-profit exit of the referenced trade.
    Profit(TradeId),
}

impl OrderTag {
    pub fn is_entry(&self) -> bool {
        matches!(self, OrderTag::Entry(_))
    }

    pub fn tranche(&self) -> Option<Tranche> {
        match self {
            OrderTag::Entry(tranche) => Some(*tranche),
            OrderTag::Profit(_) => None,
        }
    }

    /// The trade this order belongs to, if any.
    pub fn trade_id(&self) -> Option<TradeId> {
        match self {
            OrderTag::Profit(id) => Some(*id),
            OrderTag::Entry(_) => None,
        }
    }
}

impl fmt::Display for OrderTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderTag::Entry(tranche) => write!(f, "{}", tranche.tag()),
            OrderTag::Profit(id) => write!(f, "p,{}", id),
        }
    }
}

/// Order state as reported by the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    /// Submitted, not yet acknowledged by the venue
    Pending,
    /// Registered and resting on the venue
    Active,
    /// Completely filled
    Matched,
    Cancelled,
    Rejected,
}

impl OrderState {
    /// Check if the order is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Matched | OrderState::Cancelled | OrderState::Rejected
        )
    }

    /// Check if the order is resting on the venue.
    pub fn is_active(&self) -> bool {
        matches!(self, OrderState::Active)
    }
}

/// Limit order request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Instrument code
    pub symbol: String,
    pub side: Side,
    /// Limit price
    pub price: Decimal,
    pub volume: Decimal,
    pub tag: OrderTag,
    /// Venue-side expiry, `None` for good-till-cancelled
    pub expiry: Option<DateTime<Utc>>,
}

impl OrderRequest {
    /// Create a limit order request.
    pub fn limit(
        symbol: impl Into<String>,
        side: Side,
        price: Decimal,
        volume: Decimal,
        tag: OrderTag,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            price,
            volume,
            tag,
            expiry: None,
        }
    }

    /// Set the expiry.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// A partial or complete execution of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Order this execution belongs to
    pub order_id: OrderId,
    pub volume: Decimal,
    pub price: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// Complete order with state and execution information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Client order ID (transaction id)
    pub id: OrderId,
    /// Exchange-assigned ID, known once the order is registered
    pub venue_id: Option<String>,
    pub symbol: String,
    pub side: Side,
    /// Limit price
    pub price: Decimal,
    /// Original volume
    pub volume: Decimal,
    pub tag: OrderTag,
    pub expiry: Option<DateTime<Utc>>,
    pub state: OrderState,
    /// Volume executed so far
    pub filled_volume: Decimal,
    /// Average execution price
    pub avg_fill_price: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Create a new order from a request.
    pub fn from_request(request: &OrderRequest) -> Self {
        let now = Utc::now();
        Self {
            id: OrderId::new(),
            venue_id: None,
            symbol: request.symbol.clone(),
            side: request.side,
            price: request.price,
            volume: request.volume,
            tag: request.tag,
            expiry: request.expiry,
            state: OrderState::Pending,
            filled_volume: Decimal::ZERO,
            avg_fill_price: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Get the remaining volume to be filled.
    pub fn remaining_volume(&self) -> Decimal {
        self.volume - self.filled_volume
    }

    /// Check if the order can be cancelled.
    pub fn is_cancelable(&self) -> bool {
        self.state.is_active()
    }

    /// Check whether a limit order would execute against `price`.
    pub fn crosses(&self, price: Decimal) -> bool {
        match self.side {
            Side::Buy => price <= self.price,
            Side::Sell => price >= self.price,
        }
    }

    /// Record an execution. State transitions are driven by venue events,
    /// not by the executed volume.
    pub fn add_execution(&mut self, execution: &Execution) {
        let total_volume = self.filled_volume + execution.volume;
        if total_volume > Decimal::ZERO {
            let total_value = self.avg_fill_price.unwrap_or(Decimal::ZERO) * self.filled_volume
                + execution.price * execution.volume;
            self.avg_fill_price = Some(total_value / total_volume);
        }
        self.filled_volume = total_volume;
        self.updated_at = Utc::now();
    }

    pub fn set_state(&mut self, state: OrderState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}
