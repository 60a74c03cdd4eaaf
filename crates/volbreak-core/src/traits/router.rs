//! Order-routing collaborator and the events it reports back.

use crate::error::VenueError;
use crate::types::{Execution, Order, OrderId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Trait for the execution venue the strategy routes orders to.
///
/// Both calls are fire-and-forget: `Ok` only means the venue took the
/// request. Registration, executions and terminal states are reported later
/// as [`VenueEvent`]s through a [`VenueListener`].
#[async_trait]
pub trait OrderRouter: Send + Sync {
    /// Submit a new order.
    ///
    /// # Arguments
    /// * `order` - The order to route, with its client ID already assigned
    async fn submit(&self, order: &Order) -> Result<(), VenueError>;

    /// Request cancellation of an order.
    ///
    /// Cancelling an order that is already terminal may be refused with
    /// [`VenueError::AlreadyTerminal`]; callers treat that as a no-op.
    async fn cancel(&self, order: &Order) -> Result<(), VenueError>;

    /// Get the venue name.
    fn name(&self) -> &str;
}

/// Order lifecycle callback from the venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VenueEvent {
    /// The venue accepted the order and it is resting.
    Registered {
        order_id: OrderId,
        venue_id: Option<String>,
    },
    /// One or more (possibly partial) executions.
    Executions {
        order_id: OrderId,
        executions: Vec<Execution>,
    },
    /// The order was completely filled. Terminal.
    FullyMatched { order_id: OrderId },
    /// The order was cancelled or expired. Terminal.
    Cancelled { order_id: OrderId },
    /// The venue refused the order. Terminal.
    Rejected { order_id: OrderId, reason: String },
}

impl VenueEvent {
    /// Get the order ID this event refers to.
    pub fn order_id(&self) -> OrderId {
        match self {
            VenueEvent::Registered { order_id, .. }
            | VenueEvent::Executions { order_id, .. }
            | VenueEvent::FullyMatched { order_id }
            | VenueEvent::Cancelled { order_id }
            | VenueEvent::Rejected { order_id, .. } => *order_id,
        }
    }
}

/// Receiver of venue callbacks.
///
/// Implementations must not block: the venue may call this from inside
/// `submit` or `cancel`.
pub trait VenueListener: Send + Sync {
    fn on_venue_event(&self, event: VenueEvent);
}
