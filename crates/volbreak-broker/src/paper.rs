//! Paper venue for replays and simulation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use volbreak_core::error::VenueError;
use volbreak_core::traits::{OrderRouter, VenueEvent, VenueListener};
use volbreak_core::types::{Candle, Execution, Order, OrderId, OrderState, Side};

/// Paper venue settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperVenueConfig {
    /// Most volume one order can fill per candle, `None` fills at once
    pub max_fill_volume: Option<Decimal>,
}

struct RestingOrder {
    order: Order,
    /// Close time of the last candle seen for the symbol when the order came in
    placed_after: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct VenueState {
    orders: HashMap<OrderId, RestingOrder>,
    last_candle: HashMap<String, DateTime<Utc>>,
}

/// Simulated venue matching limit orders against candles.
///
/// Orders rest until a later candle of their instrument trades through the
/// limit price, and fill at the limit. Outcomes are reported to the listener
/// synchronously, the same way a venue connector would call back.
pub struct PaperVenue {
    state: Mutex<VenueState>,
    listener: Arc<dyn VenueListener>,
    config: PaperVenueConfig,
    next_venue_id: AtomicU64,
}

impl PaperVenue {
    /// Create a new paper venue reporting to `listener`.
    pub fn new(listener: Arc<dyn VenueListener>) -> Self {
        Self::with_config(listener, PaperVenueConfig::default())
    }

    pub fn with_config(listener: Arc<dyn VenueListener>, config: PaperVenueConfig) -> Self {
        Self {
            state: Mutex::new(VenueState::default()),
            listener,
            config,
            next_venue_id: AtomicU64::new(1),
        }
    }

    /// Match resting orders of the candle's instrument against it.
    ///
    /// Expired orders are cancelled first. Returns the number of events
    /// reported.
    pub fn on_candle(&self, candle: &Candle) -> usize {
        let events = {
            let mut state = self.lock();
            state
                .last_candle
                .insert(candle.symbol.clone(), candle.timestamp);

            let mut ids: Vec<OrderId> = state
                .orders
                .values()
                .filter(|r| r.order.symbol == candle.symbol && !r.order.state.is_terminal())
                .map(|r| r.order.id)
                .collect();
            ids.sort_by_key(|id| state.orders.get(id).map(|r| r.order.created_at));

            let mut events = Vec::new();
            for id in ids {
                if let Some(resting) = state.orders.get_mut(&id) {
                    self.match_order(resting, candle, &mut events);
                }
            }
            events
        };

        let count = events.len();
        for event in events {
            self.listener.on_venue_event(event);
        }
        count
    }

    fn match_order(&self, resting: &mut RestingOrder, candle: &Candle, events: &mut Vec<VenueEvent>) {
        let order = &mut resting.order;

        if order.expiry.is_some_and(|expiry| expiry <= candle.timestamp) {
            order.set_state(OrderState::Cancelled);
            debug!("Paper order {} ({}) expired", order.id, order.tag);
            events.push(VenueEvent::Cancelled { order_id: order.id });
            return;
        }

        if resting.placed_after.is_some_and(|placed| candle.timestamp <= placed) {
            return;
        }

        let best = match order.side {
            Side::Buy => candle.low,
            Side::Sell => candle.high,
        };
        if !order.crosses(best) {
            return;
        }

        let remaining = order.remaining_volume();
        let volume = match self.config.max_fill_volume {
            Some(max) if max > Decimal::ZERO => remaining.min(max),
            _ => remaining,
        };
        let execution = Execution {
            order_id: order.id,
            volume,
            price: order.price,
            timestamp: candle.timestamp,
        };
        order.add_execution(&execution);
        events.push(VenueEvent::Executions {
            order_id: order.id,
            executions: vec![execution],
        });

        if order.remaining_volume() <= Decimal::ZERO {
            order.set_state(OrderState::Matched);
            info!(
                "Paper fill: {} {} {} x {} @ {} ({})",
                order.id, order.side, order.symbol, order.volume, order.price, order.tag
            );
            events.push(VenueEvent::FullyMatched { order_id: order.id });
        }
    }

    /// Get a copy of an order.
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.lock().orders.get(id).map(|r| r.order.clone())
    }

    /// Orders still resting, oldest first.
    pub fn open_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .values()
            .filter(|r| r.order.is_cancelable())
            .map(|r| r.order.clone())
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }

    fn lock(&self) -> MutexGuard<'_, VenueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl OrderRouter for PaperVenue {
    async fn submit(&self, order: &Order) -> Result<(), VenueError> {
        if order.volume <= Decimal::ZERO {
            return Err(VenueError::OrderRejected(format!(
                "Volume must be positive, got {}",
                order.volume
            )));
        }
        if order.price <= Decimal::ZERO {
            return Err(VenueError::OrderRejected(format!(
                "Limit price must be positive, got {}",
                order.price
            )));
        }

        let venue_id = self.next_venue_id.fetch_add(1, Ordering::Relaxed).to_string();
        {
            let mut state = self.lock();
            if state.orders.contains_key(&order.id) {
                return Err(VenueError::OrderRejected(format!("Duplicate order {}", order.id)));
            }
            let mut accepted = order.clone();
            accepted.venue_id = Some(venue_id.clone());
            accepted.set_state(OrderState::Active);
            let placed_after = state.last_candle.get(&order.symbol).copied();
            state.orders.insert(
                order.id,
                RestingOrder {
                    order: accepted,
                    placed_after,
                },
            );
        }

        debug!(
            "Paper order {} registered as {}: {} {} x {} @ {} ({})",
            order.id, venue_id, order.side, order.symbol, order.volume, order.price, order.tag
        );
        self.listener.on_venue_event(VenueEvent::Registered {
            order_id: order.id,
            venue_id: Some(venue_id),
        });
        Ok(())
    }

    async fn cancel(&self, order: &Order) -> Result<(), VenueError> {
        {
            let mut state = self.lock();
            let resting = state
                .orders
                .get_mut(&order.id)
                .ok_or(VenueError::OrderNotFound(order.id))?;

            if resting.order.state.is_terminal() {
                return Err(VenueError::AlreadyTerminal(order.id));
            }
            resting.order.set_state(OrderState::Cancelled);
        }

        debug!("Paper order {} cancelled", order.id);
        self.listener.on_venue_event(VenueEvent::Cancelled { order_id: order.id });
        Ok(())
    }

    fn name(&self) -> &str {
        "Paper Venue"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use volbreak_core::types::{OrderRequest, OrderTag, Tranche};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<VenueEvent>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<VenueEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl VenueListener for Recorder {
        fn on_venue_event(&self, event: VenueEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn candle(minute: i64, low: Decimal, high: Decimal) -> Candle {
        Candle::new("SBER", at(minute), low, high, low, high, dec!(100))
    }

    fn buy(price: Decimal, volume: Decimal) -> Order {
        Order::from_request(
            &OrderRequest::limit("SBER", Side::Buy, price, volume, OrderTag::Entry(Tranche::Primary))
                .with_expiry(at(60)),
        )
    }

    fn venue() -> (PaperVenue, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (PaperVenue::new(recorder.clone()), recorder)
    }

    #[tokio::test]
    async fn test_submit_registers_order() {
        let (venue, recorder) = venue();
        let order = buy(dec!(100), dec!(10));

        venue.submit(&order).await.unwrap();

        let events = recorder.take();
        assert_eq!(
            events,
            vec![VenueEvent::Registered {
                order_id: order.id,
                venue_id: Some("1".into()),
            }]
        );
        assert_eq!(venue.open_orders().len(), 1);
        assert!(venue.submit(&order).await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_orders_are_refused() {
        let (venue, recorder) = venue();
        assert!(venue.submit(&buy(dec!(100), Decimal::ZERO)).await.is_err());
        assert!(venue.submit(&buy(Decimal::ZERO, dec!(1))).await.is_err());
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_fill_on_later_candle_crossing_limit() {
        let (venue, recorder) = venue();
        venue.on_candle(&candle(0, dec!(99), dec!(101)));
        let order = buy(dec!(100), dec!(10));
        venue.submit(&order).await.unwrap();
        recorder.take();

        // a candle not later than submission is ignored
        assert_eq!(venue.on_candle(&candle(0, dec!(99), dec!(101))), 0);
        // above the limit
        assert_eq!(venue.on_candle(&candle(5, dec!(100.5), dec!(102))), 0);

        assert_eq!(venue.on_candle(&candle(10, dec!(99.5), dec!(101))), 2);
        let events = recorder.take();
        assert!(matches!(&events[0], VenueEvent::Executions { executions, .. } if executions[0].volume == dec!(10) && executions[0].price == dec!(100)));
        assert_eq!(events[1], VenueEvent::FullyMatched { order_id: order.id });
        assert_eq!(venue.order(&order.id).unwrap().state, OrderState::Matched);
        assert!(venue.open_orders().is_empty());
    }

    #[tokio::test]
    async fn test_partial_fills() {
        let recorder = Arc::new(Recorder::default());
        let venue = PaperVenue::with_config(
            recorder.clone(),
            PaperVenueConfig {
                max_fill_volume: Some(dec!(4)),
            },
        );
        let order = buy(dec!(100), dec!(10));
        venue.submit(&order).await.unwrap();
        recorder.take();

        venue.on_candle(&candle(5, dec!(99), dec!(101)));
        venue.on_candle(&candle(10, dec!(99), dec!(101)));
        assert_eq!(recorder.take().len(), 2);
        assert_eq!(venue.order(&order.id).unwrap().filled_volume, dec!(8));

        venue.on_candle(&candle(15, dec!(99), dec!(101)));
        let events = recorder.take();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], VenueEvent::FullyMatched { order_id: order.id });
    }

    #[tokio::test]
    async fn test_expired_orders_are_cancelled() {
        let (venue, recorder) = venue();
        let order = buy(dec!(100), dec!(10));
        venue.submit(&order).await.unwrap();
        recorder.take();

        venue.on_candle(&candle(60, dec!(90), dec!(110)));
        assert_eq!(recorder.take(), vec![VenueEvent::Cancelled { order_id: order.id }]);
        assert_eq!(venue.order(&order.id).unwrap().state, OrderState::Cancelled);
    }

    #[tokio::test]
    async fn test_cancel_of_terminal_order_is_refused() {
        let (venue, recorder) = venue();
        let order = buy(dec!(100), dec!(10));
        venue.submit(&order).await.unwrap();

        venue.cancel(&order).await.unwrap();
        assert!(matches!(
            venue.cancel(&order).await,
            Err(VenueError::AlreadyTerminal(id)) if id == order.id
        ));
        assert!(matches!(
            venue.cancel(&buy(dec!(1), dec!(1))).await,
            Err(VenueError::OrderNotFound(_))
        ));
        assert_eq!(recorder.take().len(), 2);
    }
}
