//! Shared fixtures for engine tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use volbreak_core::{
    error::VenueError,
    traits::OrderRouter,
    types::{Candle, Instrument, InstrumentRegistry, Order, OrderId, Timeframe},
};
use volbreak_signal::{SessionConfig, VolumeBreakoutConfig, VolumeBreakoutDetector};

use crate::engine::{BreakoutEngine, EngineSettings};

/// Router that records every call and never reports back.
#[derive(Default)]
pub struct RecordingRouter {
    submitted: Mutex<Vec<Order>>,
    cancelled: Mutex<Vec<OrderId>>,
    refuse: bool,
    refuse_exits: bool,
}

impl RecordingRouter {
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Default::default()
        }
    }

    /// Accepts entries, refuses take-profit orders.
    pub fn refusing_exits() -> Self {
        Self {
            refuse_exits: true,
            ..Default::default()
        }
    }

    pub fn submitted(&self) -> Vec<Order> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<OrderId> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderRouter for RecordingRouter {
    async fn submit(&self, order: &Order) -> Result<(), VenueError> {
        self.submitted.lock().unwrap().push(order.clone());
        if self.refuse || (self.refuse_exits && order.tag.trade_id().is_some()) {
            return Err(VenueError::OrderRejected("trading halted".into()));
        }
        Ok(())
    }

    async fn cancel(&self, order: &Order) -> Result<(), VenueError> {
        self.cancelled.lock().unwrap().push(order.id);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn detector(length: usize) -> VolumeBreakoutDetector {
    VolumeBreakoutDetector::new(VolumeBreakoutConfig {
        timeframe: Timeframe::Minute5,
        length,
        volume_factor: dec!(3),
        candle_size_pct: dec!(1),
        body_pct: dec!(60),
        volume_window_offset: 1,
        session: SessionConfig::default(),
    })
}

pub fn instruments() -> InstrumentRegistry {
    InstrumentRegistry::new([Instrument::new("SBER", dec!(0.01), dec!(10))])
}

pub fn engine_with(router: Arc<dyn OrderRouter>, settings: EngineSettings) -> BreakoutEngine {
    BreakoutEngine::new(settings, Box::new(detector(3)), instruments(), router)
}

/// Three quiet candles then a bullish 100 -> 105 breakout on five times the
/// volume, closing from 11:05 UTC.
pub fn breakout_candles(symbol: &str) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 11, 5, 0).unwrap();
    let mut candles: Vec<Candle> = (0..3)
        .map(|i| {
            Candle::new(
                symbol,
                start + Duration::minutes(5 * i),
                dec!(100),
                dec!(100.5),
                dec!(99.5),
                dec!(100),
                dec!(100),
            )
        })
        .collect();
    candles.push(Candle::new(
        symbol,
        start + Duration::minutes(15),
        dec!(100),
        dec!(106),
        dec!(99),
        dec!(105),
        dec!(500),
    ));
    candles
}
