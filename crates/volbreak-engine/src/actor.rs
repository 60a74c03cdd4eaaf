//! Engine task and the handle used to feed it.
//!
//! Market data and venue callbacks share one queue, so the engine sees every
//! event in arrival order and processes one at a time.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use volbreak_core::{
    error::{EngineError, EngineResult},
    traits::{VenueEvent, VenueListener},
    types::{Candle, Instrument},
};

use crate::engine::{BreakoutEngine, EngineSnapshot};

/// Input of the engine task.
#[derive(Debug)]
pub enum EngineEvent {
    Candle(Candle),
    Venue(VenueEvent),
    Instrument(Instrument),
    Snapshot(oneshot::Sender<EngineSnapshot>),
    Shutdown,
}

/// Cloneable sender side of the engine queue.
///
/// The queue is unbounded: the venue may call back from inside a `submit`
/// the engine is awaiting, and a full bounded queue would deadlock there.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::UnboundedSender<EngineEvent>,
}

pub type EngineEvents = mpsc::UnboundedReceiver<EngineEvent>;

impl EngineHandle {
    /// Create a handle and the receiver the engine task will consume.
    pub fn channel() -> (Self, EngineEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn candle(&self, candle: Candle) -> EngineResult<()> {
        self.send(EngineEvent::Candle(candle))
    }

    pub fn venue_event(&self, event: VenueEvent) -> EngineResult<()> {
        self.send(EngineEvent::Venue(event))
    }

    pub fn upsert_instrument(&self, instrument: Instrument) -> EngineResult<()> {
        self.send(EngineEvent::Instrument(instrument))
    }

    /// State after every event queued before this call has been processed.
    pub async fn snapshot(&self) -> EngineResult<EngineSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(EngineEvent::Snapshot(tx))?;
        rx.await.map_err(|_| EngineError::Stopped)
    }

    pub fn shutdown(&self) -> EngineResult<()> {
        self.send(EngineEvent::Shutdown)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: EngineEvent) -> EngineResult<()> {
        self.tx.send(event).map_err(|_| EngineError::Stopped)
    }
}

impl VenueListener for EngineHandle {
    fn on_venue_event(&self, event: VenueEvent) {
        let order_id = event.order_id();
        if self.venue_event(event).is_err() {
            warn!("Engine stopped, dropping venue event for order {}", order_id);
        }
    }
}

/// Consume events until shutdown or until every handle is dropped, then hand
/// the engine back.
pub async fn run(mut engine: BreakoutEngine, mut events: EngineEvents) -> BreakoutEngine {
    info!("Engine {} started", engine.settings().strategy_name);

    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::Candle(candle) => engine.on_candle(candle).await,
            EngineEvent::Venue(event) => engine.on_venue_event(event).await,
            EngineEvent::Instrument(instrument) => engine.upsert_instrument(instrument).await,
            EngineEvent::Snapshot(reply) => {
                if reply.send(engine.snapshot()).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            EngineEvent::Shutdown => break,
        }
    }

    let stats = engine.stats();
    info!(
        "Engine {} stopped: {} candles, {} signals, {} trades opened, {} closed, {} open",
        engine.settings().strategy_name,
        stats.candles_processed,
        stats.signals_fired,
        stats.trades_opened,
        stats.trades_closed,
        engine.tracker().len()
    );
    engine
}

/// Run the engine on its own task.
pub fn spawn(engine: BreakoutEngine, events: EngineEvents) -> JoinHandle<BreakoutEngine> {
    tokio::spawn(run(engine, events))
}
