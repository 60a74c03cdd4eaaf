//! Order and trade lifecycle for the volume breakout strategy.
//!
//! The [`BreakoutEngine`] owns the candle series, the order mirror, the open
//! trades and their take-profit lifecycles. It runs on a single task fed
//! through an [`EngineHandle`].

pub mod actor;
pub mod book;
pub mod engine;
pub mod order_engine;
pub mod profit;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use actor::{run, spawn, EngineEvent, EngineEvents, EngineHandle};
pub use book::{OrderBook, TrackedOrder};
pub use engine::{BreakoutEngine, EngineSettings, EngineSnapshot, EngineStats};
pub use order_engine::{EntryPlan, OrderEngine};
pub use profit::{FullMatch, LifecycleState, ProfitOrderManager, Registration, TradeLifecycle};
pub use tracker::{ActiveTradeTracker, TradeChangeKind, TradesChanged};
