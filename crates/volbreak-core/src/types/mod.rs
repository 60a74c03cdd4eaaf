//! Core data types for the strategy.

mod candle;
mod instrument;
mod order;
mod signal;
mod timeframe;
mod trade;

pub use candle::{Candle, CandleSeries};
pub use instrument::{Instrument, InstrumentRegistry};
pub use order::{Execution, Order, OrderId, OrderRequest, OrderState, OrderTag, Side, Tranche};
pub use signal::{Signal, SignalMetrics};
pub use timeframe::Timeframe;
pub use trade::{ActiveTrade, ExitOrderRef, TradeId};
