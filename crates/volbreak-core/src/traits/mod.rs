//! Collaborator traits of the strategy.

mod candle_source;
mod detector;
mod router;
mod trade_store;

pub use candle_source::{merge_by_time, CandleSource};
pub use detector::SignalDetector;
pub use router::{OrderRouter, VenueEvent, VenueListener};
pub use trade_store::TradeStore;
