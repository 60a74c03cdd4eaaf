//! Core types and traits for the volume breakout strategy.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, CandleSeries)
//! - Order, trade and signal types
//! - Instrument reference data
//! - Collaborator traits for signal detection, order routing, market data
//!   and trade persistence

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use traits::*;
pub use types::*;
