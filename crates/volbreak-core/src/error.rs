//! Error types for the strategy.

use thiserror::Error;

use crate::types::OrderId;

/// Top-level error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Trade store error: {0}")]
    Store(#[from] StoreError),

    #[error("Engine is not running")]
    Stopped,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Strategy parameter errors.
#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {required} candles, have {available}")]
    InsufficientData { required: usize, available: usize },
}

/// Order-routing errors. All of them are recoverable for the engine.
#[derive(Error, Debug)]
pub enum VenueError {
    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order {0} is already in a terminal state")]
    AlreadyTerminal(OrderId),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Connection error: {0}")]
    Connection(String),
}

/// Market-data errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available at {0}")]
    NoDataAvailable(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Active-trade persistence errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
