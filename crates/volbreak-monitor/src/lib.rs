//! Logging and trade-change observation.

mod journal;
mod logging;

pub use journal::{JournalStats, TradeJournal};
pub use logging::setup_logging;
