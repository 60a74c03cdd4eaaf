//! Candle sources and active-trade persistence.

mod csv_source;
mod trade_store;

pub use csv_source::{CsvCandleSource, TimestampKind};
pub use trade_store::JsonTradeStore;

use volbreak_core::error::DataError;
use volbreak_core::traits::merge_by_time;
use volbreak_core::types::{Candle, Timeframe};

/// Load the candles of every symbol from `path` and interleave them by close
/// time.
pub fn load_csv_replay(
    path: &str,
    symbols: &[String],
    timeframe: Timeframe,
    timestamps: TimestampKind,
) -> Result<Vec<Candle>, DataError> {
    let source = CsvCandleSource::new(path)?.with_timestamps(timestamps);
    let histories = symbols
        .iter()
        .map(|symbol| source.load(symbol, timeframe))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(merge_by_time(histories))
}
