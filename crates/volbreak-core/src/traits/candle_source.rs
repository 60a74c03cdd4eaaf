//! Market-data collaborator.

use crate::error::DataError;
use crate::types::{Candle, Timeframe};
use async_trait::async_trait;

/// Trait for sources of completed candles.
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// Load the closed candles of one instrument.
    ///
    /// # Returns
    /// Candles ordered from oldest to newest
    async fn candles(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError>;

    /// Get the data source name.
    fn name(&self) -> &str;
}

/// Merge per-instrument histories into one stream ordered by close time.
///
/// Candles closing at the same instant keep the order of `histories`.
pub fn merge_by_time(histories: Vec<Vec<Candle>>) -> Vec<Candle> {
    let mut all: Vec<(usize, Candle)> = histories
        .into_iter()
        .enumerate()
        .flat_map(|(i, candles)| candles.into_iter().map(move |c| (i, c)))
        .collect();
    all.sort_by(|(ia, a), (ib, b)| a.timestamp.cmp(&b.timestamp).then(ia.cmp(ib)));
    all.into_iter().map(|(_, c)| c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn at(symbol: &str, minute: u32) -> Candle {
        Candle::new(
            symbol,
            Utc.with_ymd_and_hms(2024, 3, 1, 10, minute, 0).unwrap(),
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(1),
            dec!(1),
        )
    }

    #[test]
    fn test_merge_by_time() {
        let merged = merge_by_time(vec![
            vec![at("SBER", 0), at("SBER", 5)],
            vec![at("GAZP", 0), at("GAZP", 10)],
        ]);
        let order: Vec<(String, u32)> = merged
            .iter()
            .map(|c| (c.symbol.clone(), chrono::Timelike::minute(&c.timestamp)))
            .collect();
        assert_eq!(
            order,
            vec![
                ("SBER".to_string(), 0),
                ("GAZP".to_string(), 0),
                ("SBER".to_string(), 5),
                ("GAZP".to_string(), 10),
            ]
        );
    }
}
