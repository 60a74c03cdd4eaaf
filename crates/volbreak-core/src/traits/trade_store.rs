//! Active-trade persistence collaborator.

use crate::error::StoreError;
use crate::types::ActiveTrade;

/// Storage of a strategy's open positions across restarts.
pub trait TradeStore: Send + Sync {
    /// Load the trades that were open when the strategy last stopped.
    ///
    /// A strategy that never saved anything has no trades.
    fn load_active_trades(&self, strategy: &str) -> Result<Vec<ActiveTrade>, StoreError>;

    /// Replace the stored set of open trades.
    fn save_active_trades(&self, strategy: &str, trades: &[ActiveTrade]) -> Result<(), StoreError>;
}
