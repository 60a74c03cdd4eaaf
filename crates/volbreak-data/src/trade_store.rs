//! Active-trade persistence in a JSON file.
//!
//! One file holds the open trades of every strategy, keyed by strategy name.
//! Saves go through a temporary file and a rename, so a crash mid-write
//! leaves the previous contents in place.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;
use volbreak_core::error::StoreError;
use volbreak_core::traits::TradeStore;
use volbreak_core::types::ActiveTrade;

type Contents = BTreeMap<String, Vec<ActiveTrade>>;

pub struct JsonTradeStore {
    path: PathBuf,
    // serializes read-modify-write cycles within the process
    write_lock: Mutex<()>,
}

impl JsonTradeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every strategy's trades.
    pub fn load_all(&self) -> Result<BTreeMap<String, Vec<ActiveTrade>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Contents::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Contents::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, contents: &Contents) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_vec_pretty(contents)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TradeStore for JsonTradeStore {
    fn load_active_trades(&self, strategy: &str) -> Result<Vec<ActiveTrade>, StoreError> {
        let mut all = self.load_all()?;
        let trades = all.remove(strategy).unwrap_or_default();
        debug!("Loaded {} active trades of {} from {}", trades.len(), strategy, self.path.display());
        Ok(trades)
    }

    fn save_active_trades(&self, strategy: &str, trades: &[ActiveTrade]) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut all = self.load_all()?;
        if trades.is_empty() {
            all.remove(strategy);
        } else {
            all.insert(strategy.to_string(), trades.to_vec());
        }
        self.write_all(&all)?;
        debug!("Saved {} active trades of {} to {}", trades.len(), strategy, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use volbreak_core::types::{ExitOrderRef, OrderId, Side, Tranche};

    fn trade(symbol: &str) -> ActiveTrade {
        ActiveTrade::new(Tranche::Secondary, symbol, Side::Buy, dec!(105), dec!(10))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path().join("trades.json"));
        assert!(store.load_active_trades("Vol").unwrap().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path().join("state").join("trades.json"));

        let mut open = trade("SBER");
        open.exit_order = Some(ExitOrderRef {
            order_id: OrderId::new(),
            venue_id: Some("17".into()),
        });
        store.save_active_trades("Vol", &[open.clone(), trade("GAZP")]).unwrap();
        store.save_active_trades("Other", &[trade("LKOH")]).unwrap();

        let loaded = store.load_active_trades("Vol").unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], open);
        assert_eq!(store.load_active_trades("Other").unwrap().len(), 1);
        assert!(!dir.path().join("state").join("trades.json.tmp").exists());
    }

    #[test]
    fn test_saving_empty_set_removes_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonTradeStore::new(dir.path().join("trades.json"));

        store.save_active_trades("Vol", &[trade("SBER")]).unwrap();
        store.save_active_trades("Vol", &[]).unwrap();

        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonTradeStore::new(&path);
        assert!(matches!(
            store.load_active_trades("Vol"),
            Err(StoreError::Serialization(_))
        ));
    }
}
