//! CSV candle source.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use volbreak_core::error::DataError;
use volbreak_core::traits::CandleSource;
use volbreak_core::types::{Candle, Timeframe};

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "time")]
    date: String,
    #[serde(alias = "Symbol", alias = "ticker", alias = "Ticker", default)]
    symbol: Option<String>,
    #[serde(alias = "Open", alias = "open")]
    open: String,
    #[serde(alias = "High", alias = "high")]
    high: String,
    #[serde(alias = "Low", alias = "low")]
    low: String,
    #[serde(alias = "Close", alias = "close")]
    close: String,
    #[serde(alias = "Volume", alias = "volume", alias = "vol", default)]
    volume: Option<String>,
}

/// What the timestamp column of a file denotes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampKind {
    /// Bar start; the candle closes one timeframe later
    #[default]
    Open,
    /// Bar close
    Close,
}

/// Candles from CSV files.
///
/// `path` is either a directory holding one `<SYMBOL>.csv` per instrument, or
/// a single file with a `symbol` column.
pub struct CsvCandleSource {
    path: PathBuf,
    timestamps: TimestampKind,
}

impl CsvCandleSource {
    /// Create a new CSV candle source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable(path.display().to_string()));
        }
        Ok(Self {
            path: path.to_path_buf(),
            timestamps: TimestampKind::default(),
        })
    }

    pub fn with_timestamps(mut self, timestamps: TimestampKind) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Load candles of `symbol`, sorted by close time.
    pub fn load(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        if self.path.is_dir() {
            let file = self.path.join(format!("{}.csv", symbol));
            if !file.exists() {
                return Err(DataError::SymbolNotFound(symbol.to_string()));
            }
            return self.load_from_path(&file, symbol, timeframe, false);
        }

        let candles = self.load_from_path(&self.path, symbol, timeframe, true)?;
        if candles.is_empty() {
            return Err(DataError::SymbolNotFound(symbol.to_string()));
        }
        Ok(candles)
    }

    fn load_from_path(
        &self,
        path: &Path,
        symbol: &str,
        timeframe: Timeframe,
        filter_by_symbol: bool,
    ) -> Result<Vec<Candle>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::ParseError(e.to_string()))?;

        let mut candles = Vec::new();

        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;

            if filter_by_symbol && record.symbol.as_deref() != Some(symbol) {
                continue;
            }

            let stamp = parse_timestamp(&record.date)?;
            let timestamp = match self.timestamps {
                TimestampKind::Open => stamp + timeframe.duration(),
                TimestampKind::Close => stamp,
            };

            let field = |name: &str, value: &str| {
                parse_decimal(value).map_err(|e| {
                    DataError::ParseError(format!("{}:{} {}: {}", path.display(), line + 2, name, e))
                })
            };

            candles.push(Candle::new(
                symbol,
                timestamp,
                field("open", &record.open)?,
                field("high", &record.high)?,
                field("low", &record.low)?,
                field("close", &record.close)?,
                match record.volume.as_deref() {
                    Some(v) if !v.is_empty() => field("volume", v)?,
                    _ => Decimal::ZERO,
                },
            ));
        }

        // Sort by timestamp
        candles.sort_by_key(|c| c.timestamp);

        Ok(candles)
    }
}

#[async_trait]
impl CandleSource for CsvCandleSource {
    async fn candles(&self, symbol: &str, timeframe: Timeframe) -> Result<Vec<Candle>, DataError> {
        self.load(symbol, timeframe)
    }

    fn name(&self) -> &str {
        "CSV"
    }
}

fn parse_decimal(value: &str) -> Result<Decimal, String> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| e.to_string())
}

/// Parse the timestamp formats found in candle exports.
fn parse_timestamp(date_str: &str) -> Result<DateTime<Utc>, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y%m%d %H%M%S",
        "%d.%m.%Y %H:%M:%S",
        "%d.%m.%Y %H:%M",
    ];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc());
        }
    }

    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }

    // Unix timestamp, milliseconds if more than 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        let parsed = if ts > 10_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}
