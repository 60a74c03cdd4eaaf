//! Time-of-day gate keeping evaluation off until the volume window is full.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Exchange session parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session open in exchange local time
    pub open: NaiveTime,
    /// Exchange offset from UTC in minutes
    pub utc_offset_minutes: i32,
    /// Added to the candle close time before reading the clock
    pub clock_skew_secs: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            utc_offset_minutes: 0,
            clock_skew_secs: 5,
        }
    }
}

/// Passes once `warmup_minutes` have elapsed since the session open.
#[derive(Debug, Clone)]
pub struct SessionGate {
    open_minute: u32,
    warmup_minutes: u32,
    offset: FixedOffset,
    skew: Duration,
}

impl SessionGate {
    /// Gate for a `length`-candle window of `timeframe_minutes` candles.
    pub fn new(config: &SessionConfig, timeframe_minutes: u32, length: usize) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix());
        let length = u32::try_from(length).unwrap_or(u32::MAX);
        Self {
            open_minute: minute_of_day(config.open),
            warmup_minutes: timeframe_minutes.saturating_mul(length),
            offset,
            skew: Duration::seconds(config.clock_skew_secs),
        }
    }

    /// First minute of the day (exchange time) at which evaluation runs.
    pub fn first_minute(&self) -> u32 {
        self.open_minute.saturating_add(self.warmup_minutes)
    }

    /// Whether a candle closing at `at` may be evaluated.
    pub fn is_open(&self, at: DateTime<Utc>) -> bool {
        let local = (at + self.skew).with_timezone(&self.offset).time();
        minute_of_day(local) >= self.first_minute()
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
    }

    #[test]
    fn test_gate_opens_after_window_fills() {
        // 10:00 + 5m * 20 = 11:40
        let gate = SessionGate::new(&SessionConfig::default(), 5, 20);
        assert_eq!(gate.first_minute(), 700);

        assert!(!gate.is_open(at(9, 0, 0)));
        assert!(!gate.is_open(at(11, 35, 0)));
        assert!(gate.is_open(at(11, 40, 0)));
        assert!(gate.is_open(at(18, 0, 0)));
    }

    #[test]
    fn test_clock_skew_rounds_up_to_next_minute() {
        let gate = SessionGate::new(&SessionConfig::default(), 5, 20);
        assert!(!gate.is_open(at(11, 39, 54)));
        assert!(gate.is_open(at(11, 39, 55)));
    }

    #[test]
    fn test_exchange_offset() {
        let config = SessionConfig {
            utc_offset_minutes: 180,
            ..Default::default()
        };
        let gate = SessionGate::new(&config, 1, 10);

        // 07:10 UTC is 10:10 in UTC+3
        assert!(!gate.is_open(at(7, 9, 0)));
        assert!(gate.is_open(at(7, 10, 0)));
    }
}
