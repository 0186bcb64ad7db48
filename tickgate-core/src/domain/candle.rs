//! Candle: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV candle for one interval of one timeframe.
///
/// Immutable once fetched. Volume is in base-asset units and may be fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Returns true if any OHLCV field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan()
            || self.high.is_nan()
            || self.low.is_nan()
            || self.close.is_nan()
            || self.volume.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close > 0.0
            && self.volume >= 0.0
    }
}

/// Time-ascending sequence of closed candles for one timeframe.
///
/// Built either from a raw fetch (whose trailing candle is still forming and
/// gets dropped) or from candles already known to be closed.
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    timeframe: String,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series from a raw exchange fetch, discarding the still-forming
    /// trailing candle.
    pub fn from_fetched(timeframe: impl Into<String>, mut candles: Vec<Candle>) -> Self {
        candles.pop();
        Self {
            timeframe: timeframe.into(),
            candles,
        }
    }

    /// Build a series from candles that are all closed.
    pub fn closed(timeframe: impl Into<String>, candles: Vec<Candle>) -> Self {
        Self {
            timeframe: timeframe.into(),
            candles,
        }
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle(minute: u32) -> Candle {
        Candle {
            open_time: Utc.with_ymd_and_hms(2024, 1, 2, 0, minute, 0).unwrap(),
            open: 100.0,
            high: 105.0,
            low: 98.0,
            close: 103.0,
            volume: 12.5,
        }
    }

    #[test]
    fn candle_is_sane() {
        assert!(sample_candle(0).is_sane());
    }

    #[test]
    fn candle_detects_void() {
        let mut candle = sample_candle(0);
        candle.volume = f64::NAN;
        assert!(candle.is_void());
        assert!(!candle.is_sane());
    }

    #[test]
    fn candle_detects_insane_high_low() {
        let mut candle = sample_candle(0);
        candle.high = 97.0;
        assert!(!candle.is_sane());
    }

    #[test]
    fn from_fetched_drops_forming_candle() {
        let candles = vec![sample_candle(0), sample_candle(5), sample_candle(10)];
        let series = CandleSeries::from_fetched("5m", candles);
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().open_time, sample_candle(5).open_time);
        assert_eq!(series.timeframe(), "5m");
    }

    #[test]
    fn from_fetched_empty_stays_empty() {
        let series = CandleSeries::from_fetched("1h", Vec::new());
        assert!(series.is_empty());
    }

    #[test]
    fn closed_keeps_every_candle() {
        let series = CandleSeries::closed("15m", vec![sample_candle(0), sample_candle(15)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![103.0, 103.0]);
    }

    #[test]
    fn candle_serialization_roundtrip() {
        let candle = sample_candle(0);
        let json = serde_json::to_string(&candle).unwrap();
        let deser: Candle = serde_json::from_str(&json).unwrap();
        assert_eq!(candle, deser);
    }
}
