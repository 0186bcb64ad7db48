//! Indicator library.
//!
//! Every indicator is a pure function of its input: a series in, a parallel
//! series out, front-padded with `f64::NAN` for the warm-up window. Series-based
//! free functions (`ema_of_series`, `rsi_of_series`, ...) do the arithmetic;
//! candle-based indicators also implement [`Indicator`] so callers can treat
//! them uniformly by name and lookback.

pub mod adx;
pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use adx::{adx_of_candles, Adx};
pub use atr::{atr_of_candles, true_range, Atr};
pub use bollinger::{bollinger_of_series, Bollinger, BollingerBand, BollingerSeries};
pub use ema::{ema_of_series, Ema};
pub use macd::{macd_of_series, Macd, MacdComponent, MacdSeries};
pub use rsi::{rsi_of_series, Rsi};
pub use sma::{sma_of_series, Sma};

use crate::domain::Candle;

/// Trait for candle-based indicators.
///
/// Indicators take a full candle series and produce a numeric output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warm-up).
///
/// # Look-ahead guard
/// No value at index t may depend on candles after t: computing over a
/// truncated series must reproduce the prefix of the full computation.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "ema_50", "atr_14").
    fn name(&self) -> &str;

    /// Number of leading positions that are undefined.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire candle series.
    fn compute(&self, candles: &[Candle]) -> Vec<f64>;
}

/// Value at `index`, or `None` when out of range or still undefined.
pub fn defined_at(series: &[f64], index: usize) -> Option<f64> {
    series.get(index).copied().filter(|v| v.is_finite())
}

/// Last defined value of a series, or `None` if the final slot is undefined.
pub fn last_defined(series: &[f64]) -> Option<f64> {
    series.len().checked_sub(1).and_then(|i| defined_at(series, i))
}

/// Create synthetic 5-minute candles from close prices for testing.
///
/// open = previous close (or close for the first candle),
/// high = max(open, close) + 1.0, low = min(open, close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Candle {
                open_time: base + Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Create candles from explicit (open, high, low, close) tuples for testing.
#[cfg(test)]
pub fn make_ohlc_candles(data: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    use chrono::{Duration, TimeZone, Utc};
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| Candle {
            open_time: base + Duration::minutes(5 * i as i64),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_at_skips_nan_and_out_of_range() {
        let series = [f64::NAN, 1.0, f64::INFINITY];
        assert_eq!(defined_at(&series, 0), None);
        assert_eq!(defined_at(&series, 1), Some(1.0));
        assert_eq!(defined_at(&series, 2), None);
        assert_eq!(defined_at(&series, 3), None);
    }

    #[test]
    fn last_defined_reads_final_slot() {
        assert_eq!(last_defined(&[1.0, 2.0]), Some(2.0));
        assert_eq!(last_defined(&[1.0, f64::NAN]), None);
        assert_eq!(last_defined(&[]), None);
    }
}
