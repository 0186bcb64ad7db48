//! Property tests for the indicator library.
//!
//! Uses proptest to verify:
//! 1. Warm-up: exactly `lookback()` leading values are undefined
//! 2. No look-ahead: a truncated series reproduces the prefix of the full one
//! 3. Short input: a series no longer than the warm-up is entirely undefined
//! 4. RSI stays within [0, 100]

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use tickgate_core::domain::Candle;
use tickgate_core::indicators::{
    rsi_of_series, Adx, Atr, Bollinger, Ema, Indicator, Macd, Rsi, Sma,
};

// ── Helpers ──────────────────────────────────────────────────────────

/// Candles from `(close change, wick)` steps. Every candle has a non-zero range.
fn candles_from(steps: &[(f64, f64)]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut close = 1000.0_f64;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(change, wick))| {
            let open = close;
            close = (close + change).max(1.0);
            Candle {
                open_time: start + Duration::minutes(5 * i as i64),
                open,
                high: open.max(close) + wick,
                low: open.min(close) - wick,
                close,
                volume: 500.0 + wick * 100.0,
            }
        })
        .collect()
}

fn arb_candles(min: usize, max: usize) -> impl Strategy<Value = Vec<Candle>> {
    prop::collection::vec((-5.0..5.0_f64, 0.1..3.0_f64), min..max).prop_map(|s| candles_from(&s))
}

fn all_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(Ema::new(10)),
        Box::new(Sma::new(10)),
        Box::new(Sma::volume(20)),
        Box::new(Atr::new(14)),
        Box::new(Adx::new(14)),
        Box::new(Bollinger::upper(20, 2.0)),
        Box::new(Bollinger::middle(20, 2.0)),
        Box::new(Bollinger::lower(20, 2.0)),
        Box::new(Macd::histogram(8, 17, 5)),
    ]
}

fn same_value(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

// ── 1. Warm-up ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn undefined_exactly_during_warmup(candles in arb_candles(60, 200)) {
        for ind in all_indicators() {
            let out = ind.compute(&candles);
            prop_assert_eq!(out.len(), candles.len(), "{}", ind.name());
            for (i, v) in out.iter().enumerate() {
                if i < ind.lookback() {
                    prop_assert!(v.is_nan(), "{} defined at warm-up index {}", ind.name(), i);
                } else {
                    prop_assert!(v.is_finite(), "{} undefined at index {}", ind.name(), i);
                }
            }
        }
    }
}

// ── 2. No look-ahead ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn truncated_series_reproduces_prefix(
        candles in arb_candles(40, 150),
        cut in 0.2..0.9_f64,
    ) {
        let k = ((candles.len() as f64) * cut) as usize;
        for ind in all_indicators().into_iter().chain([Box::new(Rsi::new(14)) as Box<dyn Indicator>]) {
            let full = ind.compute(&candles);
            let prefix = ind.compute(&candles[..k]);
            for i in 0..k {
                prop_assert!(
                    same_value(full[i], prefix[i]),
                    "{} differs at {}: {} vs {}", ind.name(), i, full[i], prefix[i]
                );
            }
        }
    }

    #[test]
    fn computation_is_deterministic(candles in arb_candles(30, 80)) {
        for ind in all_indicators() {
            let a = ind.compute(&candles);
            let b = ind.compute(&candles);
            prop_assert!(a.iter().zip(&b).all(|(x, y)| same_value(*x, *y)), "{}", ind.name());
        }
    }
}

// ── 3. Short input ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn series_within_warmup_is_all_undefined(candles in arb_candles(0, 10)) {
        for ind in all_indicators() {
            if candles.len() > ind.lookback() {
                continue;
            }
            let out = ind.compute(&candles);
            prop_assert_eq!(out.len(), candles.len());
            prop_assert!(out.iter().all(|v| v.is_nan()), "{}", ind.name());
        }
    }
}

// ── 4. RSI bounds ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn rsi_within_bounds(closes in prop::collection::vec(1.0..500.0_f64, 20..120)) {
        let rsi = rsi_of_series(&closes, 14);
        for (i, v) in rsi.iter().enumerate() {
            if i < 14 {
                prop_assert!(v.is_nan());
            } else if v.is_finite() {
                prop_assert!((0.0..=100.0).contains(v), "rsi {} at {}", v, i);
            }
        }
    }
}
