//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! ATR is the simple rolling mean of TR over `period` candles.
//! Lookback: period (the first candle has no previous close).

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from candles.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(candles: &[Candle]) -> Vec<f64> {
    let n = candles.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    let h = candles[0].high;
    let l = candles[0].low;
    if !(h.is_nan() || l.is_nan()) {
        tr[0] = h - l;
    }

    for i in 1..n {
        let h = candles[i].high;
        let l = candles[i].low;
        let pc = candles[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// True Range with the first slot marked undefined, so rolling windows only
/// ever contain proper true ranges.
pub(crate) fn true_range_from_second(candles: &[Candle]) -> Vec<f64> {
    let mut tr = true_range(candles);
    if let Some(first) = tr.first_mut() {
        *first = f64::NAN;
    }
    tr
}

/// ATR series for a candle slice.
pub fn atr_of_candles(candles: &[Candle], period: usize) -> Vec<f64> {
    sma_of_series(&true_range_from_second(candles), period)
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        atr_of_candles(candles, self.period)
    }
}
