//! ADX: Average Directional Index.
//!
//! Steps:
//! 1. +DM = max(high - prev_high, 0), -DM = max(prev_low - low, 0); the
//!    smaller of the two is zeroed (ties keep both)
//! 2. Rolling means of +DM, -DM and TR over `period`
//! 3. +DI = 100 * mean(+DM) / mean(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when both DIs are 0
//! 5. ADX = rolling mean of DX over `period`
//!
//! Lookback: 2 * period - 1 (period changes for the DIs, then period - 1 more
//! DX values to fill the ADX window).

use super::atr::true_range_from_second;
use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        adx_of_candles(candles, self.period)
    }
}

/// ADX series for a candle slice.
pub fn adx_of_candles(candles: &[Candle], period: usize) -> Vec<f64> {
    let n = candles.len();
    if n < 2 || period == 0 {
        return vec![f64::NAN; n];
    }

    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];

    for i in 1..n {
        let up = candles[i].high - candles[i - 1].high;
        let down = candles[i - 1].low - candles[i].low;
        if up.is_nan() || down.is_nan() {
            continue;
        }

        let mut plus = up.max(0.0);
        let mut minus = down.max(0.0);
        if plus < minus {
            plus = 0.0;
        } else if minus < plus {
            minus = 0.0;
        }
        plus_dm[i] = plus;
        minus_dm[i] = minus;
    }

    let mean_tr = sma_of_series(&true_range_from_second(candles), period);
    let mean_plus = sma_of_series(&plus_dm, period);
    let mean_minus = sma_of_series(&minus_dm, period);

    let dx: Vec<f64> = (0..n)
        .map(|i| directional_index(mean_plus[i], mean_minus[i], mean_tr[i]))
        .collect();

    sma_of_series(&dx, period)
}

fn directional_index(mean_plus: f64, mean_minus: f64, mean_tr: f64) -> f64 {
    if mean_plus.is_nan() || mean_minus.is_nan() || mean_tr.is_nan() || mean_tr == 0.0 {
        return f64::NAN;
    }
    let plus_di = 100.0 * mean_plus / mean_tr;
    let minus_di = 100.0 * mean_minus / mean_tr;
    let di_sum = plus_di + minus_di;
    if di_sum == 0.0 {
        0.0
    } else {
        100.0 * (plus_di - minus_di).abs() / di_sum
    }
}
