//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * x[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1).
//! Seed: EMA[first] = x[first] (unadjusted weighting, no SMA seed).
//! Lookback: 0, defined from the first observed sample.

use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// Compute EMA values from a raw f64 slice.
///
/// Leading NaNs are skipped: the seed is the first non-NaN value. A NaN after
/// the seed taints every later value.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 {
        return result;
    }

    let Some(seed_index) = values.iter().position(|v| !v.is_nan()) else {
        return result;
    };

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[seed_index];
    result[seed_index] = prev;

    for i in (seed_index + 1)..n {
        if values[i].is_nan() {
            // NaN propagates: once we see NaN, subsequent values are tainted
            for val in result.iter_mut().skip(i) {
                *val = f64::NAN;
            }
            return result;
        }
        let ema = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = ema;
        prev = ema;
    }

    result
}
