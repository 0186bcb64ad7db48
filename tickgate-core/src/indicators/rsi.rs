//! Relative Strength Index (RSI).
//!
//! Simple rolling means of gains and losses over `period` price changes.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Lookback: period (the first change exists at index 1).
//! Edge case: avg_loss == 0 → undefined (NaN); the ratio has no usable value.

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Candle;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        rsi_of_series(&closes, self.period)
    }
}

/// RSI of a raw f64 slice.
pub fn rsi_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut gains = vec![f64::NAN; n];
    let mut losses = vec![f64::NAN; n];

    for i in 1..n {
        let change = values[i] - values[i - 1];
        if change.is_nan() {
            continue;
        }
        gains[i] = change.max(0.0);
        losses[i] = (-change).max(0.0);
    }

    let avg_gain = sma_of_series(&gains, period);
    let avg_loss = sma_of_series(&losses, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&gain, &loss)| compute_rsi(gain, loss))
        .collect()
}

fn compute_rsi(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_gain.is_nan() || avg_loss.is_nan() || avg_loss == 0.0 {
        return f64::NAN;
    }
    100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
}
