//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use super::Indicator;
use crate::domain::Candle;

/// What the SMA is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmaSource {
    Close,
    Volume,
}

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    source: SmaSource,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source: SmaSource::Close,
            name: format!("sma_{period}"),
        }
    }

    /// Rolling mean of candle volume (the volume baseline).
    pub fn volume(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Self {
            period,
            source: SmaSource::Volume,
            name: format!("volume_sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let values: Vec<f64> = match self.source {
            SmaSource::Close => candles.iter().map(|c| c.close).collect(),
            SmaSource::Volume => candles.iter().map(|c| c.volume).collect(),
        };
        sma_of_series(&values, self.period)
    }
}

/// Rolling mean of a raw f64 slice. Any NaN inside a window makes that slot NaN.
pub fn sma_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];

    if period == 0 || n < period {
        return result;
    }

    for i in (period - 1)..n {
        let window = &values[(i + 1 - period)..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }

    result
}
