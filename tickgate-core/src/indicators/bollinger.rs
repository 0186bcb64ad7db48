//! Bollinger Bands: rolling mean +/- k sample standard deviations.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + k * stddev(close, period)
//! - Lower: middle - k * stddev(close, period)
//!
//! Uses the sample standard deviation (divide by N - 1), so a period of 1 has
//! no defined band. Lookback: period - 1.

use super::sma::sma_of_series;
use super::Indicator;
use crate::domain::Candle;

/// Which band of the Bollinger Bands to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

/// Lower, middle and upper bands as parallel series.
#[derive(Debug, Clone, Default)]
pub struct BollingerSeries {
    pub lower: Vec<f64>,
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    period: usize,
    multiplier: f64,
    band: BollingerBand,
    name: String,
}

impl Bollinger {
    fn with_band(period: usize, multiplier: f64, band: BollingerBand) -> Self {
        assert!(period >= 1, "Bollinger period must be >= 1");
        let label = match band {
            BollingerBand::Upper => "upper",
            BollingerBand::Middle => "middle",
            BollingerBand::Lower => "lower",
        };
        Self {
            period,
            multiplier,
            band,
            name: format!("bollinger_{label}_{period}_{multiplier}"),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::with_band(period, multiplier, BollingerBand::Upper)
    }

    pub fn middle(period: usize, multiplier: f64) -> Self {
        Self::with_band(period, multiplier, BollingerBand::Middle)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::with_band(period, multiplier, BollingerBand::Lower)
    }
}

impl Indicator for Bollinger {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let bands = bollinger_of_series(&closes, self.period, self.multiplier);
        match self.band {
            BollingerBand::Upper => bands.upper,
            BollingerBand::Middle => bands.middle,
            BollingerBand::Lower => bands.lower,
        }
    }
}

/// Bollinger Bands of a raw f64 slice.
pub fn bollinger_of_series(values: &[f64], period: usize, k: f64) -> BollingerSeries {
    let n = values.len();
    let middle = sma_of_series(values, period);
    let mut lower = vec![f64::NAN; n];
    let mut upper = vec![f64::NAN; n];

    if period < 2 {
        return BollingerSeries {
            lower,
            middle,
            upper,
        };
    }

    for i in 0..n {
        let mean = middle[i];
        if mean.is_nan() {
            continue;
        }
        let window = &values[(i + 1 - period)..=i];
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        let width = k * variance.sqrt();
        lower[i] = mean - width;
        upper[i] = mean + width;
    }

    BollingerSeries {
        lower,
        middle,
        upper,
    }
}
