//! MACD (Moving Average Convergence Divergence).
//!
//! line = EMA(fast) - EMA(slow); signal = EMA(signal) of line; histogram = line - signal.
//! All three EMAs use the unadjusted first-value seed, so every component is
//! defined from the first sample.

use super::ema::ema_of_series;
use super::Indicator;
use crate::domain::Candle;

/// Which MACD output an [`Macd`] indicator instance exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdComponent {
    Line,
    Signal,
    Histogram,
}

/// The three parallel MACD series.
#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    component: MacdComponent,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, component: MacdComponent) -> Self {
        assert!(fast >= 1 && slow >= 1 && signal >= 1, "MACD periods must be >= 1");
        assert!(fast < slow, "MACD fast period must be < slow period");
        let prefix = match component {
            MacdComponent::Line => "macd_line",
            MacdComponent::Signal => "macd_signal",
            MacdComponent::Histogram => "macd_hist",
        };
        Self {
            fast,
            slow,
            signal,
            component,
            name: format!("{prefix}_{fast}_{slow}_{signal}"),
        }
    }

    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdComponent::Histogram)
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, candles: &[Candle]) -> Vec<f64> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let series = macd_of_series(&closes, self.fast, self.slow, self.signal);
        match self.component {
            MacdComponent::Line => series.line,
            MacdComponent::Signal => series.signal,
            MacdComponent::Histogram => series.histogram,
        }
    }
}

/// MACD line, signal line and histogram of a raw f64 slice.
pub fn macd_of_series(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let ema_fast = ema_of_series(values, fast);
    let ema_slow = ema_of_series(values, slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_of_series(&line, signal);
    let histogram = line
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();

    MacdSeries {
        line,
        signal: signal_line,
        histogram,
    }
}
