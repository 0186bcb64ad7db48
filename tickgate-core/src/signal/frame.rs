//! Entry-timeframe indicator frame.
//!
//! Collapses the entry candle series into the handful of values the entry
//! rules read: the last closed candle, the one before it, and the indicators
//! at those two positions. Building the frame is where "indicator still
//! undefined" is detected, so the rules themselves only see finite numbers.

use serde::{Deserialize, Serialize};

use crate::config::IndicatorConfig;
use crate::domain::Candle;
use crate::indicators::{
    bollinger_of_series, defined_at, ema_of_series, macd_of_series, rsi_of_series, sma_of_series,
};

/// An indicator at the previous and the last closed candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Recent {
    pub prev: f64,
    pub last: f64,
}

impl Recent {
    /// `prev < level <= last`
    pub fn crossed_up(&self, level: f64) -> bool {
        self.prev < level && level <= self.last
    }

    /// `prev > level >= last`
    pub fn crossed_down(&self, level: f64) -> bool {
        self.prev > level && level >= self.last
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrameError {
    #[error("need at least 2 closed candles, got {0}")]
    TooShort(usize),
    #[error("{indicator} undefined at candle {index}")]
    Undefined { indicator: String, index: usize },
    /// Closes never fell across the RSI window, so the average loss is zero.
    #[error("rsi_{period} has no losses in the window ending at candle {index}")]
    NoRsiLosses { period: usize, index: usize },
}

/// Values the entry rules read from the entry timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFrame {
    pub close: f64,
    pub volume: f64,
    /// Rolling volume mean; may be zero or NaN, which the evaluator treats as
    /// a degenerate baseline rather than missing data.
    pub volume_ma: f64,
    pub ema_trend: f64,
    pub rsi: Recent,
    pub histogram: Recent,
    pub bb_lower: f64,
    pub bb_upper: f64,
}

impl EntryFrame {
    pub fn from_candles(candles: &[Candle], ind: &IndicatorConfig) -> Result<Self, FrameError> {
        let n = candles.len();
        if n < 2 {
            return Err(FrameError::TooShort(n));
        }
        let last = n - 1;
        let prev = n - 2;

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        let ema_trend = ema_of_series(&closes, ind.ema_entry_trend);
        let rsi = rsi_of_series(&closes, ind.rsi_period);
        let macd = macd_of_series(&closes, ind.macd_fast, ind.macd_slow, ind.macd_signal);
        let bands = bollinger_of_series(&closes, ind.bollinger_period, ind.bollinger_k);
        let volume_ma = sma_of_series(&volumes, ind.volume_ma_period);

        Ok(Self {
            close: closes[last],
            volume: volumes[last],
            volume_ma: volume_ma[last],
            ema_trend: required(&ema_trend, &format!("ema_{}", ind.ema_entry_trend), last)?,
            rsi: Recent {
                prev: rsi_at(&rsi, &closes, ind.rsi_period, prev)?,
                last: rsi_at(&rsi, &closes, ind.rsi_period, last)?,
            },
            histogram: Recent {
                prev: required(&macd.histogram, "macd_hist", prev)?,
                last: required(&macd.histogram, "macd_hist", last)?,
            },
            bb_lower: required(&bands.lower, "bollinger_lower", last)?,
            bb_upper: required(&bands.upper, "bollinger_upper", last)?,
        })
    }

    /// The volume baseline, if it is positive and finite.
    pub fn volume_baseline(&self) -> Option<f64> {
        (self.volume_ma.is_finite() && self.volume_ma > 0.0).then_some(self.volume_ma)
    }
}

fn required(series: &[f64], indicator: &str, index: usize) -> Result<f64, FrameError> {
    defined_at(series, index).ok_or_else(|| FrameError::Undefined {
        indicator: indicator.to_string(),
        index,
    })
}

fn rsi_at(rsi: &[f64], closes: &[f64], period: usize, index: usize) -> Result<f64, FrameError> {
    if let Some(value) = defined_at(rsi, index) {
        return Ok(value);
    }
    if index >= period {
        let window = &closes[index - period..=index];
        if window.iter().all(|c| c.is_finite()) && window.windows(2).all(|w| w[1] >= w[0]) {
            return Err(FrameError::NoRsiLosses { period, index });
        }
    }
    required(rsi, &format!("rsi_{period}"), index)
}
