//! Per-timeframe regime classification.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    Up,
    Down,
    Range,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Up => write!(f, "UP"),
            Regime::Down => write!(f, "DOWN"),
            Regime::Range => write!(f, "RANGE"),
        }
    }
}

/// Trend regime: the moving-average relation counts only while ADX is above
/// `adx_threshold`. An undefined ADX means no trend.
pub fn classify_regime(ema_fast: f64, ema_slow: f64, adx: f64, adx_threshold: f64) -> Regime {
    if adx.is_nan() || adx <= adx_threshold {
        return Regime::Range;
    }
    classify_bias(ema_fast, ema_slow)
}

/// Directional bias from the moving-average relation alone. Equal (or
/// undefined) averages carry no bias.
pub fn classify_bias(ema_fast: f64, ema_slow: f64) -> Regime {
    if ema_fast > ema_slow {
        Regime::Up
    } else if ema_fast < ema_slow {
        Regime::Down
    } else {
        Regime::Range
    }
}
