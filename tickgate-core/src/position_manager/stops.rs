//! Stop-loss / take-profit levels.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ExitConfig, ExitStyle};
use crate::domain::{Position, Side};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopLevels {
    pub stop_loss_price: f64,
    /// Absent for the fixed-percentage style.
    pub take_profit_price: Option<f64>,
}

impl StopLevels {
    pub fn stop_breached(&self, side: Side, mark: f64) -> bool {
        match side {
            Side::Long => mark <= self.stop_loss_price,
            Side::Short => mark >= self.stop_loss_price,
        }
    }

    pub fn target_reached(&self, side: Side, mark: f64) -> bool {
        let Some(target) = self.take_profit_price else {
            return false;
        };
        match side {
            Side::Long => mark >= target,
            Side::Short => mark <= target,
        }
    }
}

impl fmt::Display for StopLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stop {:.4}", self.stop_loss_price)?;
        if let Some(target) = self.take_profit_price {
            write!(f, " target {target:.4}")?;
        }
        Ok(())
    }
}

/// Levels for `position` under the configured exit style.
///
/// `fixed_percent` never needs ATR. `atr_bracket` returns `None` when ATR is
/// missing or not positive, so the caller skips level-based exits that tick.
pub fn stop_levels(position: &Position, atr: Option<f64>, config: &ExitConfig) -> Option<StopLevels> {
    let entry = position.entry_price;
    let sign = match position.side {
        Side::Long => 1.0,
        Side::Short => -1.0,
    };
    match config.style {
        ExitStyle::FixedPercent => Some(StopLevels {
            stop_loss_price: entry * (1.0 - sign * config.stop_loss_pct),
            take_profit_price: None,
        }),
        ExitStyle::AtrBracket => {
            let atr = atr.filter(|a| a.is_finite() && *a > 0.0)?;
            Some(StopLevels {
                stop_loss_price: entry - sign * config.stop_atr_multiple * atr,
                take_profit_price: Some(entry + sign * config.take_profit_atr_multiple * atr),
            })
        }
    }
}
