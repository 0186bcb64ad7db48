//! Momentum confirmation rules for the trend branch.
//!
//! Two named variants, kept separate:
//! - [`StrictCross`]: RSI crosses its level and the MACD histogram crosses
//!   zero between the previous and the last closed candle.
//! - [`MomentumState`]: RSI is past its level and the histogram carries the
//!   matching sign on the last closed candle.

use super::frame::Recent;
use crate::domain::Side;

/// Trend-branch momentum confirmation.
pub trait MomentumRule: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Does RSI confirm an entry on `side` relative to `level`?
    fn rsi_confirms(&self, side: Side, rsi: Recent, level: f64) -> bool;

    /// Does the MACD histogram confirm an entry on `side`?
    fn histogram_confirms(&self, side: Side, histogram: Recent) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StrictCross;

impl MomentumRule for StrictCross {
    fn name(&self) -> &'static str {
        "strict_cross"
    }

    fn rsi_confirms(&self, side: Side, rsi: Recent, level: f64) -> bool {
        match side {
            Side::Long => rsi.crossed_up(level),
            Side::Short => rsi.crossed_down(level),
        }
    }

    fn histogram_confirms(&self, side: Side, histogram: Recent) -> bool {
        match side {
            Side::Long => histogram.crossed_up(0.0),
            Side::Short => histogram.crossed_down(0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentumState;

impl MomentumRule for MomentumState {
    fn name(&self) -> &'static str {
        "momentum_state"
    }

    fn rsi_confirms(&self, side: Side, rsi: Recent, level: f64) -> bool {
        match side {
            Side::Long => rsi.last >= level,
            Side::Short => rsi.last <= level,
        }
    }

    fn histogram_confirms(&self, side: Side, histogram: Recent) -> bool {
        match side {
            Side::Long => histogram.last > 0.0,
            Side::Short => histogram.last < 0.0,
        }
    }
}
