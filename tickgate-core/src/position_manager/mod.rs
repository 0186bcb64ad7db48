//! Position management: stop/target levels and the exit-or-hold decision.
//!
//! The manager is recomputed from scratch every tick: levels derive from the
//! entry price and the current ATR, so they drift with volatility. It only
//! decides and reports. Submitting the reduce-only order is the caller's job.

pub mod pnl;
pub mod stops;

pub use pnl::{realized_pnl, PnlReport};
pub use stops::{stop_levels, StopLevels};

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::{ExitConfig, IndicatorConfig};
use crate::domain::{Candle, MarketOrder, Position, Side};
use crate::indicators::{atr_of_candles, defined_at, last_defined, macd_of_series};
use crate::signal::Recent;

/// Why a position is being closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    MomentumReversal,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop-loss"),
            ExitReason::TakeProfit => write!(f, "take-profit"),
            ExitReason::MomentumReversal => write!(f, "momentum reversal"),
        }
    }
}

/// What the manager wants to do with the open position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExitAction {
    Hold,
    Exit {
        reason: ExitReason,
        order: MarketOrder,
    },
}

/// Exit decision plus the levels and explanation behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitDecision {
    pub action: ExitAction,
    /// `None` when the levels could not be computed this tick (ATR unavailable).
    pub levels: Option<StopLevels>,
    pub explanation: String,
}

impl ExitDecision {
    pub fn is_exit(&self) -> bool {
        matches!(self.action, ExitAction::Exit { .. })
    }
}

/// Market inputs for one exit evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitInputs {
    pub mark_price: f64,
    pub atr: Option<f64>,
    pub histogram: Option<Recent>,
}

impl ExitInputs {
    /// Read ATR and the MACD histogram from closed entry-timeframe candles.
    /// Undefined values become `None` rather than errors.
    pub fn from_candles(mark_price: f64, candles: &[Candle], ind: &IndicatorConfig) -> Self {
        let atr = last_defined(&atr_of_candles(candles, ind.atr_period));

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let histogram = match closes.len() {
            n if n >= 2 => {
                let macd = macd_of_series(&closes, ind.macd_fast, ind.macd_slow, ind.macd_signal);
                match (defined_at(&macd.histogram, n - 2), defined_at(&macd.histogram, n - 1)) {
                    (Some(prev), Some(last)) => Some(Recent { prev, last }),
                    _ => None,
                }
            }
            _ => None,
        };

        Self {
            mark_price,
            atr,
            histogram,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    symbol: String,
    config: ExitConfig,
}

impl PositionManager {
    pub fn new(symbol: impl Into<String>, config: ExitConfig) -> Self {
        Self {
            symbol: symbol.into(),
            config,
        }
    }

    pub fn config(&self) -> &ExitConfig {
        &self.config
    }

    /// Decide exit vs hold.
    ///
    /// Order: stop-loss, then take-profit, then (if enabled) a MACD histogram
    /// cross against the position, else hold.
    pub fn evaluate(&self, position: &Position, inputs: &ExitInputs) -> ExitDecision {
        let mark = inputs.mark_price;
        let levels = stop_levels(position, inputs.atr, &self.config);

        if let Some(levels) = levels {
            if levels.stop_breached(position.side, mark) {
                return self.exit(
                    position,
                    ExitReason::StopLoss,
                    Some(levels),
                    format!(
                        "mark {mark:.4} breached stop {:.4} (entry {:.4})",
                        levels.stop_loss_price, position.entry_price
                    ),
                );
            }
            if levels.target_reached(position.side, mark) {
                let target = levels.take_profit_price.unwrap_or(f64::NAN);
                return self.exit(
                    position,
                    ExitReason::TakeProfit,
                    Some(levels),
                    format!("mark {mark:.4} reached target {target:.4}"),
                );
            }
        } else {
            debug!(side = %position.side, "ATR unavailable, skipping level-based exits");
        }

        if self.config.momentum_exit {
            if let Some(hist) = inputs.histogram {
                let against = match position.side {
                    Side::Long => hist.crossed_down(0.0),
                    Side::Short => hist.crossed_up(0.0),
                };
                if against {
                    return self.exit(
                        position,
                        ExitReason::MomentumReversal,
                        levels,
                        format!(
                            "macd histogram {:.5} -> {:.5} crossed against {}",
                            hist.prev, hist.last, position.side
                        ),
                    );
                }
            }
        }

        let explanation = match levels {
            Some(l) => format!("hold {} at mark {mark:.4}; {l}", position.side),
            None => format!("hold {} at mark {mark:.4}; levels unavailable", position.side),
        };
        ExitDecision {
            action: ExitAction::Hold,
            levels,
            explanation,
        }
    }

    fn exit(
        &self,
        position: &Position,
        reason: ExitReason,
        levels: Option<StopLevels>,
        explanation: String,
    ) -> ExitDecision {
        info!(side = %position.side, %reason, %explanation, "exit decided");
        ExitDecision {
            action: ExitAction::Exit {
                reason,
                order: MarketOrder::close(
                    self.symbol.clone(),
                    position.side.exit_order_side(),
                    position.quantity,
                ),
            },
            levels,
            explanation,
        }
    }
}
