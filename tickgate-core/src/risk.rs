//! Risk gate: daily drawdown baseline and position sizing.
//!
//! [`RiskState`] anchors the day's starting equity. It is created once at
//! startup and replaced, never mutated, when the UTC date advances. The gate
//! answers whether a new entry is permitted and how large it may be; it knows
//! nothing about signals or open positions.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RiskConfig;

/// Daily equity baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskState {
    day_start_equity: f64,
    /// UTC calendar date, serialized as `YYYY-MM-DD`.
    day_start_date: NaiveDate,
}

impl RiskState {
    pub fn new(day_start_equity: f64, day_start_date: NaiveDate) -> Self {
        Self {
            day_start_equity,
            day_start_date,
        }
    }

    pub fn day_start_equity(&self) -> f64 {
        self.day_start_equity
    }

    pub fn day_start_date(&self) -> NaiveDate {
        self.day_start_date
    }

    /// Fractional equity decline since the day started.
    ///
    /// `None` when the baseline is non-positive or the ratio is not finite.
    pub fn drawdown(&self, equity: f64) -> Option<f64> {
        if !(self.day_start_equity > 0.0) {
            return None;
        }
        let ratio = (self.day_start_equity - equity) / self.day_start_equity;
        ratio.is_finite().then_some(ratio)
    }
}

/// Entry gate and sizer driven by [`RiskConfig`].
#[derive(Debug, Clone)]
pub struct RiskGate {
    drawdown_limit: f64,
    trade_fraction: f64,
    quantity_precision: u32,
}

impl RiskGate {
    pub fn new(config: &RiskConfig, quantity_precision: u32) -> Self {
        Self {
            drawdown_limit: config.daily_drawdown_limit,
            trade_fraction: config.trade_balance_fraction,
            quantity_precision,
        }
    }

    pub fn drawdown_limit(&self) -> f64 {
        self.drawdown_limit
    }

    /// Baseline anchored to the current UTC date.
    pub fn initialize(&self, equity: f64) -> RiskState {
        self.initialize_at(equity, Utc::now().date_naive())
    }

    pub fn initialize_at(&self, equity: f64, today: NaiveDate) -> RiskState {
        info!(equity, date = %today, "risk baseline initialized");
        RiskState::new(equity, today)
    }

    /// Re-anchor the baseline if the UTC date has advanced.
    pub fn roll_day(&self, state: &RiskState, equity: f64) -> RiskState {
        self.roll_day_at(state, equity, Utc::now().date_naive())
    }

    /// Same as [`roll_day`](Self::roll_day) with an explicit date.
    ///
    /// Idempotent within a day: the baseline only moves when `today` differs
    /// from the stored date.
    pub fn roll_day_at(&self, state: &RiskState, equity: f64, today: NaiveDate) -> RiskState {
        if today == state.day_start_date {
            return *state;
        }
        info!(
            previous = %state.day_start_date,
            date = %today,
            equity,
            "new trading day, risk baseline reset"
        );
        RiskState::new(equity, today)
    }

    /// True iff the drawdown since the day started is below the limit.
    pub fn can_open(&self, state: &RiskState, equity: f64) -> bool {
        match state.drawdown(equity) {
            Some(drawdown) => {
                let allowed = drawdown < self.drawdown_limit;
                debug!(drawdown, limit = self.drawdown_limit, allowed, "drawdown gate");
                allowed
            }
            None => {
                debug!(
                    day_start_equity = state.day_start_equity,
                    "drawdown undefined, entries blocked"
                );
                false
            }
        }
    }

    /// Entry quantity for the configured balance fraction.
    pub fn size_position(&self, wallet_balance: f64, mark_price: f64) -> f64 {
        size_position(
            wallet_balance,
            mark_price,
            self.trade_fraction,
            self.quantity_precision,
        )
    }
}

/// `(wallet_balance × fraction) / mark_price`, or 0 when either input is
/// non-positive or the result is not finite.
pub fn raw_position_size(wallet_balance: f64, mark_price: f64, fraction: f64) -> f64 {
    if !(wallet_balance > 0.0) || !(mark_price > 0.0) || !(fraction > 0.0) {
        return 0.0;
    }
    let qty = wallet_balance * fraction / mark_price;
    if qty.is_finite() {
        qty
    } else {
        0.0
    }
}

/// [`raw_position_size`] truncated (never rounded up) to `precision` decimals.
pub fn size_position(wallet_balance: f64, mark_price: f64, fraction: f64, precision: u32) -> f64 {
    truncate_to_precision(raw_position_size(wallet_balance, mark_price, fraction), precision)
}

/// Truncate toward zero at `precision` decimal places.
///
/// The small epsilon absorbs binary representation error so that 0.05 stays
/// 0.05 instead of becoming 0.049.
pub fn truncate_to_precision(value: f64, precision: u32) -> f64 {
    if !(value > 0.0) {
        return 0.0;
    }
    let scale = 10f64.powi(precision as i32);
    ((value * scale) + 1e-9).floor() / scale
}
