//! Realized profit and loss.

use serde::{Deserialize, Serialize};

use crate::domain::Side;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlReport {
    /// Quote-currency PnL.
    pub pnl: f64,
    /// PnL as a percentage of entry notional; 0 when the notional is zero.
    pub pnl_pct: f64,
}

pub fn realized_pnl(side: Side, entry_price: f64, exit_price: f64, quantity: f64) -> PnlReport {
    let pnl = match side {
        Side::Long => (exit_price - entry_price) * quantity,
        Side::Short => (entry_price - exit_price) * quantity,
    };
    let notional = entry_price * quantity;
    let pnl_pct = if notional != 0.0 && notional.is_finite() {
        pnl / notional * 100.0
    } else {
        0.0
    };
    PnlReport { pnl, pnl_pct }
}
