//! What a completed tick did.

use std::fmt;

use crate::domain::{MarketOrder, OrderAck, Position};
use crate::position_manager::{ExitReason, PnlReport};
use crate::signal::{Evaluation, Signal};

#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// An open position was closed with a reduce-only order.
    Exited {
        reason: ExitReason,
        order: MarketOrder,
        ack: OrderAck,
        /// Estimated from the mark price, not the fill.
        pnl: PnlReport,
    },
    /// An open position was kept.
    Held {
        position: Position,
        explanation: String,
    },
    /// A new position was opened.
    Entered {
        signal: Signal,
        order: MarketOrder,
        ack: OrderAck,
        evaluation: Evaluation,
    },
    /// Flat, entries allowed, no signal.
    NoSignal { evaluation: Evaluation },
    /// Flat, but the daily drawdown gate is closed.
    EntriesBlocked { equity: f64, drawdown: Option<f64> },
    /// A signal fired but the balance sizes to zero at this precision.
    SizeTooSmall {
        signal: Signal,
        balance: f64,
        mark_price: f64,
    },
}

impl TickOutcome {
    /// True when the tick submitted an order.
    pub fn traded(&self) -> bool {
        matches!(self, TickOutcome::Exited { .. } | TickOutcome::Entered { .. })
    }
}

impl fmt::Display for TickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickOutcome::Exited { reason, order, pnl, .. } => write!(
                f,
                "exited ({reason}): {} {} pnl {:.2} ({:.2}%)",
                order.side, order.quantity, pnl.pnl, pnl.pnl_pct
            ),
            TickOutcome::Held { explanation, .. } => write!(f, "{explanation}"),
            TickOutcome::Entered { signal, order, .. } => write!(
                f,
                "entered {} {} {}: {}",
                signal.side, order.quantity, order.symbol, signal.reason
            ),
            TickOutcome::NoSignal { evaluation } => match &evaluation.no_trade {
                Some(reason) => write!(f, "no signal: {reason}"),
                None => write!(f, "no signal"),
            },
            TickOutcome::EntriesBlocked { equity, drawdown } => match drawdown {
                Some(dd) => write!(
                    f,
                    "entries blocked: drawdown {:.2}% at equity {equity:.2}",
                    dd * 100.0
                ),
                None => write!(f, "entries blocked: no usable equity baseline"),
            },
            TickOutcome::SizeTooSmall {
                signal,
                balance,
                mark_price,
            } => write!(
                f,
                "{} signal skipped: balance {balance:.2} at {mark_price:.4} sizes to zero",
                signal.side
            ),
        }
    }
}
