//! Decision loop: one tick wires risk gate, evaluator and position manager.
//!
//! Per tick, in order:
//!
//! 1. Query equity and balance; roll the risk baseline if the UTC date moved
//! 2. Query the open position and mark price
//! 3. With a position open, decide exit vs hold. Entry evaluation is skipped
//! 4. Flat and the drawdown gate closed: nothing to do
//! 5. Flat and allowed: evaluate entry, size, submit, notify
//!
//! Every exchange failure aborts the tick with [`EngineError`]. The caller's
//! [`RiskState`](crate::risk::RiskState) is only replaced by a tick that
//! completes.

pub mod decision;
pub mod outcome;
pub mod ports;

pub use decision::Engine;
pub use outcome::TickOutcome;
pub use ports::{Account, MarketData, Notifier, OrderExecutor, Ports};

use crate::exchange::ExchangeError;

/// A tick that could not complete.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("exchange failure: {0}")]
    Exchange(#[from] ExchangeError),
}
