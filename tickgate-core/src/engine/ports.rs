//! Ports the decision loop consumes.
//!
//! The engine talks to the outside world only through these traits. The
//! Binance client implements the first three, the notification sinks the
//! last; tests substitute in-memory fakes.

use crate::domain::{Candle, MarketOrder, OrderAck, OrderBookDepth, Position};
use crate::exchange::ExchangeError;
use crate::notify::NotifyError;

/// Candles, prices and depth for the configured instrument.
pub trait MarketData {
    /// Most recent `count` candles for `timeframe`, oldest first. The last
    /// one may still be forming.
    fn candles(&self, timeframe: &str, count: usize) -> Result<Vec<Candle>, ExchangeError>;

    fn mark_price(&self) -> Result<f64, ExchangeError>;

    fn depth(&self, levels: usize) -> Result<OrderBookDepth, ExchangeError>;
}

/// Account queries. Nothing is cached between ticks.
pub trait Account {
    /// `(total_equity, quote_balance)`.
    fn equity_and_balance(&self) -> Result<(f64, f64), ExchangeError>;

    /// Open position for the configured instrument, `None` when flat.
    fn open_position(&self) -> Result<Option<Position>, ExchangeError>;
}

pub trait OrderExecutor {
    fn submit_market_order(&self, order: &MarketOrder) -> Result<OrderAck, ExchangeError>;
}

/// Fire-and-forget message sink.
pub trait Notifier {
    fn notify(&self, text: &str) -> Result<(), NotifyError>;
}

/// Borrowed collaborators for one tick.
#[derive(Clone, Copy)]
pub struct Ports<'a> {
    pub market: &'a dyn MarketData,
    pub account: &'a dyn Account,
    pub executor: &'a dyn OrderExecutor,
    pub notifier: &'a dyn Notifier,
}
