//! Order-book liquidity gate.

use serde::{Deserialize, Serialize};

use crate::config::LiquidityConfig;
use crate::domain::{OrderBookDepth, Side};

/// Spread and top-of-book depth that passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookPressure {
    pub spread: f64,
    pub bid_depth: f64,
    pub ask_depth: f64,
}

impl BookPressure {
    /// Resting depth on the supporting side is at least `ratio` times the
    /// opposing side: bids for a long, asks for a short.
    pub fn favours(&self, side: Side, ratio: f64) -> bool {
        match side {
            Side::Long => self.bid_depth >= ratio * self.ask_depth,
            Side::Short => self.ask_depth >= ratio * self.bid_depth,
        }
    }
}

/// Reject missing or one-sided books and spreads wider than the configured
/// maximum. On success, returns the depth sums over `depth_levels`.
pub fn check_liquidity(
    depth: Option<&OrderBookDepth>,
    config: &LiquidityConfig,
) -> Result<BookPressure, String> {
    let Some(book) = depth else {
        return Err("order book unavailable".to_string());
    };
    if book.bids.is_empty() || book.asks.is_empty() {
        return Err("order book has an empty side".to_string());
    }
    let Some(spread) = book.relative_spread() else {
        return Err("spread undefined".to_string());
    };
    if spread > config.max_relative_spread {
        return Err(format!(
            "spread {spread:.6} exceeds max {:.6}",
            config.max_relative_spread
        ));
    }
    Ok(BookPressure {
        spread,
        bid_depth: book.bid_depth(config.depth_levels),
        ask_depth: book.ask_depth(config.depth_levels),
    })
}
