//! Order-book depth snapshot.

use serde::{Deserialize, Serialize};

/// One resting price level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: f64,
    pub size: f64,
}

/// Bids and asks, best level first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderBookDepth {
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
}

impl OrderBookDepth {
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|l| l.price)
    }

    /// Relative spread `(ask - bid) / mid`. `None` when either side is empty
    /// or the mid price is not positive.
    pub fn relative_spread(&self) -> Option<f64> {
        let bid = self.best_bid()?;
        let ask = self.best_ask()?;
        let mid = (bid + ask) / 2.0;
        if mid <= 0.0 || !mid.is_finite() {
            return None;
        }
        Some((ask - bid) / mid)
    }

    /// Summed size of the first `levels` bids.
    pub fn bid_depth(&self, levels: usize) -> f64 {
        self.bids.iter().take(levels).map(|l| l.size).sum()
    }

    /// Summed size of the first `levels` asks.
    pub fn ask_depth(&self, levels: usize) -> f64 {
        self.asks.iter().take(levels).map(|l| l.size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> OrderBookDepth {
        OrderBookDepth {
            bids: vec![
                DepthLevel { price: 99.5, size: 2.0 },
                DepthLevel { price: 99.0, size: 3.0 },
            ],
            asks: vec![
                DepthLevel { price: 100.5, size: 1.0 },
                DepthLevel { price: 101.0, size: 4.0 },
            ],
        }
    }

    #[test]
    fn spread_over_mid() {
        let spread = book().relative_spread().unwrap();
        assert!((spread - 0.01).abs() < 1e-12);
    }

    #[test]
    fn empty_side_has_no_spread() {
        let mut b = book();
        b.asks.clear();
        assert!(b.relative_spread().is_none());
    }

    #[test]
    fn depth_sums_requested_levels() {
        let b = book();
        assert_eq!(b.bid_depth(1), 2.0);
        assert_eq!(b.bid_depth(20), 5.0);
        assert_eq!(b.ask_depth(2), 5.0);
    }
}
