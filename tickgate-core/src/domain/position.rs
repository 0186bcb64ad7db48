use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// Direction of a position or of an entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Order side that opens a position in this direction.
    pub fn entry_order_side(self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Buy,
            Side::Short => OrderSide::Sell,
        }
    }

    /// Order side that closes a position in this direction.
    pub fn exit_order_side(self) -> OrderSide {
        match self {
            Side::Long => OrderSide::Sell,
            Side::Short => OrderSide::Buy,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// Open position as reported by the account on this tick.
///
/// Never cached across ticks; quantity is always the absolute size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub quantity: f64,
    pub entry_price: f64,
}

impl Position {
    pub fn new(side: Side, quantity: f64, entry_price: f64) -> Self {
        Self {
            side,
            quantity: quantity.abs(),
            entry_price,
        }
    }

    /// Build from a signed exchange amount (positive = long, negative = short).
    /// Returns `None` when flat.
    pub fn from_signed(amount: f64, entry_price: f64) -> Option<Self> {
        if amount == 0.0 || amount.is_nan() {
            return None;
        }
        let side = if amount > 0.0 { Side::Long } else { Side::Short };
        Some(Self::new(side, amount, entry_price))
    }
}
