//! Domain types for tickgate

pub mod candle;
pub mod depth;
pub mod order;
pub mod position;

pub use candle::{Candle, CandleSeries};
pub use depth::{DepthLevel, OrderBookDepth};
pub use order::{MarketOrder, OrderAck, OrderSide};
pub use position::{Position, Side};
