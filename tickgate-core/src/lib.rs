//! tickgate core: indicators, risk gate, signal evaluation, position management
//! and the per-tick decision loop for a single derivatives instrument.
//!
//! - Domain types (candles, positions, orders, order-book depth)
//! - Indicator library (EMA, SMA, RSI, MACD, ATR, ADX, Bollinger Bands)
//! - Risk gate with a daily drawdown baseline
//! - Multi-timeframe entry evaluator with two momentum confirmation variants
//! - Position manager with fixed-percentage and ATR-bracket exits
//! - Decision loop behind exchange/notifier ports, with Binance and Telegram
//!   adapters

pub mod config;
pub mod domain;
pub mod engine;
pub mod exchange;
pub mod indicators;
pub mod notify;
pub mod position_manager;
pub mod risk;
pub mod signal;
