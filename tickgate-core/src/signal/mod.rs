//! Signal evaluation: multi-timeframe regime classification and entry rules.
//!
//! An [`EntryEvaluator`] turns one [`MarketSnapshot`] into an [`Evaluation`]:
//! at most one directional [`Signal`] plus the ordered list of conditions
//! that held or failed. Evaluation is a pure function of the snapshot; no
//! state survives between ticks.

pub mod evaluator;
pub mod factory;
pub mod frame;
pub mod liquidity;
pub mod momentum;
pub mod regime;

pub use evaluator::{EvaluatorParams, MultiTimeframeEvaluator};
pub use factory::create_evaluator;
pub use frame::{EntryFrame, FrameError, Recent};
pub use liquidity::check_liquidity;
pub use momentum::{MomentumRule, MomentumState, StrictCross};
pub use regime::{classify_bias, classify_regime, Regime};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{CandleSeries, OrderBookDepth, Side};

/// Directional entry decision for this tick. A one-shot value, not a standing order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub side: Side,
    pub reason: String,
}

/// One named entry condition and whether it held.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionCheck {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl ConditionCheck {
    pub fn new(name: impl Into<String>, passed: bool, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ConditionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.passed { "ok" } else { "FAIL" };
        write!(f, "{} [{}] {}", self.name, mark, self.detail)
    }
}

/// Why an evaluation produced no signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoTradeReason {
    /// Too few closed candles, or an indicator still undefined where it is read.
    InsufficientData(String),
    /// Volume baseline is zero or undefined.
    DegenerateVolume,
    /// Entry closes never fell across the RSI window, leaving RSI unbounded.
    DegenerateRsi(String),
    /// Order book missing, one-sided, or spread too wide.
    LiquidityRejected(String),
    /// Data was usable but the entry rules did not line up.
    ConditionsNotMet,
}

impl fmt::Display for NoTradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoTradeReason::InsufficientData(detail) => write!(f, "insufficient data: {detail}"),
            NoTradeReason::DegenerateVolume => write!(f, "volume baseline is zero or undefined"),
            NoTradeReason::DegenerateRsi(detail) => write!(f, "rsi unbounded: {detail}"),
            NoTradeReason::LiquidityRejected(detail) => write!(f, "liquidity rejected: {detail}"),
            NoTradeReason::ConditionsNotMet => write!(f, "entry conditions not met"),
        }
    }
}

/// Full result of one evaluation.
///
/// Exactly one of `signal` and `no_trade` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub signal: Option<Signal>,
    pub high_regime: Option<Regime>,
    pub mid_bias: Option<Regime>,
    pub checks: Vec<ConditionCheck>,
    pub no_trade: Option<NoTradeReason>,
}

impl Evaluation {
    pub fn rejected(reason: NoTradeReason) -> Self {
        Self {
            signal: None,
            high_regime: None,
            mid_bias: None,
            checks: Vec::new(),
            no_trade: Some(reason),
        }
    }

    pub fn is_signal(&self) -> bool {
        self.signal.is_some()
    }

    /// Human-readable trail of the decision and every condition checked.
    pub fn explain(&self) -> String {
        let mut out = match (&self.signal, &self.no_trade) {
            (Some(signal), _) => format!("{}: {}", signal.side, signal.reason),
            (None, Some(reason)) => format!("no trade: {reason}"),
            (None, None) => "no trade".to_string(),
        };
        if let (Some(high), Some(mid)) = (self.high_regime, self.mid_bias) {
            out.push_str(&format!(" | high={high} mid={mid}"));
        }
        for check in &self.checks {
            out.push_str("\n  ");
            out.push_str(&check.to_string());
        }
        out
    }
}

/// Closed candles for each timeframe plus an optional depth snapshot.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub entry: CandleSeries,
    pub mid: CandleSeries,
    pub high: CandleSeries,
    pub depth: Option<OrderBookDepth>,
}

/// Trait for entry evaluators.
///
/// Evaluators see market data only; account state is gated elsewhere.
pub trait EntryEvaluator: Send + Sync {
    /// Human-readable name (e.g., "strict_cross").
    fn name(&self) -> &str;

    fn evaluate(&self, snapshot: &MarketSnapshot) -> Evaluation;
}
