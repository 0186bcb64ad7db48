//! Evaluator factory: configuration in, trait object out.

use super::evaluator::{EvaluatorParams, MultiTimeframeEvaluator};
use super::momentum::{MomentumState, StrictCross};
use super::EntryEvaluator;
use crate::config::{EngineConfig, StrategyVariant};

/// Build the entry evaluator named by `strategy.variant`.
pub fn create_evaluator(config: &EngineConfig) -> Box<dyn EntryEvaluator> {
    let params = EvaluatorParams::from_config(config);
    match config.strategy.variant {
        StrategyVariant::StrictCross => Box::new(MultiTimeframeEvaluator::new(params, StrictCross)),
        StrategyVariant::MomentumState => {
            Box::new(MultiTimeframeEvaluator::new(params, MomentumState))
        }
    }
}
