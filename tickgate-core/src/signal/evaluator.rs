//! Multi-timeframe entry evaluator.
//!
//! High timeframe: EMA fast/slow plus ADX give the regime. Mid timeframe:
//! EMA fast/slow give the bias. Entry timeframe: trend pullback rules when
//! high and mid agree on a direction, mean-reversion rules at the Bollinger
//! bands when the high timeframe is ranging.

use tracing::{debug, info};

use super::frame::{EntryFrame, FrameError};
use super::liquidity::{check_liquidity, BookPressure};
use super::momentum::MomentumRule;
use super::regime::{classify_bias, classify_regime, Regime};
use super::{ConditionCheck, EntryEvaluator, Evaluation, MarketSnapshot, NoTradeReason, Signal};
use crate::config::{EngineConfig, IndicatorConfig, LiquidityConfig, ThresholdConfig};
use crate::domain::{CandleSeries, OrderBookDepth, Side};
use crate::indicators::{adx_of_candles, ema_of_series, last_defined};

/// Everything the evaluator reads from configuration.
#[derive(Debug, Clone, Default)]
pub struct EvaluatorParams {
    pub indicators: IndicatorConfig,
    pub thresholds: ThresholdConfig,
    pub liquidity: LiquidityConfig,
}

impl EvaluatorParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            indicators: config.indicators.clone(),
            thresholds: config.thresholds.clone(),
            liquidity: config.liquidity.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MultiTimeframeEvaluator<M: MomentumRule> {
    params: EvaluatorParams,
    rule: M,
}

impl<M: MomentumRule> MultiTimeframeEvaluator<M> {
    pub fn new(params: EvaluatorParams, rule: M) -> Self {
        Self { params, rule }
    }

    pub fn params(&self) -> &EvaluatorParams {
        &self.params
    }

    /// Apply the entry rules to an already-classified tick.
    pub fn evaluate_frame(
        &self,
        high: Regime,
        mid: Regime,
        entry: &EntryFrame,
        depth: Option<&OrderBookDepth>,
    ) -> Evaluation {
        let mut eval = Evaluation {
            signal: None,
            high_regime: Some(high),
            mid_bias: Some(mid),
            checks: Vec::new(),
            no_trade: None,
        };

        let Some(baseline) = entry.volume_baseline() else {
            eval.no_trade = Some(NoTradeReason::DegenerateVolume);
            return eval;
        };

        let pressure = if self.params.liquidity.enabled {
            match check_liquidity(depth, &self.params.liquidity) {
                Ok(pressure) => {
                    eval.checks.push(ConditionCheck::new(
                        "spread",
                        true,
                        format!(
                            "{:.6} <= {:.6}",
                            pressure.spread, self.params.liquidity.max_relative_spread
                        ),
                    ));
                    Some(pressure)
                }
                Err(detail) => {
                    eval.checks.push(ConditionCheck::new("liquidity", false, detail.clone()));
                    eval.no_trade = Some(NoTradeReason::LiquidityRejected(detail));
                    return eval;
                }
            }
        } else {
            None
        };

        let signal = match (high, mid) {
            (Regime::Up, Regime::Up) => {
                self.trend_signal(Side::Long, entry, baseline, pressure, &mut eval.checks)
            }
            (Regime::Down, Regime::Down) => {
                self.trend_signal(Side::Short, entry, baseline, pressure, &mut eval.checks)
            }
            (Regime::Range, _) => self.range_signal(entry, baseline, &mut eval.checks),
            _ => {
                eval.checks.push(ConditionCheck::new(
                    "timeframe_alignment",
                    false,
                    format!("high={high} mid={mid}"),
                ));
                None
            }
        };

        for check in &eval.checks {
            debug!(name = %check.name, passed = check.passed, detail = %check.detail, "entry condition");
        }

        match signal {
            Some(signal) => {
                info!(side = %signal.side, reason = %signal.reason, "entry signal");
                eval.signal = Some(signal);
            }
            None => eval.no_trade = Some(NoTradeReason::ConditionsNotMet),
        }
        eval
    }

    fn trend_signal(
        &self,
        side: Side,
        entry: &EntryFrame,
        baseline: f64,
        pressure: Option<BookPressure>,
        checks: &mut Vec<ConditionCheck>,
    ) -> Option<Signal> {
        let th = &self.params.thresholds;
        let level = match side {
            Side::Long => th.rsi_trend_long,
            Side::Short => th.rsi_trend_short,
        };
        let min_volume = th.volume_factor_trend * baseline;
        let beyond_ema = match side {
            Side::Long => entry.close > entry.ema_trend,
            Side::Short => entry.close < entry.ema_trend,
        };

        let start = checks.len();
        checks.push(ConditionCheck::new(
            "rsi_momentum",
            self.rule.rsi_confirms(side, entry.rsi, level),
            format!("{:.2} -> {:.2} vs {level}", entry.rsi.prev, entry.rsi.last),
        ));
        checks.push(ConditionCheck::new(
            "macd_histogram",
            self.rule.histogram_confirms(side, entry.histogram),
            format!("{:.5} -> {:.5}", entry.histogram.prev, entry.histogram.last),
        ));
        checks.push(ConditionCheck::new(
            "volume",
            entry.volume > min_volume,
            format!("{:.3} vs min {min_volume:.3}", entry.volume),
        ));
        checks.push(ConditionCheck::new(
            "trend_ema",
            beyond_ema,
            format!("close {:.4} vs ema {:.4}", entry.close, entry.ema_trend),
        ));
        if let Some(pressure) = pressure {
            checks.push(ConditionCheck::new(
                "book_depth",
                pressure.favours(side, self.params.liquidity.depth_ratio),
                format!(
                    "bids {:.3} asks {:.3} ratio {}",
                    pressure.bid_depth, pressure.ask_depth, self.params.liquidity.depth_ratio
                ),
            ));
        }

        if !checks[start..].iter().all(|c| c.passed) {
            return None;
        }
        let reason = match side {
            Side::Long => "up-trend pullback long",
            Side::Short => "down-trend pullback short",
        };
        Some(Signal {
            side,
            reason: format!("{reason} ({})", self.rule.name()),
        })
    }

    fn range_signal(
        &self,
        entry: &EntryFrame,
        baseline: f64,
        checks: &mut Vec<ConditionCheck>,
    ) -> Option<Signal> {
        let th = &self.params.thresholds;
        let min_volume = th.volume_factor_range * baseline;
        let volume_ok = entry.volume > min_volume;
        let at_lower = entry.close <= entry.bb_lower;
        let rebound = entry.rsi.crossed_up(th.rsi_oversold);
        let at_upper = entry.close >= entry.bb_upper;
        let rollover = entry.rsi.crossed_down(th.rsi_overbought);
        let rsi_detail = format!("{:.2} -> {:.2}", entry.rsi.prev, entry.rsi.last);

        checks.push(ConditionCheck::new(
            "volume",
            volume_ok,
            format!("{:.3} vs min {min_volume:.3}", entry.volume),
        ));
        checks.push(ConditionCheck::new(
            "lower_band_touch",
            at_lower,
            format!("close {:.4} vs lower {:.4}", entry.close, entry.bb_lower),
        ));
        checks.push(ConditionCheck::new(
            "rsi_rebound",
            rebound,
            format!("{rsi_detail} through {}", th.rsi_oversold),
        ));
        checks.push(ConditionCheck::new(
            "upper_band_touch",
            at_upper,
            format!("close {:.4} vs upper {:.4}", entry.close, entry.bb_upper),
        ));
        checks.push(ConditionCheck::new(
            "rsi_rollover",
            rollover,
            format!("{rsi_detail} through {}", th.rsi_overbought),
        ));

        if volume_ok && at_lower && rebound {
            Some(Signal {
                side: Side::Long,
                reason: "range long at lower band".to_string(),
            })
        } else if volume_ok && at_upper && rollover {
            Some(Signal {
                side: Side::Short,
                reason: "range short at upper band".to_string(),
            })
        } else {
            None
        }
    }

    fn high_regime(&self, series: &CandleSeries) -> Result<(Regime, ConditionCheck), String> {
        let ind = &self.params.indicators;
        let closes = series.closes();
        let fast = last_defined(&ema_of_series(&closes, ind.ema_fast));
        let slow = last_defined(&ema_of_series(&closes, ind.ema_slow));
        let adx = last_defined(&adx_of_candles(series.candles(), ind.adx_period));
        let (Some(fast), Some(slow), Some(adx)) = (fast, slow, adx) else {
            return Err(format!("{} trend indicators undefined", series.timeframe()));
        };
        let regime = classify_regime(fast, slow, adx, self.params.thresholds.adx_trend);
        // Passes once classified; the entry branch reads the regime itself.
        let check = ConditionCheck::new(
            "high_regime",
            true,
            format!(
                "{} ema {fast:.4}/{slow:.4} adx {adx:.2} -> {regime}",
                series.timeframe()
            ),
        );
        Ok((regime, check))
    }

    fn mid_bias(&self, series: &CandleSeries) -> Result<(Regime, ConditionCheck), String> {
        let ind = &self.params.indicators;
        let closes = series.closes();
        let fast = last_defined(&ema_of_series(&closes, ind.ema_fast));
        let slow = last_defined(&ema_of_series(&closes, ind.ema_slow));
        let (Some(fast), Some(slow)) = (fast, slow) else {
            return Err(format!("{} bias indicators undefined", series.timeframe()));
        };
        let bias = classify_bias(fast, slow);
        let check = ConditionCheck::new(
            "mid_bias",
            true,
            format!("{} ema {fast:.4}/{slow:.4} -> {bias}", series.timeframe()),
        );
        Ok((bias, check))
    }
}

impl<M: MomentumRule> EntryEvaluator for MultiTimeframeEvaluator<M> {
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn evaluate(&self, snapshot: &MarketSnapshot) -> Evaluation {
        let min = self.params.thresholds.min_candles;
        for series in [&snapshot.entry, &snapshot.mid, &snapshot.high] {
            if series.len() < min {
                let detail = format!(
                    "{} has {} closed candles, need {min}",
                    series.timeframe(),
                    series.len()
                );
                debug!(%detail, "no trade");
                return Evaluation::rejected(NoTradeReason::InsufficientData(detail));
            }
        }

        let (high, high_check) = match self.high_regime(&snapshot.high) {
            Ok(classified) => classified,
            Err(detail) => return Evaluation::rejected(NoTradeReason::InsufficientData(detail)),
        };
        let (mid, mid_check) = match self.mid_bias(&snapshot.mid) {
            Ok(classified) => classified,
            Err(detail) => return Evaluation::rejected(NoTradeReason::InsufficientData(detail)),
        };

        let frame = match EntryFrame::from_candles(snapshot.entry.candles(), &self.params.indicators)
        {
            Ok(frame) => frame,
            Err(err) => {
                let detail = format!("{}: {err}", snapshot.entry.timeframe());
                let reason = match err {
                    FrameError::NoRsiLosses { .. } => NoTradeReason::DegenerateRsi(detail),
                    _ => NoTradeReason::InsufficientData(detail),
                };
                debug!(%reason, "no trade");
                let mut eval = Evaluation::rejected(reason);
                eval.high_regime = Some(high);
                eval.mid_bias = Some(mid);
                eval.checks = vec![high_check, mid_check];
                return eval;
            }
        };

        let mut eval = self.evaluate_frame(high, mid, &frame, snapshot.depth.as_ref());
        eval.checks.insert(0, mid_check);
        eval.checks.insert(0, high_check);
        eval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DepthLevel;
    use crate::indicators::make_candles;
    use crate::signal::frame::Recent;
    use crate::signal::momentum::{MomentumState, StrictCross};

    fn params(liquidity: bool) -> EvaluatorParams {
        let mut p = EvaluatorParams::default();
        p.liquidity.enabled = liquidity;
        p
    }

    fn pullback_long() -> EntryFrame {
        EntryFrame {
            close: 2010.0,
            volume: 900.0,
            volume_ma: 1000.0,
            ema_trend: 2000.0,
            rsi: Recent { prev: 43.0, last: 47.0 },
            histogram: Recent { prev: -0.4, last: 0.2 },
            bb_lower: 1980.0,
            bb_upper: 2040.0,
        }
    }

    fn pullback_short() -> EntryFrame {
        EntryFrame {
            close: 1990.0,
            volume: 900.0,
            volume_ma: 1000.0,
            ema_trend: 2000.0,
            rsi: Recent { prev: 57.0, last: 53.0 },
            histogram: Recent { prev: 0.4, last: -0.2 },
            bb_lower: 1960.0,
            bb_upper: 2020.0,
        }
    }

    fn balanced_book() -> OrderBookDepth {
        OrderBookDepth {
            bids: vec![DepthLevel { price: 1999.9, size: 10.0 }],
            asks: vec![DepthLevel { price: 2000.1, size: 10.0 }],
        }
    }

    #[test]
    fn trend_long_all_conditions_hold() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &pullback_long(), None);
        let signal = eval.signal.expect("long signal");
        assert_eq!(signal.side, Side::Long);
        assert!(signal.reason.contains("strict_cross"));
        assert!(eval.checks.iter().all(|c| c.passed));
        assert_eq!(eval.no_trade, None);
    }

    #[test]
    fn trend_short_all_conditions_hold() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let eval = ev.evaluate_frame(Regime::Down, Regime::Down, &pullback_short(), None);
        assert_eq!(eval.signal.map(|s| s.side), Some(Side::Short));
    }

    #[test]
    fn low_volume_blocks_trend_entry() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let mut frame = pullback_long();
        frame.volume = 700.0; // below 0.8 x 1000
        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &frame, None);
        assert!(eval.signal.is_none());
        assert_eq!(eval.no_trade, Some(NoTradeReason::ConditionsNotMet));
        let volume = eval.checks.iter().find(|c| c.name == "volume").unwrap();
        assert!(!volume.passed);
    }

    #[test]
    fn strict_cross_rejects_standing_momentum_that_state_accepts() {
        let mut frame = pullback_long();
        frame.rsi = Recent { prev: 48.0, last: 50.0 };
        frame.histogram = Recent { prev: 0.1, last: 0.3 };

        let strict = MultiTimeframeEvaluator::new(params(false), StrictCross);
        assert!(strict
            .evaluate_frame(Regime::Up, Regime::Up, &frame, None)
            .signal
            .is_none());

        let state = MultiTimeframeEvaluator::new(params(false), MomentumState);
        assert_eq!(
            state
                .evaluate_frame(Regime::Up, Regime::Up, &frame, None)
                .signal
                .map(|s| s.side),
            Some(Side::Long)
        );
    }

    #[test]
    fn range_classification_is_a_passing_check() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let closes: Vec<f64> = (0..150)
            .map(|i| if i % 2 == 0 { 2000.0 } else { 2004.0 })
            .collect();
        let series = CandleSeries::closed("1h", make_candles(&closes));

        let (regime, check) = ev.high_regime(&series).unwrap();
        assert_eq!(regime, Regime::Range);
        assert!(check.passed);
        assert!(check.detail.ends_with("-> RANGE"), "{}", check.detail);

        let (_, bias) = ev.mid_bias(&series).unwrap();
        assert!(bias.passed);
    }

    #[test]
    fn misaligned_timeframes_do_not_trade() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let eval = ev.evaluate_frame(Regime::Up, Regime::Down, &pullback_long(), None);
        assert!(eval.signal.is_none());
        assert!(eval
            .checks
            .iter()
            .any(|c| c.name == "timeframe_alignment" && !c.passed));
    }

    #[test]
    fn range_long_at_lower_band() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let frame = EntryFrame {
            close: 1979.0,
            volume: 600.0,
            volume_ma: 1000.0,
            ema_trend: 2000.0,
            rsi: Recent { prev: 28.0, last: 31.0 },
            histogram: Recent { prev: -0.5, last: -0.6 },
            bb_lower: 1980.0,
            bb_upper: 2040.0,
        };
        let eval = ev.evaluate_frame(Regime::Range, Regime::Down, &frame, None);
        assert_eq!(eval.signal.map(|s| s.side), Some(Side::Long));
    }

    #[test]
    fn range_short_at_upper_band() {
        let ev = MultiTimeframeEvaluator::new(params(false), MomentumState);
        let frame = EntryFrame {
            close: 2041.0,
            volume: 600.0,
            volume_ma: 1000.0,
            ema_trend: 2000.0,
            rsi: Recent { prev: 72.0, last: 69.0 },
            histogram: Recent { prev: 0.5, last: 0.6 },
            bb_lower: 1980.0,
            bb_upper: 2040.0,
        };
        let eval = ev.evaluate_frame(Regime::Range, Regime::Up, &frame, None);
        assert_eq!(eval.signal.map(|s| s.side), Some(Side::Short));
    }

    #[test]
    fn range_without_volume_does_not_trade() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let frame = EntryFrame {
            close: 1979.0,
            volume: 400.0,
            volume_ma: 1000.0,
            ema_trend: 2000.0,
            rsi: Recent { prev: 28.0, last: 31.0 },
            histogram: Recent { prev: -0.5, last: -0.6 },
            bb_lower: 1980.0,
            bb_upper: 2040.0,
        };
        assert!(ev
            .evaluate_frame(Regime::Range, Regime::Range, &frame, None)
            .signal
            .is_none());
    }

    #[test]
    fn degenerate_volume_baseline() {
        let ev = MultiTimeframeEvaluator::new(params(false), StrictCross);
        let mut frame = pullback_long();
        frame.volume_ma = 0.0;
        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &frame, None);
        assert_eq!(eval.no_trade, Some(NoTradeReason::DegenerateVolume));

        frame.volume_ma = f64::NAN;
        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &frame, None);
        assert_eq!(eval.no_trade, Some(NoTradeReason::DegenerateVolume));
    }

    #[test]
    fn liquidity_enabled_requires_book() {
        let ev = MultiTimeframeEvaluator::new(params(true), StrictCross);
        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &pullback_long(), None);
        assert!(matches!(eval.no_trade, Some(NoTradeReason::LiquidityRejected(_))));

        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &pullback_long(), Some(&balanced_book()));
        assert_eq!(eval.signal.map(|s| s.side), Some(Side::Long));
    }

    #[test]
    fn liquidity_depth_must_favour_direction() {
        let ev = MultiTimeframeEvaluator::new(params(true), StrictCross);
        let thin_bids = OrderBookDepth {
            bids: vec![DepthLevel { price: 1999.9, size: 2.0 }],
            asks: vec![DepthLevel { price: 2000.1, size: 10.0 }],
        };
        let eval = ev.evaluate_frame(Regime::Up, Regime::Up, &pullback_long(), Some(&thin_bids));
        assert!(eval.signal.is_none());
        assert!(eval.checks.iter().any(|c| c.name == "book_depth" && !c.passed));

        // The same book supports a short.
        let eval =
            ev.evaluate_frame(Regime::Down, Regime::Down, &pullback_short(), Some(&thin_bids));
        assert_eq!(eval.signal.map(|s| s.side), Some(Side::Short));
    }
}
