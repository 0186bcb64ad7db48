//! The per-tick orchestrator.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::outcome::TickOutcome;
use super::ports::{MarketData, Notifier, Ports};
use super::EngineError;
use crate::config::{EngineConfig, ExitStyle, IndicatorConfig, LiquidityConfig, TimeframeConfig};
use crate::domain::{CandleSeries, MarketOrder, Position};
use crate::position_manager::{realized_pnl, ExitAction, ExitInputs, PositionManager};
use crate::risk::{RiskGate, RiskState};
use crate::signal::{create_evaluator, EntryEvaluator, Evaluation, MarketSnapshot};

/// Stateless decision engine. [`RiskState`] is owned by the caller and
/// threaded through [`tick`](Engine::tick).
pub struct Engine {
    symbol: String,
    timeframes: TimeframeConfig,
    indicators: IndicatorConfig,
    liquidity: LiquidityConfig,
    risk: RiskGate,
    positions: PositionManager,
    evaluator: Box<dyn EntryEvaluator>,
}

impl Engine {
    /// Engine with the evaluator variant named in the config.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config, create_evaluator(config))
    }

    pub fn new(config: &EngineConfig, evaluator: Box<dyn EntryEvaluator>) -> Self {
        Self {
            symbol: config.instrument.symbol.clone(),
            timeframes: config.timeframes.clone(),
            indicators: config.indicators.clone(),
            liquidity: config.liquidity.clone(),
            risk: RiskGate::new(&config.risk, config.instrument.quantity_precision),
            positions: PositionManager::new(config.instrument.symbol.clone(), config.exits.clone()),
            evaluator,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn evaluator_name(&self) -> &str {
        self.evaluator.name()
    }

    /// Anchor the risk baseline to current equity and announce startup.
    pub fn start(&self, ports: &Ports<'_>) -> Result<RiskState, EngineError> {
        self.start_at(ports, Utc::now().date_naive())
    }

    pub fn start_at(&self, ports: &Ports<'_>, today: NaiveDate) -> Result<RiskState, EngineError> {
        let (equity, balance) = ports.account.equity_and_balance()?;
        let state = self.risk.initialize_at(equity, today);
        notify(
            ports.notifier,
            &format!(
                "tickgate started: {} ({}), equity {equity:.2}, balance {balance:.2}",
                self.symbol,
                self.evaluator.name()
            ),
        );
        Ok(state)
    }

    /// Run one decision tick dated today (UTC).
    pub fn tick(
        &self,
        state: &RiskState,
        ports: &Ports<'_>,
    ) -> Result<(RiskState, TickOutcome), EngineError> {
        self.tick_at(state, ports, Utc::now().date_naive())
    }

    /// Run one decision tick. Returns the risk state to carry into the next
    /// tick; on error the caller keeps its current one.
    pub fn tick_at(
        &self,
        state: &RiskState,
        ports: &Ports<'_>,
        today: NaiveDate,
    ) -> Result<(RiskState, TickOutcome), EngineError> {
        let (equity, balance) = ports.account.equity_and_balance()?;
        let state = self.risk.roll_day_at(state, equity, today);
        let entries_allowed = self.risk.can_open(&state, equity);

        let position = ports.account.open_position()?;
        let mark = ports.market.mark_price()?;
        debug!(equity, balance, mark, entries_allowed, "tick inputs");

        if let Some(position) = position {
            let outcome = self.manage_position(&position, mark, ports)?;
            return Ok((state, outcome));
        }

        if !entries_allowed {
            let drawdown = state.drawdown(equity);
            warn!(
                equity,
                day_start_equity = state.day_start_equity(),
                ?drawdown,
                "daily drawdown limit reached, entries blocked"
            );
            return Ok((state, TickOutcome::EntriesBlocked { equity, drawdown }));
        }

        let outcome = self.seek_entry(balance, mark, ports)?;
        Ok((state, outcome))
    }

    /// Fetch and evaluate without touching the account.
    pub fn evaluate_once(&self, market: &dyn MarketData) -> Result<Evaluation, EngineError> {
        let snapshot = self.snapshot(market)?;
        Ok(self.evaluator.evaluate(&snapshot))
    }

    /// Closed candles for all three timeframes, plus depth when the
    /// liquidity gate is on.
    pub fn snapshot(&self, market: &dyn MarketData) -> Result<MarketSnapshot, EngineError> {
        let entry = self.fetch_series(market, &self.timeframes.entry)?;
        let mid = self.fetch_series(market, &self.timeframes.mid)?;
        let high = self.fetch_series(market, &self.timeframes.high)?;
        let depth = if self.liquidity.enabled {
            Some(market.depth(self.liquidity.depth_levels)?)
        } else {
            None
        };
        Ok(MarketSnapshot {
            entry,
            mid,
            high,
            depth,
        })
    }

    fn fetch_series(&self, market: &dyn MarketData, timeframe: &str) -> Result<CandleSeries, EngineError> {
        let fetched = market.candles(timeframe, self.timeframes.fetch_limit)?;
        Ok(CandleSeries::from_fetched(timeframe, fetched))
    }

    fn manage_position(
        &self,
        position: &Position,
        mark: f64,
        ports: &Ports<'_>,
    ) -> Result<TickOutcome, EngineError> {
        let exits = self.positions.config();
        let inputs = if exits.style == ExitStyle::AtrBracket || exits.momentum_exit {
            let series = self.fetch_series(ports.market, &self.timeframes.entry)?;
            ExitInputs::from_candles(mark, series.candles(), &self.indicators)
        } else {
            ExitInputs {
                mark_price: mark,
                atr: None,
                histogram: None,
            }
        };

        let decision = self.positions.evaluate(position, &inputs);
        match decision.action {
            ExitAction::Hold => {
                info!(explanation = %decision.explanation, "holding position");
                Ok(TickOutcome::Held {
                    position: position.clone(),
                    explanation: decision.explanation,
                })
            }
            ExitAction::Exit { reason, order } => {
                let ack = ports.executor.submit_market_order(&order)?;
                let pnl = realized_pnl(position.side, position.entry_price, mark, position.quantity);
                info!(
                    %reason,
                    order_id = ack.order_id,
                    pnl = pnl.pnl,
                    pnl_pct = pnl.pnl_pct,
                    "position closed"
                );
                notify(
                    ports.notifier,
                    &format!(
                        "Closed {} {} {} ({reason})\nentry {:.4} exit ~{mark:.4}\nPnL {:.2} ({:.2}%)\n{}",
                        position.side,
                        order.quantity,
                        self.symbol,
                        position.entry_price,
                        pnl.pnl,
                        pnl.pnl_pct,
                        decision.explanation
                    ),
                );
                Ok(TickOutcome::Exited {
                    reason,
                    order,
                    ack,
                    pnl,
                })
            }
        }
    }

    fn seek_entry(&self, balance: f64, mark: f64, ports: &Ports<'_>) -> Result<TickOutcome, EngineError> {
        let snapshot = self.snapshot(ports.market)?;
        let evaluation = self.evaluator.evaluate(&snapshot);

        let Some(signal) = evaluation.signal.clone() else {
            debug!(explanation = %evaluation.explain(), "no entry this tick");
            return Ok(TickOutcome::NoSignal { evaluation });
        };

        let quantity = self.risk.size_position(balance, mark);
        if !(quantity > 0.0) {
            warn!(balance, mark, side = %signal.side, "position size truncates to zero, entry skipped");
            return Ok(TickOutcome::SizeTooSmall {
                signal,
                balance,
                mark_price: mark,
            });
        }

        let order = MarketOrder::open(&self.symbol, signal.side.entry_order_side(), quantity);
        let ack = ports.executor.submit_market_order(&order)?;
        info!(
            side = %signal.side,
            quantity,
            order_id = ack.order_id,
            reason = %signal.reason,
            "position opened"
        );
        notify(
            ports.notifier,
            &format!(
                "Opened {} {quantity} {} @ ~{mark:.4}\n{}",
                signal.side,
                self.symbol,
                evaluation.explain()
            ),
        );
        Ok(TickOutcome::Entered {
            signal,
            order,
            ack,
            evaluation,
        })
    }
}

/// Deliver `text`, logging failures instead of propagating them.
pub(crate) fn notify(notifier: &dyn Notifier, text: &str) {
    if let Err(err) = notifier.notify(text) {
        warn!(error = %err, "notification failed");
    }
}
