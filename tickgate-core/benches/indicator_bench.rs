//! Criterion benchmarks for the per-tick hot paths.
//!
//! Benchmarks:
//! 1. Indicator compute (single indicator and the full evaluator stack)
//! 2. Entry evaluation over a three-timeframe snapshot
//! 3. Exit inputs from entry-timeframe candles

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tickgate_core::config::{EngineConfig, IndicatorConfig};
use tickgate_core::domain::{Candle, CandleSeries, DepthLevel, OrderBookDepth};
use tickgate_core::indicators::{Adx, Atr, Bollinger, Ema, Indicator, Macd, Rsi, Sma};
use tickgate_core::position_manager::ExitInputs;
use tickgate_core::signal::{create_evaluator, MarketSnapshot};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_candles(n: usize) -> Vec<Candle> {
    let start = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 2000.0 + (i as f64 * 0.1).sin() * 40.0 + i as f64 * 0.05;
            Candle {
                open_time: start + chrono::Duration::minutes(5 * i as i64),
                open: close - 0.8,
                high: close + 3.0,
                low: close - 3.5,
                close,
                volume: 800.0 + (i % 37) as f64 * 12.0,
            }
        })
        .collect()
}

fn make_snapshot(n: usize) -> MarketSnapshot {
    let candles = make_candles(n);
    let mid = candles.last().map(|c| c.close).unwrap_or(2000.0);
    MarketSnapshot {
        entry: CandleSeries::closed("5m", candles.clone()),
        mid: CandleSeries::closed("15m", candles.clone()),
        high: CandleSeries::closed("1h", candles),
        depth: Some(OrderBookDepth {
            bids: (0..20)
                .map(|i| DepthLevel {
                    price: mid - 0.01 * (i + 1) as f64,
                    size: 4.0,
                })
                .collect(),
            asks: (0..20)
                .map(|i| DepthLevel {
                    price: mid + 0.01 * (i + 1) as f64,
                    size: 4.0,
                })
                .collect(),
        }),
    }
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicator_compute");

    for &count in &[200, 1000] {
        let candles = make_candles(count);

        let adx: Box<dyn Indicator> = Box::new(Adx::new(14));
        group.bench_with_input(BenchmarkId::new("adx_14", count), &count, |b, _| {
            b.iter(|| adx.compute(black_box(&candles)));
        });

        // Everything the evaluator reads on one timeframe
        let full_stack: Vec<Box<dyn Indicator>> = vec![
            Box::new(Ema::new(50)),
            Box::new(Ema::new(200)),
            Box::new(Rsi::new(14)),
            Box::new(Macd::histogram(8, 17, 5)),
            Box::new(Atr::new(14)),
            Box::new(Adx::new(14)),
            Box::new(Bollinger::upper(20, 2.0)),
            Box::new(Bollinger::lower(20, 2.0)),
            Box::new(Sma::volume(20)),
        ];
        group.bench_with_input(BenchmarkId::new("full_stack_9", count), &count, |b, _| {
            b.iter(|| {
                for ind in &full_stack {
                    black_box(ind.compute(black_box(&candles)));
                }
            });
        });
    }

    group.finish();
}

// ── 2. Entry evaluation ──────────────────────────────────────────────

fn bench_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("entry_evaluation");
    let snapshot = make_snapshot(200);

    for config in [EngineConfig::default(), {
        let mut momentum = EngineConfig::default();
        momentum.strategy.variant = tickgate_core::config::StrategyVariant::MomentumState;
        momentum
    }] {
        let evaluator = create_evaluator(&config);
        group.bench_function(evaluator.name().to_string(), |b| {
            b.iter(|| evaluator.evaluate(black_box(&snapshot)));
        });
    }

    group.finish();
}

// ── 3. Exit inputs ───────────────────────────────────────────────────

fn bench_exit_inputs(c: &mut Criterion) {
    let candles = make_candles(200);
    let indicators = IndicatorConfig::default();
    c.bench_function("exit_inputs_200", |b| {
        b.iter(|| ExitInputs::from_candles(black_box(2001.5), black_box(&candles), &indicators));
    });
}

criterion_group!(benches, bench_indicators, bench_evaluation, bench_exit_inputs);
criterion_main!(benches);
