//! Criterion benchmarks for the analytics pass and a full run.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use boardlab_core::signals::MaCrossover;
use boardlab_runner::metrics::{AnalyticsParams, PerformanceMetrics};
use boardlab_runner::runner::run_backtest;
use boardlab_runner::series::{drawdown_curve, monthly_returns};
use boardlab_runner::synthetic::{generate_bars, SyntheticParams};
use boardlab_runner::BacktestConfig;

fn bars(n: usize) -> Vec<boardlab_core::domain::Bar> {
    generate_bars(&SyntheticParams {
        bars: n,
        ..SyntheticParams::default()
    })
}

fn bench_analytics(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics");
    let config = BacktestConfig::new("600000", 1_000_000.0);
    let params = AnalyticsParams::from_config(&config.engine_config());

    for &n in &[252usize, 2_520] {
        let result = run_backtest(&bars(n), &MaCrossover::new(5, 20), &config)
            .expect("benchmark run");
        group.bench_with_input(BenchmarkId::new("metrics", n), &result, |b, r| {
            b.iter(|| {
                PerformanceMetrics::compute(
                    black_box(&r.equity_history),
                    black_box(&r.trades),
                    &params,
                )
            })
        });
        group.bench_with_input(BenchmarkId::new("series", n), &result, |b, r| {
            b.iter(|| {
                let dd = drawdown_curve(black_box(&r.equity_history));
                let months = monthly_returns(black_box(&r.equity_history), 1_000_000.0);
                (dd, months)
            })
        });
    }
    group.finish();
}

fn bench_full_run(c: &mut Criterion) {
    let config = BacktestConfig::new("600000", 1_000_000.0);
    let bars = bars(1_260);
    c.bench_function("run_backtest_ma_5_20_1260", |b| {
        b.iter(|| run_backtest(black_box(&bars), &MaCrossover::new(5, 20), &config))
    });
}

criterion_group!(benches, bench_analytics, bench_full_run);
criterion_main!(benches);
