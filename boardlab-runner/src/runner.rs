//! Backtest runner: wires together validation, precompute, simulation and
//! analytics into a single persisted result.
//!
//! Entry points:
//! - `run_backtest()`: bars plus a strategy. Decisions are precomputed.
//! - `run_with_decisions()`: bars plus an externally supplied signal series.
//! - `run_from_config()`: loaded data plus a config whose `[strategy]` section
//!   is built into a strategy. Used by the CLI and the sweep.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardlab_core::domain::{Bar, Decision, EquityPoint, Position, Trade};
use boardlab_core::engine::{simulate, validate_bars, EngineError, RunDiagnostics};
use boardlab_core::signals::{precompute, SignalError, Strategy};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::data_loader::{dataset_hash, filter_date_range, LoadError, LoadedData};
use crate::metrics::{PerformanceMetrics, Stat};
use crate::series::{drawdown_curve, monthly_returns, DrawdownPoint, MonthlyReturn};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("no bars between {start:?} and {end:?}")]
    EmptyWindow {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Complete result of a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub dataset_hash: String,
    #[serde(default)]
    pub has_synthetic: bool,
    pub symbol: String,
    /// Strategy label, or `"external"` for a supplied signal series.
    pub strategy: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bar_count: usize,
    pub starting_cash: f64,
    pub final_cash: f64,
    pub metrics: PerformanceMetrics,
    /// Flat view of `metrics` keyed by name.
    pub stats: BTreeMap<String, Stat>,
    pub trades: Vec<Trade>,
    pub equity_history: Vec<EquityPoint>,
    pub drawdown_curve: Vec<DrawdownPoint>,
    pub monthly_returns: Vec<MonthlyReturn>,
    pub open_position: Option<Position>,
    pub diagnostics: RunDiagnostics,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.metrics.final_equity
    }

    /// Rejections plus deferred and dropped decisions.
    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.events.len()
    }
}

/// Validate the bars, precompute decisions for `strategy` and run them.
pub fn run_backtest(
    bars: &[Bar],
    strategy: &dyn Strategy,
    config: &BacktestConfig,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    validate_bars(bars)?;
    let decisions = precompute(bars, strategy)?;
    run_decisions(bars, &decisions, config, strategy.name().to_string())
}

/// Run an externally supplied signal series.
pub fn run_with_decisions(
    bars: &[Bar],
    decisions: &[Decision],
    config: &BacktestConfig,
) -> Result<BacktestResult, RunError> {
    run_decisions(bars, decisions, config, "external".to_string())
}

/// Apply the config's date window and strategy to loaded data.
///
/// When `decisions` is given, the `[strategy]` section is ignored and the
/// decisions are windowed alongside the bars.
pub fn run_from_config(
    data: &LoadedData,
    decisions: Option<&[Decision]>,
    config: &BacktestConfig,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let start = config.backtest.start_date;
    let end = config.backtest.end_date;
    let bars = filter_date_range(data.bars.clone(), start, end);
    if bars.is_empty() && !data.bars.is_empty() {
        return Err(RunError::EmptyWindow { start, end });
    }

    let mut result = match decisions {
        Some(decisions) => {
            let in_window = |d: &&Decision| {
                start.map_or(true, |s| d.date >= s) && end.map_or(true, |e| d.date <= e)
            };
            let windowed: Vec<Decision> = decisions.iter().filter(in_window).copied().collect();
            run_with_decisions(&bars, &windowed, config)?
        }
        None => {
            let strategy = config.strategy.build()?;
            let mut result = run_backtest(&bars, strategy.as_ref(), config)?;
            result.strategy = config.strategy.label();
            result
        }
    };
    result.has_synthetic = data.is_synthetic();
    Ok(result)
}

fn run_decisions(
    bars: &[Bar],
    decisions: &[Decision],
    config: &BacktestConfig,
    strategy: String,
) -> Result<BacktestResult, RunError> {
    let _span = tracing::info_span!(
        "backtest",
        symbol = %config.backtest.symbol,
        strategy = %strategy,
    )
    .entered();

    config.validate()?;
    let engine_config = config.engine_config();
    let run_id = config.run_id()?;
    let sim = simulate(bars, decisions, &engine_config)?;

    let metrics = PerformanceMetrics::from_simulation(&sim, &engine_config);
    let stats = metrics.to_stat_map();
    let drawdown_curve = drawdown_curve(&sim.equity_history);
    let monthly_returns = monthly_returns(&sim.equity_history, sim.starting_cash);

    tracing::info!(
        run_id = %run_id,
        trades = metrics.trade_count,
        total_return = %metrics.total_return,
        sharpe = %metrics.sharpe,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash: dataset_hash(bars),
        has_synthetic: false,
        symbol: config.backtest.symbol.clone(),
        strategy,
        start_date: bars.first().map(|b| b.date),
        end_date: bars.last().map(|b| b.date),
        bar_count: sim.bar_count,
        starting_cash: sim.starting_cash,
        final_cash: sim.final_cash,
        metrics,
        stats,
        trades: sim.trades,
        equity_history: sim.equity_history,
        drawdown_curve,
        monthly_returns,
        open_position: sim.open_position,
        diagnostics: sim.diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;
    use crate::data_loader::DataSource;
    use crate::synthetic::{generate_bars, SyntheticParams};
    use boardlab_core::signals::BuyAndHold;

    fn synthetic(n: usize) -> LoadedData {
        let params = SyntheticParams {
            bars: n,
            ..SyntheticParams::default()
        };
        LoadedData::new(generate_bars(&params), DataSource::Synthetic { seed: params.seed })
    }

    #[test]
    fn buy_and_hold_produces_full_result() {
        let data = synthetic(120);
        let config = BacktestConfig::new("600000", 1_000_000.0);
        let result = run_backtest(&data.bars, &BuyAndHold, &config).unwrap();

        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.bar_count, 120);
        assert_eq!(result.equity_history.len(), 120);
        assert_eq!(result.drawdown_curve.len(), 120);
        assert_eq!(result.dataset_hash, data.dataset_hash);
        assert_eq!(result.run_id, config.run_id().unwrap());
        assert!(result.open_position.is_some());
        assert!(result.stats.contains_key("sharpe"));
        assert_eq!(result.start_date, Some(data.bars[0].date));
    }

    #[test]
    fn run_from_config_builds_strategy_and_flags_synthetic() {
        let data = synthetic(200);
        let config = BacktestConfig::new("000001", 500_000.0)
            .with_strategy(StrategyConfig::MaCrossover { fast: 5, slow: 20 });
        let result = run_from_config(&data, None, &config).unwrap();
        assert!(result.has_synthetic);
        assert_eq!(result.strategy, config.strategy.label());
    }

    #[test]
    fn date_window_trims_bars_and_decisions() {
        let data = synthetic(60);
        let mut config = BacktestConfig::new("600000", 100_000.0);
        config.backtest.start_date = Some(data.bars[10].date);
        config.backtest.end_date = Some(data.bars[29].date);
        let decisions: Vec<Decision> = data.bars.iter().map(|b| Decision::hold(b.date)).collect();

        let result = run_from_config(&data, Some(&decisions), &config).unwrap();
        assert_eq!(result.bar_count, 20);
        assert_eq!(result.strategy, "external");
    }

    #[test]
    fn window_without_bars_is_an_error() {
        let data = synthetic(10);
        let mut config = BacktestConfig::new("600000", 100_000.0);
        config.backtest.start_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let err = run_from_config(&data, None, &config).unwrap_err();
        assert!(matches!(err, RunError::EmptyWindow { .. }));
    }

    #[test]
    fn too_short_history_surfaces_signal_error() {
        let data = synthetic(10);
        let config = BacktestConfig::new("600000", 100_000.0)
            .with_strategy(StrategyConfig::MaCrossover { fast: 5, slow: 20 });
        let err = run_from_config(&data, None, &config).unwrap_err();
        assert!(matches!(err, RunError::Signal(_)));
    }

    #[test]
    fn malformed_bars_fail_before_history_check() {
        let mut data = synthetic(10);
        data.bars[3].close = -1.0;
        let config = BacktestConfig::new("600000", 100_000.0)
            .with_strategy(StrategyConfig::MaCrossover { fast: 5, slow: 20 });
        let err = run_from_config(&data, None, &config).unwrap_err();
        assert!(matches!(
            err,
            RunError::Engine(EngineError::InvalidInput { index: 3, .. })
        ));
    }

    #[test]
    fn unknown_board_surfaces_engine_error() {
        let data = synthetic(30);
        let config = BacktestConfig::new("999999", 100_000.0);
        let err = run_backtest(&data.bars, &BuyAndHold, &config).unwrap_err();
        assert!(matches!(err, RunError::Config(_) | RunError::Engine(_)));
    }
}
