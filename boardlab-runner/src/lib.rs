//! BoardLab Runner: configuration, data loading, orchestration, analytics
//! and artifacts around the `boardlab-core` simulator.
//!
//! - TOML run configuration with content-hashed run ids
//! - CSV bar and signal loading (English or vendor Chinese headers)
//! - Seeded synthetic bars
//! - Single-run orchestration and performance analytics
//! - Parallel MA-crossover parameter sweeps with cancellation
//! - JSON, CSV and Markdown export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod series;
pub mod sweep;
pub mod synthetic;

pub use config::{BacktestConfig, ConfigError, RunId, StrategyConfig};
pub use data_loader::{load_bars_csv, load_decisions_csv, DataSource, LoadError, LoadedData};
pub use metrics::{AnalyticsParams, PerformanceMetrics, Stat};
pub use runner::{
    run_backtest, run_from_config, run_with_decisions, BacktestResult, RunError, SCHEMA_VERSION,
};
pub use series::{DrawdownInfo, DrawdownPoint, MonthlyReturn};
pub use sweep::{ParamGrid, ParamSweep, SweepEntry, SweepFailure, SweepResults};
pub use synthetic::{generate_bars, SyntheticParams};
