//! Execution simulator and its supporting pieces.
//!
//! `simulate` is the entry point. It validates everything up front, then
//! walks the bars in order with a single `AccountState`. A run is strictly
//! sequential; parallelism belongs one level up, across independent runs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod exits;
pub mod simulator;
pub mod sizing;
pub mod validate;

pub use config::{
    EngineConfig, ExecutionPrice, DEFAULT_SETTLEMENT_DAYS, DEFAULT_TRADING_DAYS_PER_YEAR,
};
pub use diagnostics::{DiagnosticEvent, DiagnosticKind, RunDiagnostics, SignalCounts};
pub use error::EngineError;
pub use exits::ExitRules;
pub use simulator::{simulate, SimulationResult};
pub use sizing::affordable_shares;
pub use validate::{validate_bars, validate_decisions};
