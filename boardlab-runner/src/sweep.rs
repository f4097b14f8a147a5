//! Parameter sweep over MA-crossover grids.
//!
//! Each grid point is an independent run with its own account state, so the
//! grid is spread across a rayon pool. Cancellation is cooperative: the flag
//! is checked before each run starts and a run in progress is never cut off.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use boardlab_core::domain::Bar;

use crate::config::{BacktestConfig, StrategyConfig};
use crate::runner::{run_backtest, BacktestResult, RunError};

/// Fast/slow period lists. Combinations with `fast >= slow` are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamGrid {
    pub fast: Vec<usize>,
    pub slow: Vec<usize>,
}

impl ParamGrid {
    pub fn new(fast: Vec<usize>, slow: Vec<usize>) -> Self {
        Self { fast, slow }
    }

    /// Short periods 5, 10, 20 against long periods 20, 60, 120.
    pub fn ma_crossover_default() -> Self {
        Self::new(vec![5, 10, 20], vec![20, 60, 120])
    }

    /// Valid `(fast, slow)` pairs in grid order.
    pub fn combinations(&self) -> Vec<(usize, usize)> {
        let mut combos = Vec::new();
        for &fast in &self.fast {
            for &slow in &self.slow {
                if fast == 0 || fast >= slow {
                    continue;
                }
                combos.push((fast, slow));
            }
        }
        combos
    }

    pub fn size(&self) -> usize {
        self.combinations().len()
    }
}

/// One completed grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub fast: usize,
    pub slow: usize,
    pub result: BacktestResult,
}

/// A grid point that could not be run, e.g. too little history for `slow`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub fast: usize,
    pub slow: usize,
    pub error: String,
}

type PointOutcome = Result<SweepEntry, SweepFailure>;

/// Runs every grid point against the same bars and base config.
#[derive(Debug, Clone, Default)]
pub struct ParamSweep {
    /// Worker threads. `None` uses rayon's global pool; `Some(1)` runs
    /// sequentially on the calling thread.
    threads: Option<usize>,
}

impl ParamSweep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads.max(1));
        self
    }

    pub fn run(
        &self,
        bars: &[Bar],
        grid: &ParamGrid,
        base: &BacktestConfig,
        cancel: Option<&AtomicBool>,
    ) -> Result<SweepResults, RunError> {
        let combos = grid.combinations();
        let _span = tracing::info_span!("sweep", points = combos.len()).entered();

        let run_one = |&(fast, slow): &(usize, usize)| -> Option<PointOutcome> {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                return None;
            }
            let config = base
                .clone()
                .with_strategy(StrategyConfig::MaCrossover { fast, slow });
            Some(run_point(bars, &config, fast, slow))
        };

        let outcomes: Vec<Option<PointOutcome>> = match self.threads {
            Some(1) => combos.iter().map(run_one).collect(),
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()?
                .install(|| combos.par_iter().map(run_one).collect()),
            None => combos.par_iter().map(run_one).collect(),
        };

        let mut results = SweepResults::default();
        for outcome in outcomes {
            match outcome {
                Some(Ok(entry)) => results.entries.push(entry),
                Some(Err(failure)) => results.failures.push(failure),
                None => results.cancelled = true,
            }
        }

        tracing::info!(
            completed = results.entries.len(),
            failed = results.failures.len(),
            cancelled = results.cancelled,
            "sweep finished"
        );
        Ok(results)
    }
}

fn run_point(bars: &[Bar], config: &BacktestConfig, fast: usize, slow: usize) -> PointOutcome {
    let outcome = config
        .strategy
        .build()
        .map_err(RunError::from)
        .and_then(|strategy| run_backtest(bars, strategy.as_ref(), config));
    match outcome {
        Ok(mut result) => {
            result.strategy = config.strategy.label();
            Ok(SweepEntry { fast, slow, result })
        }
        Err(e) => {
            tracing::warn!(fast, slow, error = %e, "sweep point failed");
            Err(SweepFailure {
                fast,
                slow,
                error: e.to_string(),
            })
        }
    }
}

/// Results from a parameter sweep, in grid order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepResults {
    pub entries: Vec<SweepEntry>,
    pub failures: Vec<SweepFailure>,
    /// True when the cancel flag stopped at least one point from starting.
    pub cancelled: bool,
}

impl SweepResults {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Completed entries sorted by Sharpe, best first. `Infinite` ranks above
    /// every value and `Undefined` below.
    pub fn sorted_by_sharpe(&self) -> Vec<&SweepEntry> {
        let mut sorted: Vec<_> = self.entries.iter().collect();
        sorted.sort_by(|a, b| {
            b.result
                .metrics
                .sharpe
                .rank_value()
                .partial_cmp(&a.result.metrics.sharpe.rank_value())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sorted
    }

    pub fn top_n(&self, n: usize) -> Vec<&SweepEntry> {
        self.sorted_by_sharpe().into_iter().take(n).collect()
    }

    pub fn best(&self) -> Option<&SweepEntry> {
        self.sorted_by_sharpe().into_iter().next()
    }

    /// Index by run id.
    pub fn by_run_id(&self) -> HashMap<&str, &SweepEntry> {
        self.entries
            .iter()
            .map(|e| (e.result.run_id.as_str(), e))
            .collect()
    }
}
