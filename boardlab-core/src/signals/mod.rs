//! Signal precomputation: one decision per bar over the whole history.
//!
//! Strategies never see the account: `Strategy::decide` receives the bar
//! prefix `bars[..=t]` and nothing else, so decision `t` cannot depend on
//! bars after `t` or on what the simulator did with earlier decisions.

pub mod buy_and_hold;
pub mod ma_crossover;
pub mod momentum;

pub use buy_and_hold::BuyAndHold;
pub use ma_crossover::MaCrossover;
pub use momentum::{Momentum, MomentumParams};

use thiserror::Error;

use crate::domain::{Action, Bar, Decision};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    #[error("strategy '{strategy}' needs at least {required} bars, only {available} provided")]
    InsufficientHistory {
        strategy: String,
        required: usize,
        available: usize,
    },
}

/// A pure decision function over a bar prefix.
///
/// # Invariants
/// - `decide()` sees `bars[..=t]` only and is deterministic for a given prefix
/// - `lookback()` leading bars are required before the first real decision
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    /// Bars that must precede the first decided bar. Decisions for bars
    /// `0..lookback()` are HOLD without consulting the strategy.
    fn lookback(&self) -> usize;

    /// Decide for the last bar of `history`.
    fn decide(&self, history: &[Bar]) -> Action;

    /// One action per bar of `bars`. Entry `t` must equal
    /// `decide(&bars[..=t])`, and the first `lookback()` entries are HOLD.
    /// Override when indicators can be computed once for the whole series.
    fn decide_series(&self, bars: &[Bar]) -> Vec<Action> {
        let lookback = self.lookback();
        (0..bars.len())
            .map(|t| {
                if t < lookback {
                    Action::Hold
                } else {
                    self.decide(&bars[..=t])
                }
            })
            .collect()
    }
}

/// Produce one decision per bar.
///
/// Fails with `InsufficientHistory` when the series is too short for the
/// strategy to make even one real decision. An empty series yields an empty
/// decision list.
pub fn precompute(bars: &[Bar], strategy: &dyn Strategy) -> Result<Vec<Decision>, SignalError> {
    if bars.is_empty() {
        return Ok(Vec::new());
    }

    let lookback = strategy.lookback();
    if bars.len() <= lookback {
        return Err(SignalError::InsufficientHistory {
            strategy: strategy.name().to_string(),
            required: lookback + 1,
            available: bars.len(),
        });
    }

    let decisions: Vec<Decision> = bars
        .iter()
        .zip(strategy.decide_series(bars))
        .map(|(bar, action)| Decision::new(bar.date, action))
        .collect();

    tracing::debug!(
        strategy = strategy.name(),
        bars = bars.len(),
        warmup = lookback,
        buys = decisions.iter().filter(|d| d.action == Action::Buy).count(),
        sells = decisions.iter().filter(|d| d.action == Action::Sell).count(),
        "precomputed decisions"
    );

    Ok(decisions)
}
