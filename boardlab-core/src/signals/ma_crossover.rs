//! Moving average crossover.
//!
//! - BUY while the fast SMA is above the slow SMA
//! - SELL while the fast SMA is below the slow SMA
//! - HOLD when they are equal
//!
//! Emitting the regime rather than only the crossing bar lets a BUY that was
//! limit-locked on the crossing day fill on a later day of the same regime.

use super::Strategy;
use crate::domain::{Action, Bar};

#[derive(Debug, Clone)]
pub struct MaCrossover {
    fast_period: usize,
    slow_period: usize,
    name: String,
}

impl MaCrossover {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        assert!(fast_period > 0, "fast_period must be > 0");
        assert!(slow_period > fast_period, "slow_period must be > fast_period");
        Self {
            fast_period,
            slow_period,
            name: format!("ma_crossover_{fast_period}_{slow_period}"),
        }
    }

    pub fn fast_period(&self) -> usize {
        self.fast_period
    }

    pub fn slow_period(&self) -> usize {
        self.slow_period
    }

    /// Mean close of the trailing `period` bars.
    fn tail_mean(bars: &[Bar], period: usize) -> Option<f64> {
        let start = bars.len().checked_sub(period)?;
        let sum: f64 = bars[start..].iter().map(|b| b.close).sum();
        Some(sum / period as f64)
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow_period - 1
    }

    fn decide(&self, history: &[Bar]) -> Action {
        let fast = Self::tail_mean(history, self.fast_period);
        let slow = Self::tail_mean(history, self.slow_period);
        match (fast, slow) {
            (Some(f), Some(s)) if f > s => Action::Buy,
            (Some(f), Some(s)) if f < s => Action::Sell,
            _ => Action::Hold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn uptrend_is_buy() {
        let strategy = MaCrossover::new(2, 4);
        let bars = make_bars(&[10.0, 10.2, 10.4, 10.9]);
        assert_eq!(strategy.decide(&bars), Action::Buy);
    }

    #[test]
    fn downtrend_is_sell() {
        let strategy = MaCrossover::new(2, 4);
        let bars = make_bars(&[10.9, 10.4, 10.2, 10.0]);
        assert_eq!(strategy.decide(&bars), Action::Sell);
    }

    #[test]
    fn flat_is_hold() {
        let strategy = MaCrossover::new(2, 4);
        let bars = make_bars(&[10.0; 4]);
        assert_eq!(strategy.decide(&bars), Action::Hold);
    }

    #[test]
    fn insufficient_prefix_is_hold() {
        let strategy = MaCrossover::new(5, 20);
        let bars = make_bars(&[10.0, 11.0]);
        assert_eq!(strategy.decide(&bars), Action::Hold);
    }

    #[test]
    fn lookback_and_name() {
        let strategy = MaCrossover::new(5, 20);
        assert_eq!(strategy.lookback(), 19);
        assert_eq!(strategy.name(), "ma_crossover_5_20");
    }
}
