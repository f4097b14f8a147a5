//! Account state owned by a single simulation run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::fill::Fill;
use super::position::Position;

/// One mark-to-market observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub total_value: f64,
}

/// Cash, the optional open position, and the append-only equity history.
///
/// Created once per run and never shared between runs.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub cash: f64,
    pub position: Option<Position>,
    pub equity_history: Vec<EquityPoint>,
}

impl AccountState {
    pub fn new(starting_cash: f64) -> Self {
        Self {
            cash: starting_cash,
            position: None,
            equity_history: Vec::new(),
        }
    }

    pub fn with_capacity(starting_cash: f64, bars: usize) -> Self {
        Self {
            equity_history: Vec::with_capacity(bars),
            ..Self::new(starting_cash)
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Apply a fill's cash movement.
    pub fn settle_cash(&mut self, fill: &Fill) {
        self.cash += fill.cash_delta();
    }

    /// Mark the open position at `close` and append today's total value.
    pub fn mark_to_market(&mut self, date: NaiveDate, close: f64) -> f64 {
        let total_value = match self.position.as_mut() {
            Some(pos) => {
                pos.mark(close);
                self.cash + pos.market_value()
            }
            None => self.cash,
        };
        self.equity_history.push(EquityPoint { date, total_value });
        total_value
    }
}
