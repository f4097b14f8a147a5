//! Trade: a closed round trip, appended once per closing SELL fill.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why the position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    /// The decision series said SELL.
    Signal,
    StopLoss,
    TakeProfit,
    MaxHoldingDays,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::Signal => "signal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::MaxHoldingDays => "max_holding_days",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    // ── Entry ──
    pub entry_bar: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub shares: u64,

    // ── PnL ──
    /// `(exit_price - entry_price) * shares - total_fees`.
    pub realized_pnl: f64,
    pub entry_fees: f64,
    pub exit_fees: f64,
    pub total_fees: f64,

    // ── Duration ──
    /// Calendar days between entry and exit.
    pub holding_days: i64,
    /// Trading days (bars) between entry and exit.
    pub bars_held: usize,
}

impl Trade {
    pub fn is_winner(&self) -> bool {
        self.realized_pnl > 0.0
    }

    /// Strictly negative P&L. Breakeven trades are neither winners nor losers.
    pub fn is_loser(&self) -> bool {
        self.realized_pnl < 0.0
    }

    /// Net P&L as a fraction of the entry notional.
    pub fn return_pct(&self) -> f64 {
        let cost = self.entry_price * self.shares as f64;
        if cost == 0.0 {
            return 0.0;
        }
        self.realized_pnl / cost
    }
}
