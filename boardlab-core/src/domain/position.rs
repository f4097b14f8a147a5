use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The single open long position of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub entry_date: NaiveDate,
    /// Bar index of the entry fill. Settlement is counted in bars from here.
    pub entry_bar: usize,
    pub entry_price: f64,
    /// Always a multiple of the run's lot size.
    pub shares: u64,
    /// Close of the most recent bar, updated on every mark-to-market.
    pub last_close: f64,
    /// Commission paid on entry, carried into the closing trade.
    pub entry_fees: f64,
}

impl Position {
    pub fn market_value(&self) -> f64 {
        self.shares as f64 * self.last_close
    }

    pub fn mark(&mut self, close: f64) {
        self.last_close = close;
    }

    /// Fractional price move from entry, e.g. `-0.08` for an 8% loss.
    pub fn price_change_pct(&self, price: f64) -> f64 {
        if self.entry_price <= 0.0 {
            return 0.0;
        }
        (price - self.entry_price) / self.entry_price
    }

    /// Trading days (bars) elapsed since entry as of bar `bar_index`.
    pub fn bars_since_entry(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_bar)
    }

    /// Calendar days held as of `date`.
    pub fn calendar_days_held(&self, date: NaiveDate) -> i64 {
        (date - self.entry_date).num_days()
    }
}
