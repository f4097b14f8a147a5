//! Bar: one trading day of market data for the instrument under test.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar.
///
/// Bars are immutable once loaded. A run consumes a single instrument, so the
/// symbol lives on the run configuration rather than on every bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    /// True when every price field is finite and strictly positive.
    ///
    /// Bars failing this check are fatal input errors for the simulator.
    pub fn has_valid_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }

    /// Range consistency: high is the top of the bar, low is the bottom.
    ///
    /// Vendors occasionally publish bars that break this; they are reported as
    /// data quality warnings but still simulated.
    pub fn is_sane(&self) -> bool {
        self.has_valid_prices()
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }
}
