//! Technical indicators used by the bundled strategies.
//!
//! Indicators are pure functions over a bar slice: the output has the same
//! length as the input and the first `lookback()` values are `f64::NAN`.
//! No value at index `t` may depend on bars after `t`; `tests/lookahead_test.rs`
//! checks this by comparing truncated and full series.

pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;

pub use ema::{ema_of_series, Ema};
pub use macd::{Macd, MacdLine};
pub use rsi::Rsi;
pub use sma::{sma_of_series, Sma};

use crate::domain::Bar;

pub trait Indicator: Send + Sync {
    /// Name used in logs, e.g. `sma_20`.
    fn name(&self) -> &str;

    /// Leading bars with no valid output.
    fn lookback(&self) -> usize;

    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Value at index `i`, `None` past the end or while still warming up.
pub fn value_at(series: &[f64], i: usize) -> Option<f64> {
    series.get(i).copied().filter(|v| !v.is_nan())
}

/// Synthetic bars from closes: open = previous close, a one-unit range, flat volume.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: (open.min(close) - 1.0).max(0.01),
                close,
                volume: 1_000,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, epsilon={epsilon}"
    );
}
