//! Exponential moving average.
//!
//! Seeded with the SMA of the first `period` values, then
//! `ema[t] = alpha * x[t] + (1 - alpha) * ema[t-1]` with `alpha = 2 / (period + 1)`.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        ema_of_series(&closes, self.period)
    }
}

/// EMA over an arbitrary series. Leading NaNs in `values` are skipped, so an
/// EMA can be stacked on top of another indicator's output.
pub fn ema_of_series(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 {
        return out;
    }

    let start = match values.iter().position(|v| !v.is_nan()) {
        Some(s) => s,
        None => return out,
    };
    if n - start < period {
        return out;
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed_end = start + period;
    let mut prev = values[start..seed_end].iter().sum::<f64>() / period as f64;
    out[seed_end - 1] = prev;
    for i in seed_end..n {
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        out[i] = prev;
    }
    out
}
