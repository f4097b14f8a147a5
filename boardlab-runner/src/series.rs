//! Plot series derived from the equity history.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use boardlab_core::domain::EquityPoint;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: NaiveDate,
    /// `(running_peak - value) / running_peak`, zero at a new high.
    pub drawdown: f64,
}

/// Deepest peak-to-trough decline of an equity history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownInfo {
    pub max_drawdown: f64,
    pub max_drawdown_amount: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyReturn {
    pub year: i32,
    pub month: u32,
    pub return_pct: f64,
}

/// The equity curve is the history as-is; this is its value column.
pub fn equity_values(history: &[EquityPoint]) -> Vec<f64> {
    history.iter().map(|p| p.total_value).collect()
}

/// Simple returns between consecutive equity values.
pub fn daily_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|w| {
            if w[0] > 0.0 {
                (w[1] - w[0]) / w[0]
            } else {
                0.0
            }
        })
        .collect()
}

/// Per-point drawdown against the running peak, single pass.
pub fn drawdown_curve(history: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let mut peak = f64::NEG_INFINITY;
    history
        .iter()
        .map(|p| {
            peak = peak.max(p.total_value);
            let drawdown = if peak > 0.0 {
                (peak - p.total_value) / peak
            } else {
                0.0
            };
            DrawdownPoint {
                date: p.date,
                drawdown,
            }
        })
        .collect()
}

/// Single pass tracking the running peak and the deepest fractional decline.
pub fn max_drawdown_info(history: &[EquityPoint]) -> DrawdownInfo {
    let Some(first) = history.first() else {
        return DrawdownInfo::default();
    };

    let mut info = DrawdownInfo::default();
    let mut peak = first.total_value;
    let mut peak_date = first.date;

    for p in history {
        if p.total_value > peak {
            peak = p.total_value;
            peak_date = p.date;
        }
        if peak <= 0.0 {
            continue;
        }
        let dd = (peak - p.total_value) / peak;
        if dd > info.max_drawdown {
            info = DrawdownInfo {
                max_drawdown: dd,
                max_drawdown_amount: peak - p.total_value,
                peak_date: Some(peak_date),
                trough_date: Some(p.date),
            };
        }
    }
    info
}

/// Month-end to month-end returns. The first month is measured from
/// `starting_cash`.
pub fn monthly_returns(history: &[EquityPoint], starting_cash: f64) -> Vec<MonthlyReturn> {
    let mut month_ends: Vec<(i32, u32, f64)> = Vec::new();
    for p in history {
        let key = (p.date.year(), p.date.month());
        match month_ends.last_mut() {
            Some(last) if (last.0, last.1) == key => last.2 = p.total_value,
            _ => month_ends.push((key.0, key.1, p.total_value)),
        }
    }

    let mut prev = starting_cash;
    month_ends
        .into_iter()
        .map(|(year, month, value)| {
            let return_pct = if prev > 0.0 { value / prev - 1.0 } else { 0.0 };
            prev = value;
            MonthlyReturn {
                year,
                month,
                return_pct,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(start: NaiveDate, values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: start + chrono::Duration::days(i as i64),
                total_value: v,
            })
            .collect()
    }

    fn jan(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let history = curve(jan(2), &[100_000.0, 110_000.0, 95_000.0, 105_000.0]);
        let info = max_drawdown_info(&history);
        assert!((info.max_drawdown - 0.136_363_636).abs() < 1e-6);
        assert_eq!(info.max_drawdown_amount, 15_000.0);
        assert_eq!(info.peak_date, Some(jan(3)));
        assert_eq!(info.trough_date, Some(jan(4)));
    }

    #[test]
    fn drawdown_curve_is_zero_at_new_highs() {
        let history = curve(jan(2), &[100.0, 120.0, 90.0, 130.0]);
        let dd: Vec<f64> = drawdown_curve(&history).iter().map(|p| p.drawdown).collect();
        assert_eq!(dd[0], 0.0);
        assert_eq!(dd[1], 0.0);
        assert!((dd[2] - 0.25).abs() < 1e-12);
        assert_eq!(dd[3], 0.0);
    }

    #[test]
    fn monotonic_curve_has_no_drawdown() {
        let history = curve(jan(2), &[1.0, 2.0, 3.0]);
        let info = max_drawdown_info(&history);
        assert_eq!(info.max_drawdown, 0.0);
        assert_eq!(info.peak_date, None);
    }

    #[test]
    fn empty_series() {
        assert!(drawdown_curve(&[]).is_empty());
        assert!(daily_returns(&[]).is_empty());
        assert!(monthly_returns(&[], 100.0).is_empty());
        assert_eq!(max_drawdown_info(&[]), DrawdownInfo::default());
    }

    #[test]
    fn monthly_returns_chain_month_ends() {
        // Jan 30, Jan 31, Feb 1, Feb 2
        let history = curve(jan(30), &[105.0, 110.0, 100.0, 121.0]);
        let months = monthly_returns(&history, 100.0);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 1));
        assert!((months[0].return_pct - 0.10).abs() < 1e-12);
        assert_eq!(months[1].month, 2);
        assert!((months[1].return_pct - 0.10).abs() < 1e-12);
    }
}
