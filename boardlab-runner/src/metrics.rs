//! Performance metrics: pure functions over a finished run.
//!
//! Inputs are the equity history and the trade log; nothing here touches
//! simulator state. Every ratio reports `Stat::Undefined` or `Stat::Infinite`
//! instead of dividing by zero.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use boardlab_core::domain::{EquityPoint, Trade};
use boardlab_core::engine::{EngineConfig, SimulationResult};

use crate::series::{daily_returns, equity_values, max_drawdown_info};

/// A statistic that may not be computable for the given input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Stat {
    Value(f64),
    /// Positive numerator over a zero denominator (Calmar with no drawdown).
    Infinite,
    /// Not enough data, or zero over zero.
    Undefined,
}

impl Stat {
    /// `num / den`, with a zero denominator mapped to `Infinite` for a
    /// positive numerator and `Undefined` otherwise.
    pub fn ratio(num: f64, den: f64) -> Self {
        if !num.is_finite() || !den.is_finite() {
            return Stat::Undefined;
        }
        if den == 0.0 {
            return if num > 0.0 {
                Stat::Infinite
            } else {
                Stat::Undefined
            };
        }
        Stat::from(num / den)
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Stat::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_defined(self) -> bool {
        !matches!(self, Stat::Undefined)
    }

    /// Numeric view for ranking: `Infinite` sorts above every value.
    pub fn rank_value(self) -> f64 {
        match self {
            Stat::Value(v) => v,
            Stat::Infinite => f64::INFINITY,
            Stat::Undefined => f64::NEG_INFINITY,
        }
    }

    fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Stat::Value(v) => Stat::Value(f(v)),
            other => other,
        }
    }
}

impl From<f64> for Stat {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Stat::Value(v)
        } else {
            Stat::Undefined
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Value(v) => write!(f, "{v:.4}"),
            Stat::Infinite => f.write_str("inf"),
            Stat::Undefined => f.write_str("undefined"),
        }
    }
}

/// Parameters the analytics need that are not in the equity history itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsParams {
    pub starting_cash: f64,
    pub trading_days_per_year: usize,
    pub risk_free_rate: f64,
}

impl AnalyticsParams {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            starting_cash: config.starting_cash,
            trading_days_per_year: config.trading_days_per_year,
            risk_free_rate: config.risk_free_rate,
        }
    }
}

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub bar_count: usize,
    pub starting_cash: f64,
    pub final_equity: f64,

    // ── Returns ──
    pub total_return: Stat,
    pub annualized_return: Stat,

    // ── Risk ──
    pub volatility: Stat,
    pub sharpe: Stat,
    pub sortino: Stat,
    pub calmar: Stat,
    /// Positive fraction of the running peak, e.g. 0.15 for a 15% drawdown.
    pub max_drawdown: Stat,
    pub max_drawdown_amount: f64,
    pub max_drawdown_peak: Option<NaiveDate>,
    pub max_drawdown_trough: Option<NaiveDate>,

    // ── Trades ──
    pub trade_count: usize,
    /// False when there are no closed trades; trade ratios are then undefined.
    pub has_trades: bool,
    pub win_rate: Stat,
    pub profit_factor: Stat,
    /// Average winning P&L over the absolute average losing P&L.
    pub profit_loss_ratio: Stat,
    pub avg_holding_days: Stat,
    pub avg_bars_held: Stat,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    pub total_fees: f64,
    /// Closed-trade fees as a fraction of starting cash.
    pub fee_pct: Stat,
}

impl PerformanceMetrics {
    /// Compute every metric from an equity history and trade log.
    pub fn compute(equity: &[EquityPoint], trades: &[Trade], params: &AnalyticsParams) -> Self {
        let values = equity_values(equity);
        let tdpy = params.trading_days_per_year;

        let ann = annualized_return(&values, params.starting_cash, tdpy);
        let vol = volatility(&values, tdpy);
        let dd = max_drawdown_info(equity);
        let max_dd = if equity.is_empty() {
            Stat::Undefined
        } else {
            Stat::Value(dd.max_drawdown)
        };
        let total_fees = sum(trades.iter().map(|t| t.total_fees));

        Self {
            bar_count: equity.len(),
            starting_cash: params.starting_cash,
            final_equity: values.last().copied().unwrap_or(params.starting_cash),
            total_return: total_return(&values, params.starting_cash),
            annualized_return: ann,
            volatility: vol,
            sharpe: sharpe_ratio(ann, vol, params.risk_free_rate),
            sortino: sortino_ratio(&values, ann, tdpy, params.risk_free_rate),
            calmar: calmar_ratio(ann, max_dd),
            max_drawdown: max_dd,
            max_drawdown_amount: dd.max_drawdown_amount,
            max_drawdown_peak: dd.peak_date,
            max_drawdown_trough: dd.trough_date,
            trade_count: trades.len(),
            has_trades: !trades.is_empty(),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            profit_loss_ratio: profit_loss_ratio(trades),
            avg_holding_days: average(trades.iter().map(|t| t.holding_days as f64)),
            avg_bars_held: average(trades.iter().map(|t| t.bars_held as f64)),
            max_consecutive_wins: max_consecutive(trades, true),
            max_consecutive_losses: max_consecutive(trades, false),
            total_fees,
            fee_pct: Stat::ratio(total_fees, params.starting_cash),
        }
    }

    pub fn from_simulation(result: &SimulationResult, config: &EngineConfig) -> Self {
        Self::compute(
            &result.equity_history,
            &result.trades,
            &AnalyticsParams::from_config(config),
        )
    }

    /// Flat string-keyed view for reporting. Counts are reported as values.
    pub fn to_stat_map(&self) -> BTreeMap<String, Stat> {
        let count = |n: usize| Stat::Value(n as f64);
        let entries = [
            ("total_return", self.total_return),
            ("annualized_return", self.annualized_return),
            ("volatility", self.volatility),
            ("sharpe", self.sharpe),
            ("sortino", self.sortino),
            ("calmar", self.calmar),
            ("max_drawdown", self.max_drawdown),
            ("trade_count", count(self.trade_count)),
            ("win_rate", self.win_rate),
            ("profit_factor", self.profit_factor),
            ("profit_loss_ratio", self.profit_loss_ratio),
            ("avg_holding_days", self.avg_holding_days),
            ("avg_bars_held", self.avg_bars_held),
            ("max_consecutive_wins", count(self.max_consecutive_wins)),
            ("max_consecutive_losses", count(self.max_consecutive_losses)),
            ("total_fees", Stat::Value(self.total_fees)),
            ("fee_pct", self.fee_pct),
        ];
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// `final / starting_cash - 1`.
pub fn total_return(values: &[f64], starting_cash: f64) -> Stat {
    match values.last() {
        Some(&last) => Stat::ratio(last, starting_cash).map(|r| r - 1.0),
        None => Stat::Undefined,
    }
}

/// Compounded over the number of bars simulated:
/// `(final / starting_cash) ^ (trading_days_per_year / bars) - 1`.
pub fn annualized_return(values: &[f64], starting_cash: f64, trading_days_per_year: usize) -> Stat {
    let Some(&last) = values.last() else {
        return Stat::Undefined;
    };
    if starting_cash <= 0.0 {
        return Stat::Undefined;
    }
    if last <= 0.0 {
        return Stat::Value(-1.0);
    }
    let exponent = trading_days_per_year as f64 / values.len() as f64;
    Stat::from((last / starting_cash).powf(exponent) - 1.0)
}

/// Annualized sample standard deviation of daily returns.
pub fn volatility(values: &[f64], trading_days_per_year: usize) -> Stat {
    let returns = daily_returns(values);
    match sample_std(&returns) {
        Some(std) => Stat::Value(std * (trading_days_per_year as f64).sqrt()),
        None => Stat::Undefined,
    }
}

/// `(annualized_return - risk_free_rate) / volatility`.
pub fn sharpe_ratio(annualized_return: Stat, volatility: Stat, risk_free_rate: f64) -> Stat {
    match (annualized_return, volatility) {
        (Stat::Value(ann), Stat::Value(vol)) => Stat::ratio(ann - risk_free_rate, vol),
        _ => Stat::Undefined,
    }
}

/// Same numerator as Sharpe over the annualized deviation of negative
/// daily returns only. No losing days with a positive numerator is `Infinite`.
pub fn sortino_ratio(
    values: &[f64],
    annualized_return: Stat,
    trading_days_per_year: usize,
    risk_free_rate: f64,
) -> Stat {
    let Stat::Value(ann) = annualized_return else {
        return Stat::Undefined;
    };
    let returns = daily_returns(values);
    if returns.len() < 2 {
        return Stat::Undefined;
    }
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let excess = ann - risk_free_rate;
    if downside.is_empty() {
        return Stat::ratio(excess, 0.0);
    }
    match sample_std(&downside) {
        Some(std) => Stat::ratio(excess, std * (trading_days_per_year as f64).sqrt()),
        None => Stat::Undefined,
    }
}

/// `annualized_return / max_drawdown`. Zero drawdown is `Infinite` when the
/// return is positive, `Undefined` otherwise.
pub fn calmar_ratio(annualized_return: Stat, max_drawdown: Stat) -> Stat {
    match (annualized_return, max_drawdown) {
        (Stat::Value(ann), Stat::Value(dd)) => Stat::ratio(ann, dd),
        _ => Stat::Undefined,
    }
}

/// Closed trades with positive P&L over all closed trades.
pub fn win_rate(trades: &[Trade]) -> Stat {
    if trades.is_empty() {
        return Stat::Undefined;
    }
    let winners = trades.iter().filter(|t| t.is_winner()).count();
    Stat::Value(winners as f64 / trades.len() as f64)
}

/// Gross winning P&L over absolute gross losing P&L. P&L is already net of fees.
pub fn profit_factor(trades: &[Trade]) -> Stat {
    if trades.is_empty() {
        return Stat::Undefined;
    }
    let gross_profit = sum(
        trades
            .iter()
            .filter(|t| t.realized_pnl > 0.0)
            .map(|t| t.realized_pnl),
    );
    let gross_loss = sum(
        trades
            .iter()
            .filter(|t| t.is_loser())
            .map(|t| t.realized_pnl.abs()),
    );
    Stat::ratio(gross_profit, gross_loss)
}

/// Average win over average loss. With losses but no wins the average win
/// is zero.
pub fn profit_loss_ratio(trades: &[Trade]) -> Stat {
    let avg_win = average(
        trades
            .iter()
            .filter(|t| t.realized_pnl > 0.0)
            .map(|t| t.realized_pnl),
    );
    let avg_loss = average(
        trades
            .iter()
            .filter(|t| t.is_loser())
            .map(|t| t.realized_pnl.abs()),
    );
    match (avg_win, avg_loss) {
        (Stat::Value(w), Stat::Value(l)) => Stat::ratio(w, l),
        (Stat::Undefined, Stat::Value(l)) => Stat::ratio(0.0, l),
        (Stat::Value(_), Stat::Undefined) => Stat::Infinite,
        _ => Stat::Undefined,
    }
}

/// Longest run of winners (`winners = true`) or losers in trade order. A
/// breakeven trade ends either streak.
pub fn max_consecutive(trades: &[Trade], winners: bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for trade in trades {
        let counts = if winners {
            trade.is_winner()
        } else {
            trade.is_loser()
        };
        if counts {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

/// Sum that starts from `+0.0`, so an empty input is never `-0.0`.
fn sum(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |acc, v| acc + v)
}

fn average(values: impl Iterator<Item = f64>) -> Stat {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        Stat::Undefined
    } else {
        Stat::Value(sum / n as f64)
    }
}

/// Sample standard deviation (n - 1). `None` with fewer than two values.
pub(crate) fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use boardlab_core::domain::ExitReason;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn make_trade(realized_pnl: f64, fees: f64) -> Trade {
        Trade {
            entry_bar: 0,
            entry_date: date(2),
            entry_price: 10.0,
            exit_bar: 3,
            exit_date: date(5),
            exit_price: 10.0 + (realized_pnl + fees) / 1_000.0,
            exit_reason: ExitReason::Signal,
            shares: 1_000,
            realized_pnl,
            entry_fees: fees / 2.0,
            exit_fees: fees / 2.0,
            total_fees: fees,
            holding_days: 3,
            bars_held: 3,
        }
    }

    fn curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: date(2) + chrono::Duration::days(i as i64),
                total_value: v,
            })
            .collect()
    }

    fn params(starting_cash: f64) -> AnalyticsParams {
        AnalyticsParams {
            starting_cash,
            trading_days_per_year: 252,
            risk_free_rate: 0.0,
        }
    }

    // ── Stat ──

    #[test]
    fn ratio_handles_zero_denominator() {
        assert_eq!(Stat::ratio(1.0, 0.0), Stat::Infinite);
        assert_eq!(Stat::ratio(0.0, 0.0), Stat::Undefined);
        assert_eq!(Stat::ratio(-1.0, 0.0), Stat::Undefined);
        assert_eq!(Stat::ratio(1.0, 4.0), Stat::Value(0.25));
    }

    #[test]
    fn stat_serializes_with_kind() {
        let json = serde_json::to_string(&Stat::Infinite).unwrap();
        assert_eq!(json, r#"{"kind":"infinite"}"#);
        let json = serde_json::to_string(&Stat::Value(0.5)).unwrap();
        assert_eq!(json, r#"{"kind":"value","value":0.5}"#);
    }

    // ── Trade statistics ──

    #[test]
    fn win_rate_and_profit_factor_for_two_trades() {
        let trades = vec![make_trade(500.0, 10.0), make_trade(-200.0, 10.0)];
        assert_eq!(win_rate(&trades), Stat::Value(0.5));
        assert_eq!(profit_factor(&trades), Stat::Value(2.5));
        assert_eq!(profit_loss_ratio(&trades), Stat::Value(2.5));
    }

    #[test]
    fn no_losses_means_infinite_profit_factor() {
        let trades = vec![make_trade(100.0, 10.0)];
        assert_eq!(profit_factor(&trades), Stat::Infinite);
        assert_eq!(profit_loss_ratio(&trades), Stat::Infinite);
    }

    #[test]
    fn no_trades_is_undefined_with_flag() {
        let m = PerformanceMetrics::compute(&curve(&[100.0, 101.0]), &[], &params(100.0));
        assert!(!m.has_trades);
        assert_eq!(m.win_rate, Stat::Undefined);
        assert_eq!(m.profit_factor, Stat::Undefined);
        assert_eq!(m.avg_holding_days, Stat::Undefined);
    }

    #[test]
    fn streaks() {
        let trades: Vec<Trade> = [1.0, 2.0, -1.0, 3.0, 4.0, 5.0, -1.0, -2.0]
            .iter()
            .map(|&p| make_trade(p, 0.0))
            .collect();
        assert_eq!(max_consecutive(&trades, true), 3);
        assert_eq!(max_consecutive(&trades, false), 2);
    }

    #[test]
    fn breakeven_trade_breaks_a_losing_streak() {
        let trades: Vec<Trade> = [-100.0, 0.0, -50.0]
            .iter()
            .map(|&p| make_trade(p, 0.0))
            .collect();
        assert_eq!(max_consecutive(&trades, false), 1);
        assert_eq!(max_consecutive(&trades, true), 0);
    }

    #[test]
    fn only_losses_gives_zero_ratios() {
        let trades = vec![make_trade(-100.0, 10.0), make_trade(-50.0, 10.0)];
        assert_eq!(profit_loss_ratio(&trades), Stat::Value(0.0));
        assert_eq!(profit_factor(&trades), Stat::Value(0.0));
        let pf = profit_factor(&trades).value().unwrap();
        assert!(pf.is_sign_positive());
        let json = serde_json::to_string(&profit_factor(&trades)).unwrap();
        assert_eq!(json, r#"{"kind":"value","value":0.0}"#);
    }

    #[test]
    fn no_trades_reports_positive_zero_fees() {
        let m = PerformanceMetrics::compute(&curve(&[100.0, 101.0]), &[], &params(100.0));
        assert_eq!(m.total_fees, 0.0);
        assert!(m.total_fees.is_sign_positive());
    }

    // ── Returns and risk ──

    #[test]
    fn total_return_uses_starting_cash() {
        let r = total_return(&[100.0, 110.0], 100.0).value().unwrap();
        assert!((r - 0.10).abs() < 1e-12);
        assert_eq!(total_return(&[], 100.0), Stat::Undefined);
    }

    #[test]
    fn one_year_of_bars_annualizes_to_total_return() {
        let mut values = vec![100_000.0; 251];
        values.push(110_000.0);
        let ann = annualized_return(&values, 100_000.0, 252).value().unwrap();
        assert!((ann - 0.10).abs() < 1e-9);
    }

    #[test]
    fn flat_equity_has_undefined_sharpe_and_calmar() {
        let m = PerformanceMetrics::compute(&curve(&[100.0; 10]), &[], &params(100.0));
        assert_eq!(m.volatility, Stat::Value(0.0));
        assert_eq!(m.sharpe, Stat::Undefined);
        assert_eq!(m.max_drawdown, Stat::Value(0.0));
        assert_eq!(m.calmar, Stat::Undefined);
    }

    #[test]
    fn rising_equity_without_drawdown_has_infinite_calmar() {
        let m = PerformanceMetrics::compute(
            &curve(&[100.0, 101.0, 103.0, 106.0]),
            &[],
            &params(100.0),
        );
        assert_eq!(m.calmar, Stat::Infinite);
        assert_eq!(m.sortino, Stat::Infinite);
        assert!(m.sharpe.value().unwrap() > 0.0);
    }

    #[test]
    fn calmar_uses_drawdown_fraction() {
        let m = PerformanceMetrics::compute(
            &curve(&[100_000.0, 110_000.0, 95_000.0, 105_000.0]),
            &[],
            &params(100_000.0),
        );
        let dd = m.max_drawdown.value().unwrap();
        assert!((dd - 15_000.0 / 110_000.0).abs() < 1e-12);
        let ann = m.annualized_return.value().unwrap();
        assert!((m.calmar.value().unwrap() - ann / dd).abs() < 1e-9);
    }

    #[test]
    fn sortino_uses_only_losing_days() {
        let values = [100.0, 102.0, 101.0, 103.0, 100.0, 104.0];
        let ann = annualized_return(&values, 100.0, 252);
        let s = sortino_ratio(&values, ann, 252, 0.0).value().unwrap();
        let downside = [(101.0 - 102.0) / 102.0, (100.0 - 103.0) / 103.0];
        let expected = ann.value().unwrap() / (sample_std(&downside).unwrap() * 252f64.sqrt());
        assert!((s - expected).abs() < 1e-9);
    }

    #[test]
    fn empty_history_is_undefined_everywhere() {
        let m = PerformanceMetrics::compute(&[], &[], &params(100_000.0));
        assert_eq!(m.final_equity, 100_000.0);
        for (name, stat) in m.to_stat_map() {
            let counts_or_sums = [
                "trade_count",
                "max_consecutive_wins",
                "max_consecutive_losses",
                "total_fees",
                "fee_pct",
            ];
            if counts_or_sums.contains(&name.as_str()) {
                continue;
            }
            assert_eq!(stat, Stat::Undefined, "{name} should be undefined");
        }
    }

    #[test]
    fn fee_totals() {
        let trades = vec![make_trade(500.0, 10.0), make_trade(-200.0, 10.0)];
        let m = PerformanceMetrics::compute(
            &curve(&[100_000.0, 100_300.0]),
            &trades,
            &params(100_000.0),
        );
        assert_eq!(m.total_fees, 20.0);
        assert_eq!(m.fee_pct, Stat::Value(20.0 / 100_000.0));
    }
}
