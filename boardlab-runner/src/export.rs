//! Reporting and export: JSON, CSV and Markdown artifact generation.
//!
//! - **JSON**: the full `BacktestResult` with schema versioning
//! - **CSV**: trade tape, equity curve with drawdown, diagnostic events
//! - **Markdown**: a human-readable single-run report
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use boardlab_core::domain::{EquityPoint, Trade};
use boardlab_core::engine::DiagnosticEvent;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::series::drawdown_curve;

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult`, rejecting schema versions newer than ours.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: entry_date, entry_price, exit_date, exit_price, shares,
/// realized_pnl, return_pct, entry_fees, exit_fees, total_fees,
/// holding_days, bars_held, exit_reason
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_date",
        "entry_price",
        "exit_date",
        "exit_price",
        "shares",
        "realized_pnl",
        "return_pct",
        "entry_fees",
        "exit_fees",
        "total_fees",
        "holding_days",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.entry_date.to_string(),
            format!("{:.4}", t.entry_price),
            t.exit_date.to_string(),
            format!("{:.4}", t.exit_price),
            t.shares.to_string(),
            format!("{:.2}", t.realized_pnl),
            format!("{:.6}", t.return_pct()),
            format!("{:.2}", t.entry_fees),
            format!("{:.2}", t.exit_fees),
            format!("{:.2}", t.total_fees),
            t.holding_days.to_string(),
            t.bars_held.to_string(),
            t.exit_reason.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Columns: date, equity, drawdown
pub fn export_equity_csv(history: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity", "drawdown"])?;
    for (point, dd) in history.iter().zip(drawdown_curve(history)) {
        wtr.write_record([
            point.date.to_string(),
            format!("{:.2}", point.total_value),
            format!("{:.6}", dd.drawdown),
        ])?;
    }
    finish(wtr)
}

/// Columns: date, bar_index, side, requested_shares, reference_price, reason
pub fn export_diagnostics_csv(events: &[DiagnosticEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "bar_index",
        "side",
        "requested_shares",
        "reference_price",
        "reason",
    ])?;
    for e in events {
        wtr.write_record([
            e.date.to_string(),
            e.bar_index.to_string(),
            e.side.map(|s| s.to_string()).unwrap_or_default(),
            e.requested_shares.to_string(),
            format!("{:.4}", e.reference_price),
            e.reason().to_string(),
        ])?;
    }
    finish(wtr)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the artifact set for one run into `{symbol}_{run_id prefix}/`
/// under `output_dir`:
/// - `result.json`: the full `BacktestResult`
/// - `trades.csv`
/// - `equity.csv`: equity and drawdown per bar
/// - `diagnostics.csv`
/// - `report.md`
///
/// Returns the run directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{}", result.symbol, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let files = [
        ("result.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("equity.csv", export_equity_csv(&result.equity_history)?),
        ("diagnostics.csv", export_diagnostics_csv(&result.diagnostics.events)?),
        ("report.md", generate_report(result)),
    ];
    for (name, content) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's `result.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

fn pct(stat: crate::metrics::Stat) -> String {
    match stat.value() {
        Some(v) => format!("{:.2}%", v * 100.0),
        None => stat.to_string(),
    }
}

pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str("# Backtest Report\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Symbol | {} |\n", result.symbol));
    md.push_str(&format!("| Strategy | {} |\n", result.strategy));
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        md.push_str(&format!("| Period | {start} to {end} |\n"));
    }
    md.push_str(&format!("| Bars | {} |\n", result.bar_count));
    md.push_str(&format!("| Starting Cash | {:.2} |\n", result.starting_cash));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Final Equity | {:.2} |\n", m.final_equity));
    md.push_str(&format!("| Total Return | {} |\n", pct(m.total_return)));
    md.push_str(&format!("| Annualized Return | {} |\n", pct(m.annualized_return)));
    md.push_str(&format!("| Volatility | {} |\n", pct(m.volatility)));
    md.push_str(&format!("| Sharpe | {} |\n", m.sharpe));
    md.push_str(&format!("| Sortino | {} |\n", m.sortino));
    md.push_str(&format!("| Calmar | {} |\n", m.calmar));
    md.push_str(&format!("| Max Drawdown | {} |\n", pct(m.max_drawdown)));
    if let (Some(peak), Some(trough)) = (m.max_drawdown_peak, m.max_drawdown_trough) {
        md.push_str(&format!(
            "| Drawdown Window | {peak} to {trough} ({:.2}) |\n",
            m.max_drawdown_amount
        ));
    }
    md.push('\n');

    md.push_str("## Trades\n\n");
    if m.has_trades {
        md.push_str("| Metric | Value |\n");
        md.push_str("| --- | --- |\n");
        md.push_str(&format!("| Trades | {} |\n", m.trade_count));
        md.push_str(&format!("| Win Rate | {} |\n", pct(m.win_rate)));
        md.push_str(&format!("| Profit Factor | {} |\n", m.profit_factor));
        md.push_str(&format!("| Avg Win / Avg Loss | {} |\n", m.profit_loss_ratio));
        md.push_str(&format!("| Avg Holding Days | {} |\n", m.avg_holding_days));
        md.push_str(&format!("| Max Consecutive Wins | {} |\n", m.max_consecutive_wins));
        md.push_str(&format!("| Max Consecutive Losses | {} |\n", m.max_consecutive_losses));
        md.push_str(&format!("| Total Fees | {:.2} ({}) |\n", m.total_fees, pct(m.fee_pct)));
    } else {
        md.push_str("No closed trades.\n");
    }
    if let Some(pos) = &result.open_position {
        md.push_str(&format!(
            "\nOpen at end: {} shares from {} at {:.2}\n",
            pos.shares, pos.entry_date, pos.entry_price
        ));
    }
    md.push('\n');

    if !result.monthly_returns.is_empty() {
        md.push_str("## Monthly Returns\n\n");
        md.push_str("| Month | Return |\n");
        md.push_str("| --- | --- |\n");
        for r in &result.monthly_returns {
            md.push_str(&format!(
                "| {}-{:02} | {:.2}% |\n",
                r.year,
                r.month,
                r.return_pct * 100.0
            ));
        }
        md.push('\n');
    }

    let d = &result.diagnostics;
    md.push_str("## Diagnostics\n\n");
    md.push_str(&format!(
        "Signals: {} buy, {} sell, {} hold\n\n",
        d.signals.buy, d.signals.sell, d.signals.hold
    ));
    for reason in [
        "limit_locked",
        "below_minimum_lot",
        "settlement_deferred",
        "deferred_sell_dropped",
        "unexecuted_final_decision",
    ] {
        let n = d.count(reason);
        if n > 0 {
            md.push_str(&format!("- {reason}: {n}\n"));
        }
    }
    for warn in &d.data_quality_warnings {
        md.push_str(&format!("- warning: {warn}\n"));
    }
    md.push('\n');

    md
}
