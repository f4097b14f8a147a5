//! BoardLab CLI: run, sweep and synthetic-data commands.
//!
//! Commands:
//! - `run`: execute a backtest from a TOML config and a bars CSV, optionally
//!   with an external signal CSV instead of the configured strategy
//! - `sweep`: MA-crossover grid over fast/slow periods
//! - `synth`: write a seeded random-walk bars CSV

mod obs;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use boardlab_runner::data_loader::{load_bars_csv, load_decisions_csv, write_bars, DataSource};
use boardlab_runner::export::{export_json, save_artifacts};
use boardlab_runner::{
    generate_bars, run_from_config, BacktestConfig, BacktestResult, LoadedData, ParamGrid,
    ParamSweep, SyntheticParams,
};

use crate::obs::{init_tracing, LogFormat};

#[derive(Parser)]
#[command(name = "boardlab", about = "BoardLab: A-share daily-bar backtesting")]
struct Cli {
    /// Log level for BoardLab crates. `BOARDLAB_LOG` takes precedence.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a single backtest.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bars CSV (English or vendor Chinese headers).
        #[arg(long, conflicts_with = "synthetic_seed")]
        bars: Option<PathBuf>,

        /// Use seeded synthetic bars instead of a CSV.
        #[arg(long)]
        synthetic_seed: Option<u64>,

        /// `date,action` CSV. Overrides the config's `[strategy]`.
        #[arg(long)]
        decisions: Option<PathBuf>,

        /// Directory for result.json, trades.csv, equity.csv and report.md.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the full result as JSON instead of a summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run an MA-crossover grid in parallel.
    Sweep {
        #[arg(long)]
        config: PathBuf,

        #[arg(long, conflicts_with = "synthetic_seed")]
        bars: Option<PathBuf>,

        #[arg(long)]
        synthetic_seed: Option<u64>,

        /// Fast periods, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![5, 10, 20])]
        fast: Vec<usize>,

        /// Slow periods, comma separated.
        #[arg(long, value_delimiter = ',', default_values_t = vec![20, 60, 120])]
        slow: Vec<usize>,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        threads: Option<usize>,

        /// Rows to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Write synthetic bars to a CSV file.
    Synth {
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = 500)]
        days: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// First trading date (YYYY-MM-DD).
        #[arg(long, default_value = "2023-01-03")]
        start: String,

        #[arg(long, default_value_t = 10.0)]
        start_price: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            config,
            bars,
            synthetic_seed,
            decisions,
            out,
            json,
        } => run_cmd(config, bars, synthetic_seed, decisions, out, json),
        Commands::Sweep {
            config,
            bars,
            synthetic_seed,
            fast,
            slow,
            threads,
            top,
        } => sweep_cmd(config, bars, synthetic_seed, ParamGrid::new(fast, slow), threads, top),
        Commands::Synth {
            out,
            days,
            seed,
            start,
            start_price,
        } => synth_cmd(out, days, seed, &start, start_price),
    }
}

fn load_data(bars: Option<PathBuf>, synthetic_seed: Option<u64>) -> Result<LoadedData> {
    match (bars, synthetic_seed) {
        (Some(path), _) => load_bars_csv(&path)
            .with_context(|| format!("failed to load bars from {}", path.display())),
        (None, Some(seed)) => {
            let params = SyntheticParams {
                seed,
                ..SyntheticParams::default()
            };
            Ok(LoadedData::new(generate_bars(&params), DataSource::Synthetic { seed }))
        }
        (None, None) => bail!("one of --bars or --synthetic-seed is required"),
    }
}

fn run_cmd(
    config_path: PathBuf,
    bars: Option<PathBuf>,
    synthetic_seed: Option<u64>,
    decisions: Option<PathBuf>,
    out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let data = load_data(bars, synthetic_seed)?;
    let decisions = decisions
        .map(|path| {
            load_decisions_csv(&path)
                .with_context(|| format!("failed to load decisions from {}", path.display()))
        })
        .transpose()?;

    tracing::info!(
        config = %config_path.display(),
        bars = data.bars.len(),
        external_signals = decisions.is_some(),
        "starting run"
    );
    let result = run_from_config(&data, decisions.as_deref(), &config)?;

    if json {
        println!("{}", export_json(&result)?);
    } else {
        print_summary(&result);
    }

    if let Some(dir) = out {
        let run_dir = save_artifacts(&result, &dir)?;
        eprintln!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn sweep_cmd(
    config_path: PathBuf,
    bars: Option<PathBuf>,
    synthetic_seed: Option<u64>,
    grid: ParamGrid,
    threads: Option<usize>,
    top: usize,
) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let data = load_data(bars, synthetic_seed)?;
    if grid.size() == 0 {
        bail!("grid has no valid (fast, slow) pairs with fast < slow");
    }

    tracing::info!(points = grid.size(), bars = data.bars.len(), "starting sweep");
    let mut sweep = ParamSweep::new();
    if let Some(n) = threads {
        sweep = sweep.with_threads(n);
    }
    let results = sweep.run(&data.bars, &grid, &config, None)?;

    println!();
    println!("=== Sweep: {} of {} points ===", results.len(), grid.size());
    println!(
        "{:>5} {:>5} {:>10} {:>10} {:>10} {:>7}",
        "fast", "slow", "return", "sharpe", "max_dd", "trades"
    );
    for entry in results.top_n(top) {
        let m = &entry.result.metrics;
        println!(
            "{:>5} {:>5} {:>10} {:>10} {:>10} {:>7}",
            entry.fast,
            entry.slow,
            m.total_return.to_string(),
            m.sharpe.to_string(),
            m.max_drawdown.to_string(),
            m.trade_count
        );
    }
    for failure in &results.failures {
        println!("FAILED ({}, {}): {}", failure.fast, failure.slow, failure.error);
    }
    Ok(())
}

fn synth_cmd(out: PathBuf, days: usize, seed: u64, start: &str, start_price: f64) -> Result<()> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d")
        .with_context(|| format!("invalid --start '{start}'"))?;
    let bars = generate_bars(&SyntheticParams {
        start,
        bars: days,
        start_price,
        seed,
        ..SyntheticParams::default()
    });
    let file = std::fs::File::create(&out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_bars(&bars, file)?;
    println!("Wrote {} bars to {}", bars.len(), out.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Strategy:       {}", result.strategy);
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    println!("Bars:           {}", result.bar_count);
    println!("Run ID:         {}", result.run_id);
    println!();
    println!("--- Performance ---");
    println!("Final Equity:   {:.2}", m.final_equity);
    println!("Total Return:   {}", m.total_return);
    println!("Annualized:     {}", m.annualized_return);
    println!("Volatility:     {}", m.volatility);
    println!("Sharpe:         {}", m.sharpe);
    println!("Sortino:        {}", m.sortino);
    println!("Calmar:         {}", m.calmar);
    println!("Max Drawdown:   {}", m.max_drawdown);
    println!();
    println!("--- Trades ---");
    println!("Trades:         {}", m.trade_count);
    println!("Win Rate:       {}", m.win_rate);
    println!("Profit Factor:  {}", m.profit_factor);
    println!("Total Fees:     {:.2}", m.total_fees);
    if let Some(pos) = &result.open_position {
        println!("Open Position:  {} shares since {}", pos.shares, pos.entry_date);
    }
    let d = &result.diagnostics;
    println!();
    println!("--- Diagnostics ---");
    println!(
        "Signals:        {} buy / {} sell / {} hold",
        d.signals.buy, d.signals.sell, d.signals.hold
    );
    println!("Rejections:     {}", d.rejections().count());
    println!("Other events:   {}", d.events.len() - d.rejections().count());
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    for warn in &d.data_quality_warnings {
        println!("WARNING: {warn}");
    }
}
