//! Property tests for simulator invariants.
//!
//! Uses proptest to verify, over random price paths and decision streams:
//! 1. Cash never goes negative
//! 2. Exactly one equity point per bar
//! 3. Every fill is a whole number of lots
//! 4. No position is sold before settlement has elapsed
//! 5. Equity identity: final equity is cash plus the marked position

use boardlab_core::broker::{round_down_to_lot, FeeSchedule};
use boardlab_core::domain::{Action, Bar, Decision};
use boardlab_core::engine::{affordable_shares, simulate, EngineConfig, ExecutionPrice};
use chrono::NaiveDate;
use proptest::prelude::*;

// ── Generators ───────────────────────────────────────────────────────

/// Daily moves stay inside +/-12% so both band outcomes occur.
fn arb_path() -> impl Strategy<Value = Vec<f64>> {
    (5.0..50.0_f64, prop::collection::vec(-0.12..0.12_f64, 2..80)).prop_map(|(start, moves)| {
        let mut price = start;
        let mut closes = vec![price];
        for m in moves {
            price = ((price * (1.0 + m)) * 100.0).round() / 100.0;
            price = price.max(0.5);
            closes.push(price);
        }
        closes
    })
}

fn arb_action() -> impl Strategy<Value = Action> {
    prop_oneof![Just(Action::Buy), Just(Action::Sell), Just(Action::Hold)]
}

fn to_bars(closes: &[f64]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 1_000,
            }
        })
        .collect()
}

fn to_decisions(bars: &[Bar], actions: &[Action]) -> Vec<Decision> {
    bars.iter()
        .zip(actions.iter().cycle())
        .map(|(b, a)| Decision::new(b.date, *a))
        .collect()
}

fn arb_run() -> impl Strategy<Value = (Vec<Bar>, Vec<Decision>, f64, usize, bool)> {
    (
        arb_path(),
        prop::collection::vec(arb_action(), 1..20),
        1_000.0..500_000.0_f64,
        1usize..4,
        any::<bool>(),
    )
        .prop_map(|(closes, actions, cash, settlement, next_open)| {
            let bars = to_bars(&closes);
            let decisions = to_decisions(&bars, &actions);
            (bars, decisions, cash, settlement, next_open)
        })
}

fn config_for(cash: f64, settlement_days: usize, next_open: bool) -> EngineConfig {
    let mut config = EngineConfig::new("600000", cash);
    config.settlement_days = settlement_days;
    if next_open {
        config = config.with_execution_price(ExecutionPrice::NextOpen);
    }
    config
}

// ── Simulator invariants ─────────────────────────────────────────────

proptest! {
    #[test]
    fn cash_never_negative((bars, decisions, cash, settlement, next_open) in arb_run()) {
        let result = simulate(&bars, &decisions, &config_for(cash, settlement, next_open)).unwrap();
        prop_assert!(result.final_cash >= 0.0);
        for point in &result.equity_history {
            prop_assert!(point.total_value >= 0.0);
        }
    }

    #[test]
    fn one_equity_point_per_bar((bars, decisions, cash, settlement, next_open) in arb_run()) {
        let result = simulate(&bars, &decisions, &config_for(cash, settlement, next_open)).unwrap();
        prop_assert_eq!(result.equity_history.len(), bars.len());
        prop_assert_eq!(result.bar_count, bars.len());
    }

    #[test]
    fn fills_are_whole_lots((bars, decisions, cash, settlement, next_open) in arb_run()) {
        let result = simulate(&bars, &decisions, &config_for(cash, settlement, next_open)).unwrap();
        for fill in &result.fills {
            prop_assert!(fill.shares > 0);
            prop_assert_eq!(fill.shares % 100, 0);
        }
    }

    #[test]
    fn no_sale_before_settlement((bars, decisions, cash, settlement, next_open) in arb_run()) {
        let result = simulate(&bars, &decisions, &config_for(cash, settlement, next_open)).unwrap();
        for trade in &result.trades {
            prop_assert!(trade.bars_held >= settlement);
            prop_assert!(trade.exit_date > trade.entry_date);
        }
    }

    #[test]
    fn final_equity_is_cash_plus_position((bars, decisions, cash, settlement, next_open) in arb_run()) {
        let result = simulate(&bars, &decisions, &config_for(cash, settlement, next_open)).unwrap();
        let position_value = result
            .open_position
            .as_ref()
            .map_or(0.0, |p| p.shares as f64 * bars[bars.len() - 1].close);
        let expected = result.final_cash + position_value;
        prop_assert!((result.final_equity() - expected).abs() < 1e-6);
    }

    #[test]
    fn realized_pnl_reconciles_with_cash((bars, decisions, cash, settlement, next_open) in arb_run()) {
        let result = simulate(&bars, &decisions, &config_for(cash, settlement, next_open)).unwrap();
        if result.open_position.is_none() {
            let pnl: f64 = result.trades.iter().map(|t| t.realized_pnl).sum();
            prop_assert!((result.final_cash - cash - pnl).abs() < 1e-4);
        }
    }
}

// ── Sizing ───────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn affordable_shares_fit_budget(budget in 0.0..2_000_000.0_f64, price in 0.5..300.0_f64) {
        let fees = FeeSchedule::default();
        let shares = affordable_shares(budget, price, 100, &fees);
        prop_assert_eq!(shares % 100, 0);
        prop_assert!(shares == 0 || fees.buy_cost(shares as f64 * price) <= budget);
    }

    #[test]
    fn lot_rounding_never_rounds_up(shares in 0u64..1_000_000, lot in 1u64..1_000) {
        let rounded = round_down_to_lot(shares, lot);
        prop_assert!(rounded <= shares);
        prop_assert_eq!(rounded % lot, 0);
        prop_assert!(shares - rounded < lot);
    }
}
