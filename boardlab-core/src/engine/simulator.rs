//! Execution simulator: the sequential bar loop.
//!
//! Per bar, strictly in order:
//! 1. Resolve the decision that executes on this bar and its reference price
//! 2. Apply exit rules to a settled position
//! 3. Dispatch: no-op, BUY through the broker, or SELL through the
//!    settlement gate and then the broker
//! 4. Apply the fill to cash, position and trade log
//! 5. Mark to market at the bar's close

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::broker::{validate_and_fill, BrokerOutcome, BrokerRules};
use crate::domain::{
    AccountState, Action, Bar, Decision, EquityPoint, ExitReason, Fill, Order, OrderSide,
    Position, Trade,
};

use super::config::{EngineConfig, ExecutionPrice};
use super::diagnostics::{DiagnosticEvent, DiagnosticKind, RunDiagnostics};
use super::error::EngineError;
use super::sizing::affordable_shares;
use super::validate::{validate_bars, validate_decisions};

/// Everything the loop produced. Analytics read this; nothing writes it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub starting_cash: f64,
    /// One point per bar, same order as the input.
    pub equity_history: Vec<EquityPoint>,
    pub trades: Vec<Trade>,
    pub fills: Vec<Fill>,
    pub final_cash: f64,
    /// Still open at the end of the data. Valued in the last equity point.
    pub open_position: Option<Position>,
    pub diagnostics: RunDiagnostics,
    pub bar_count: usize,
}

impl SimulationResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_history
            .last()
            .map_or(self.starting_cash, |p| p.total_value)
    }
}

/// What bar `t` acts on after the execution-price mapping.
struct BarIntent {
    action: Action,
    /// Date the decision was made on. Exit rules are evaluated as of this date.
    decision_date: NaiveDate,
    /// Close known when the decision was made. Exit rules observe this price.
    observed_close: f64,
    reference_price: f64,
    prior_close: Option<f64>,
}

fn intent_for_bar(
    t: usize,
    bars: &[Bar],
    decisions: &[Decision],
    execution: ExecutionPrice,
) -> BarIntent {
    let bar = &bars[t];
    let prior_close = t.checked_sub(1).map(|p| bars[p].close);
    match execution {
        ExecutionPrice::SignalClose => BarIntent {
            action: decisions[t].action,
            decision_date: bar.date,
            observed_close: bar.close,
            reference_price: bar.close,
            prior_close,
        },
        ExecutionPrice::NextOpen => match t.checked_sub(1) {
            Some(p) => BarIntent {
                action: decisions[p].action,
                decision_date: bars[p].date,
                observed_close: bars[p].close,
                reference_price: bar.open,
                prior_close,
            },
            None => BarIntent {
                action: Action::Hold,
                decision_date: bar.date,
                observed_close: bar.close,
                reference_price: bar.open,
                prior_close,
            },
        },
    }
}

/// Per-run loop state. Owned by one `simulate` call and never shared.
struct Simulator<'a> {
    rules: BrokerRules,
    config: &'a EngineConfig,
    account: AccountState,
    trades: Vec<Trade>,
    fills: Vec<Fill>,
    diagnostics: RunDiagnostics,
    /// A SELL was deferred by settlement on the previous bar.
    pending_sell: bool,
}

impl<'a> Simulator<'a> {
    fn new(config: &'a EngineConfig, rules: BrokerRules, bar_count: usize) -> Self {
        Self {
            rules,
            config,
            account: AccountState::with_capacity(config.starting_cash, bar_count),
            trades: Vec::new(),
            fills: Vec::new(),
            diagnostics: RunDiagnostics::default(),
            pending_sell: false,
        }
    }

    fn is_settled(&self, position: &Position, t: usize) -> bool {
        position.bars_since_entry(t) >= self.config.settlement_days
    }

    fn step(&mut self, t: usize, bar: &Bar, intent: BarIntent) {
        let mut action = intent.action;
        let mut exit_reason = ExitReason::Signal;

        if action != Action::Sell {
            if self.pending_sell {
                self.pending_sell = false;
                self.record(
                    t,
                    bar,
                    None,
                    0,
                    intent.reference_price,
                    DiagnosticKind::DeferredSellDropped { action },
                );
            }
            if let Some(position) = self.account.position.as_ref() {
                if self.is_settled(position, t) {
                    if let Some(reason) = self.config.exit_rules.check(
                        position,
                        intent.observed_close,
                        intent.decision_date,
                    ) {
                        tracing::debug!(
                            date = %bar.date,
                            bar = t,
                            reason = %reason,
                            price = intent.observed_close,
                            "exit rule triggered"
                        );
                        action = Action::Sell;
                        exit_reason = reason;
                    }
                }
            }
        }

        match action {
            Action::Hold => {}
            Action::Buy => {
                if self.account.position.is_none() {
                    self.buy(t, bar, &intent);
                }
            }
            Action::Sell => {
                if self.account.position.is_some() {
                    self.sell(t, bar, &intent, exit_reason);
                } else {
                    self.pending_sell = false;
                }
            }
        }

        self.account.mark_to_market(bar.date, bar.close);
    }

    fn buy(&mut self, t: usize, bar: &Bar, intent: &BarIntent) {
        let budget = self.account.cash * self.config.position_size_pct;
        let shares = affordable_shares(
            budget,
            intent.reference_price,
            self.rules.lot_size,
            &self.rules.fees,
        );
        let order = Order::buy(bar.date, shares, intent.reference_price, intent.prior_close);

        match validate_and_fill(&order, &self.rules) {
            BrokerOutcome::Filled(fill) => {
                self.account.settle_cash(&fill);
                tracing::debug!(
                    date = %fill.date,
                    bar = t,
                    shares = fill.shares,
                    price = fill.price,
                    commission = fill.commission,
                    cash = self.account.cash,
                    "buy filled"
                );
                self.account.position = Some(Position {
                    entry_date: fill.date,
                    entry_bar: t,
                    entry_price: fill.price,
                    shares: fill.shares,
                    last_close: bar.close,
                    entry_fees: fill.total_fees(),
                });
                self.fills.push(fill);
            }
            BrokerOutcome::Rejected(rejection) => {
                self.record(
                    t,
                    bar,
                    Some(OrderSide::Buy),
                    shares,
                    intent.reference_price,
                    DiagnosticKind::Rejected(rejection),
                );
            }
        }
    }

    fn sell(&mut self, t: usize, bar: &Bar, intent: &BarIntent, exit_reason: ExitReason) {
        let Some(position) = self.account.position.clone() else {
            return;
        };

        if !self.is_settled(&position, t) {
            self.pending_sell = true;
            self.record(
                t,
                bar,
                Some(OrderSide::Sell),
                position.shares,
                intent.reference_price,
                DiagnosticKind::SettlementDeferred {
                    entry_date: position.entry_date,
                    bars_elapsed: position.bars_since_entry(t),
                    required: self.config.settlement_days,
                },
            );
            return;
        }
        self.pending_sell = false;

        let order = Order::sell_all(
            bar.date,
            position.shares,
            intent.reference_price,
            intent.prior_close,
        );
        match validate_and_fill(&order, &self.rules) {
            BrokerOutcome::Filled(fill) => {
                self.account.settle_cash(&fill);
                let trade = close_trade(&position, &fill, t, exit_reason);
                tracing::debug!(
                    date = %fill.date,
                    bar = t,
                    shares = fill.shares,
                    price = fill.price,
                    pnl = trade.realized_pnl,
                    exit_reason = %exit_reason,
                    "sell filled"
                );
                self.account.position = None;
                self.trades.push(trade);
                self.fills.push(fill);
            }
            BrokerOutcome::Rejected(rejection) => {
                self.record(
                    t,
                    bar,
                    Some(OrderSide::Sell),
                    position.shares,
                    intent.reference_price,
                    DiagnosticKind::Rejected(rejection),
                );
            }
        }
    }

    fn record(
        &mut self,
        t: usize,
        bar: &Bar,
        side: Option<OrderSide>,
        requested_shares: u64,
        reference_price: f64,
        kind: DiagnosticKind,
    ) {
        self.diagnostics.record(DiagnosticEvent {
            date: bar.date,
            bar_index: t,
            side,
            requested_shares,
            reference_price,
            kind,
        });
    }

    fn finish(self, bar_count: usize) -> SimulationResult {
        SimulationResult {
            starting_cash: self.config.starting_cash,
            final_cash: self.account.cash,
            open_position: self.account.position,
            equity_history: self.account.equity_history,
            trades: self.trades,
            fills: self.fills,
            diagnostics: self.diagnostics,
            bar_count,
        }
    }
}

fn close_trade(position: &Position, fill: &Fill, exit_bar: usize, exit_reason: ExitReason) -> Trade {
    let exit_fees = fill.total_fees();
    let total_fees = position.entry_fees + exit_fees;
    Trade {
        entry_bar: position.entry_bar,
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_bar,
        exit_date: fill.date,
        exit_price: fill.price,
        exit_reason,
        shares: fill.shares,
        realized_pnl: (fill.price - position.entry_price) * fill.shares as f64 - total_fees,
        entry_fees: position.entry_fees,
        exit_fees,
        total_fees,
        holding_days: position.calendar_days_held(fill.date),
        bars_held: position.bars_since_entry(exit_bar),
    }
}

/// Run the simulation over `bars` driven by the precomputed `decisions`.
///
/// All fatal checks happen before the first bar: config values, board
/// resolution for `config.symbol`, bar sanity and decision alignment.
/// Inside the loop nothing fails; rejections and settlement deferrals
/// become diagnostics and the bar is treated as a no-op.
///
/// Deterministic: the same inputs always produce an identical result.
pub fn simulate(
    bars: &[Bar],
    decisions: &[Decision],
    config: &EngineConfig,
) -> Result<SimulationResult, EngineError> {
    let _span = tracing::info_span!("simulate", symbol = %config.symbol, bars = bars.len()).entered();

    config.validate()?;
    let rules = config.broker_rules()?;
    let warnings = validate_bars(bars)?;
    validate_decisions(bars, decisions)?;

    for warning in &warnings {
        tracing::warn!(warning = %warning, "data quality");
    }

    let mut sim = Simulator::new(config, rules, bars.len());
    sim.diagnostics.data_quality_warnings = warnings;
    for decision in decisions {
        sim.diagnostics.signals.record(decision.action);
    }

    for (t, bar) in bars.iter().enumerate() {
        let intent = intent_for_bar(t, bars, decisions, config.execution_price);
        sim.step(t, bar, intent);
    }

    if config.execution_price == ExecutionPrice::NextOpen {
        if let (Some(last_bar), Some(last)) = (bars.last(), decisions.last()) {
            if last.action != Action::Hold {
                sim.record(
                    bars.len() - 1,
                    last_bar,
                    None,
                    0,
                    last_bar.close,
                    DiagnosticKind::UnexecutedFinalDecision {
                        action: last.action,
                    },
                );
            }
        }
    }

    let result = sim.finish(bars.len());
    tracing::info!(
        trades = result.trades.len(),
        fills = result.fills.len(),
        events = result.diagnostics.events.len(),
        final_equity = result.final_equity(),
        "simulation complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::FeeSchedule;
    use crate::indicators::make_bars;

    fn decisions(bars: &[Bar], actions: &[Action]) -> Vec<Decision> {
        bars.iter()
            .zip(actions)
            .map(|(b, a)| Decision::new(b.date, *a))
            .collect()
    }

    fn frictionless(cash: f64) -> EngineConfig {
        EngineConfig::new("600000", cash).with_fees(FeeSchedule::frictionless())
    }

    #[test]
    fn hold_only_keeps_cash_flat() {
        let bars = make_bars(&[10.0, 10.5, 10.2]);
        let d = decisions(&bars, &[Action::Hold; 3]);
        let result = simulate(&bars, &d, &frictionless(10_000.0)).unwrap();
        assert_eq!(result.equity_history.len(), 3);
        assert!(result.equity_history.iter().all(|p| p.total_value == 10_000.0));
        assert!(result.trades.is_empty());
    }

    #[test]
    fn buy_marks_position_at_close() {
        let bars = make_bars(&[10.0, 10.5]);
        let d = decisions(&bars, &[Action::Buy, Action::Hold]);
        let result = simulate(&bars, &d, &frictionless(10_000.0)).unwrap();
        let pos = result.open_position.as_ref().unwrap();
        assert_eq!(pos.shares, 1_000);
        assert!((result.equity_history[1].total_value - 10_500.0).abs() < 1e-9);
    }

    #[test]
    fn sell_while_flat_and_buy_while_holding_are_noops() {
        let bars = make_bars(&[10.0, 10.1, 10.2, 10.3]);
        let d = decisions(&bars, &[Action::Sell, Action::Buy, Action::Buy, Action::Hold]);
        let result = simulate(&bars, &d, &frictionless(10_000.0)).unwrap();
        assert_eq!(result.fills.len(), 1);
        assert!(result.diagnostics.events.is_empty());
    }

    #[test]
    fn next_open_uses_previous_decision() {
        let bars = make_bars(&[10.0, 10.4, 10.6]);
        let d = decisions(&bars, &[Action::Buy, Action::Hold, Action::Hold]);
        let config = frictionless(10_000.0).with_execution_price(ExecutionPrice::NextOpen);
        let result = simulate(&bars, &d, &config).unwrap();
        let fill = &result.fills[0];
        assert_eq!(fill.date, bars[1].date);
        assert_eq!(fill.price, bars[1].open);
    }

    #[test]
    fn mismatched_decisions_fail_before_loop() {
        let bars = make_bars(&[10.0, 10.4]);
        let d = decisions(&bars, &[Action::Buy]);
        assert!(matches!(
            simulate(&bars, &d, &frictionless(10_000.0)),
            Err(EngineError::MisalignedDecisions(_))
        ));
    }
}
