//! Run diagnostics: the structured record of every recoverable event.
//!
//! Nothing here stops a run. Each event is also emitted through `tracing`
//! when it is recorded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::broker::Rejection;
use crate::domain::{Action, OrderSide};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    /// The broker refused the order; the bar became a no-op.
    Rejected(Rejection),
    /// SELL arrived before settlement; it will be retried while the decision stays SELL.
    SettlementDeferred {
        entry_date: NaiveDate,
        bars_elapsed: usize,
        required: usize,
    },
    /// A deferred SELL was abandoned because the decision moved away from SELL.
    DeferredSellDropped { action: Action },
    /// With next-open execution the final decision has no bar to execute on.
    UnexecutedFinalDecision { action: Action },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEvent {
    pub date: NaiveDate,
    pub bar_index: usize,
    pub side: Option<OrderSide>,
    pub requested_shares: u64,
    pub reference_price: f64,
    #[serde(flatten)]
    pub kind: DiagnosticKind,
}

impl DiagnosticEvent {
    pub fn reason(&self) -> &'static str {
        match &self.kind {
            DiagnosticKind::Rejected(r) => r.reason(),
            DiagnosticKind::SettlementDeferred { .. } => "settlement_deferred",
            DiagnosticKind::DeferredSellDropped { .. } => "deferred_sell_dropped",
            DiagnosticKind::UnexecutedFinalDecision { .. } => "unexecuted_final_decision",
        }
    }
}

/// Counts of the decision labels the simulator acted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalCounts {
    pub buy: usize,
    pub sell: usize,
    pub hold: usize,
}

impl SignalCounts {
    pub fn record(&mut self, action: Action) {
        match action {
            Action::Buy => self.buy += 1,
            Action::Sell => self.sell += 1,
            Action::Hold => self.hold += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub events: Vec<DiagnosticEvent>,
    pub signals: SignalCounts,
    /// Non-fatal input problems found before the loop.
    pub data_quality_warnings: Vec<String>,
}

impl RunDiagnostics {
    pub fn record(&mut self, event: DiagnosticEvent) {
        match &event.kind {
            DiagnosticKind::Rejected(rejection) => tracing::warn!(
                date = %event.date,
                bar = event.bar_index,
                side = ?event.side,
                shares = event.requested_shares,
                price = event.reference_price,
                reason = rejection.reason(),
                "order rejected: {rejection}"
            ),
            DiagnosticKind::SettlementDeferred {
                bars_elapsed,
                required,
                ..
            } => tracing::debug!(
                date = %event.date,
                bar = event.bar_index,
                bars_elapsed,
                required,
                "sell deferred until settlement"
            ),
            DiagnosticKind::DeferredSellDropped { action } => tracing::warn!(
                date = %event.date,
                bar = event.bar_index,
                action = %action,
                "deferred sell dropped"
            ),
            DiagnosticKind::UnexecutedFinalDecision { action } => tracing::info!(
                date = %event.date,
                action = %action,
                "final decision has no next bar to execute on"
            ),
        }
        self.events.push(event);
    }

    pub fn rejections(&self) -> impl Iterator<Item = &Rejection> {
        self.events.iter().filter_map(|e| match &e.kind {
            DiagnosticKind::Rejected(r) => Some(r),
            _ => None,
        })
    }

    pub fn count(&self, reason: &str) -> usize {
        self.events.iter().filter(|e| e.reason() == reason).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: DiagnosticKind) -> DiagnosticEvent {
        DiagnosticEvent {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            bar_index: 7,
            side: Some(OrderSide::Buy),
            requested_shares: 1_000,
            reference_price: 11.0,
            kind,
        }
    }

    #[test]
    fn record_and_count_by_reason() {
        let mut diag = RunDiagnostics::default();
        diag.record(event(DiagnosticKind::Rejected(Rejection::BelowMinimumLot {
            requested: 50,
            lot_size: 100,
        })));
        diag.record(event(DiagnosticKind::DeferredSellDropped {
            action: Action::Hold,
        }));
        assert_eq!(diag.count("below_minimum_lot"), 1);
        assert_eq!(diag.count("deferred_sell_dropped"), 1);
        assert_eq!(diag.rejections().count(), 1);
    }

    #[test]
    fn signal_counts() {
        let mut counts = SignalCounts::default();
        for a in [Action::Buy, Action::Hold, Action::Hold, Action::Sell] {
            counts.record(a);
        }
        assert_eq!(
            counts,
            SignalCounts {
                buy: 1,
                sell: 1,
                hold: 2
            }
        );
    }

    #[test]
    fn event_serializes_flat_with_kind_tag() {
        let e = event(DiagnosticKind::UnexecutedFinalDecision {
            action: Action::Buy,
        });
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "UNEXECUTED_FINAL_DECISION");
        assert_eq!(json["action"], "BUY");
        assert_eq!(json["bar_index"], 7);
    }
}
