//! Optional protective exits evaluated by the simulator for a settled position.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, Position};

/// All rules are disabled by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitRules {
    /// Exit when the loss from entry reaches this fraction (0.08 = 8%).
    #[serde(default)]
    pub stop_loss: Option<f64>,
    /// Exit when the gain from entry reaches this fraction.
    #[serde(default)]
    pub take_profit: Option<f64>,
    /// Exit once the position has been held more than this many calendar days.
    #[serde(default)]
    pub max_holding_days: Option<i64>,
}

impl ExitRules {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.stop_loss.is_none() && self.take_profit.is_none() && self.max_holding_days.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(sl) = self.stop_loss {
            if !(sl.is_finite() && sl > 0.0 && sl < 1.0) {
                return Err(format!("stop_loss must be in (0, 1), got {sl}"));
            }
        }
        if let Some(tp) = self.take_profit {
            if !(tp.is_finite() && tp > 0.0) {
                return Err(format!("take_profit must be positive, got {tp}"));
            }
        }
        if let Some(days) = self.max_holding_days {
            if days < 1 {
                return Err(format!("max_holding_days must be >= 1, got {days}"));
            }
        }
        Ok(())
    }

    /// First rule that fires for `position` observed at `price` on `date`.
    ///
    /// Checked in priority order: stop-loss, take-profit, max holding days.
    pub fn check(&self, position: &Position, price: f64, date: NaiveDate) -> Option<ExitReason> {
        let change = position.price_change_pct(price);
        if self.stop_loss.is_some_and(|sl| change <= -sl) {
            return Some(ExitReason::StopLoss);
        }
        if self.take_profit.is_some_and(|tp| change >= tp) {
            return Some(ExitReason::TakeProfit);
        }
        if self
            .max_holding_days
            .is_some_and(|max| position.calendar_days_held(date) > max)
        {
            return Some(ExitReason::MaxHoldingDays);
        }
        None
    }
}
