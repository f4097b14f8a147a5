//! Fee schedule: commission on both sides, stamp tax on sells.

use serde::{Deserialize, Serialize};

use crate::domain::OrderSide;

pub const DEFAULT_COMMISSION_RATE: f64 = 0.0003;
pub const DEFAULT_MIN_COMMISSION: f64 = 5.0;
pub const DEFAULT_STAMP_TAX_RATE: f64 = 0.001;

/// Transaction cost parameters for a run.
///
/// `commission = max(gross * commission_rate, min_commission)` on every fill;
/// `stamp_tax = gross * stamp_tax_rate` on SELL fills only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub commission_rate: f64,
    pub min_commission: f64,
    pub stamp_tax_rate: f64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            min_commission: DEFAULT_MIN_COMMISSION,
            stamp_tax_rate: DEFAULT_STAMP_TAX_RATE,
        }
    }
}

impl FeeSchedule {
    pub fn new(commission_rate: f64, min_commission: f64, stamp_tax_rate: f64) -> Self {
        Self {
            commission_rate,
            min_commission,
            stamp_tax_rate,
        }
    }

    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn commission(&self, gross_amount: f64) -> f64 {
        (gross_amount * self.commission_rate).max(self.min_commission)
    }

    pub fn stamp_tax(&self, side: OrderSide, gross_amount: f64) -> f64 {
        match side {
            OrderSide::Buy => 0.0,
            OrderSide::Sell => gross_amount * self.stamp_tax_rate,
        }
    }

    /// Cash needed to buy `gross_amount` worth of shares.
    pub fn buy_cost(&self, gross_amount: f64) -> f64 {
        gross_amount + self.commission(gross_amount)
    }

    pub fn is_valid(&self) -> bool {
        [self.commission_rate, self.min_commission, self.stamp_tax_rate]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimum_commission_applies_to_small_fills() {
        let fees = FeeSchedule::default();
        // 1,000 * 0.0003 = 0.30 → floored up to 5.00
        assert_eq!(fees.commission(1_000.0), 5.0);
    }

    #[test]
    fn proportional_commission_on_large_fills() {
        let fees = FeeSchedule::default();
        assert!((fees.commission(100_000.0) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn stamp_tax_sell_only() {
        let fees = FeeSchedule::default();
        assert_eq!(fees.stamp_tax(OrderSide::Buy, 50_000.0), 0.0);
        assert!((fees.stamp_tax(OrderSide::Sell, 50_000.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn frictionless_costs_nothing() {
        let fees = FeeSchedule::frictionless();
        assert_eq!(fees.buy_cost(12_345.0), 12_345.0);
        assert_eq!(fees.stamp_tax(OrderSide::Sell, 12_345.0), 0.0);
    }

    #[test]
    fn negative_rate_is_invalid() {
        assert!(!FeeSchedule::new(-0.001, 5.0, 0.001).is_valid());
        assert!(FeeSchedule::default().is_valid());
    }
}
