use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::order::OrderSide;

/// Executed order, lot-rounded and costed by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub date: NaiveDate,
    pub side: OrderSide,
    pub shares: u64,
    pub price: f64,
    pub gross_amount: f64,
    pub commission: f64,
    /// Zero on BUY fills.
    pub stamp_tax: f64,
}

impl Fill {
    pub fn total_fees(&self) -> f64 {
        self.commission + self.stamp_tax
    }

    /// Signed cash movement: negative for a BUY, positive for a SELL.
    pub fn cash_delta(&self) -> f64 {
        match self.side {
            OrderSide::Buy => -(self.gross_amount + self.commission),
            OrderSide::Sell => self.gross_amount - self.commission - self.stamp_tax,
        }
    }
}
