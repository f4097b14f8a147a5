//! Orders submitted by the simulator to the broker.
//!
//! Orders are ephemeral: built for one bar, validated, then either become a
//! `Fill` or a `Rejection`. They are never stored.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => f.write_str("BUY"),
            OrderSide::Sell => f.write_str("SELL"),
        }
    }
}

/// Requested size: an explicit share count, or everything currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderQuantity {
    Shares { shares: u64 },
    AllHeld { held: u64 },
}

impl OrderQuantity {
    pub fn requested(&self) -> u64 {
        match *self {
            OrderQuantity::Shares { shares } => shares,
            OrderQuantity::AllHeld { held } => held,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub side: OrderSide,
    /// Date of the bar the order executes on.
    pub date: NaiveDate,
    pub quantity: OrderQuantity,
    /// Price the order would execute at (signal close or next open).
    pub reference_price: f64,
    /// Close of the bar before the execution bar. `None` on the first bar,
    /// in which case no price-limit band applies.
    pub prior_close: Option<f64>,
}

impl Order {
    pub fn buy(date: NaiveDate, shares: u64, reference_price: f64, prior_close: Option<f64>) -> Self {
        Self {
            side: OrderSide::Buy,
            date,
            quantity: OrderQuantity::Shares { shares },
            reference_price,
            prior_close,
        }
    }

    pub fn sell_all(date: NaiveDate, held: u64, reference_price: f64, prior_close: Option<f64>) -> Self {
        Self {
            side: OrderSide::Sell,
            date,
            quantity: OrderQuantity::AllHeld { held },
            reference_price,
            prior_close,
        }
    }
}
