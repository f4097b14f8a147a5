//! Exchange rule broker: validates an order against price-limit and lot
//! rules and costs the resulting fill.
//!
//! The broker is a pure function of `(Order, BrokerRules)`. It holds no state,
//! so one `BrokerRules` can be shared read-only across concurrent runs.
//! Expected rejections come back as `BrokerOutcome::Rejected`, never as errors.

pub mod board;
pub mod fees;
pub mod lot;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::{Fill, Order, OrderSide};

pub use board::{
    BoardError, BoardRule, BoardTable, PriceBand, LIMIT_DOWN_TOLERANCE, LIMIT_UP_TOLERANCE,
};
pub use fees::FeeSchedule;
pub use lot::{round_down_to_lot, DEFAULT_LOT_SIZE};

/// Resolved, per-run broker parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerRules {
    /// Daily limit ratio for the run's instrument.
    pub limit_ratio: f64,
    pub lot_size: u64,
    pub fees: FeeSchedule,
}

/// Why the broker refused an order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rejection {
    /// Reference price is pinned at (or within tolerance of) the daily limit.
    LimitLocked {
        side: OrderSide,
        reference_price: f64,
        limit_price: f64,
    },
    /// Requested shares floor to zero lots.
    BelowMinimumLot { requested: u64, lot_size: u64 },
}

impl Rejection {
    /// Short machine-readable reason, used as a log field.
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::LimitLocked { .. } => "limit_locked",
            Rejection::BelowMinimumLot { .. } => "below_minimum_lot",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::LimitLocked {
                side: OrderSide::Buy,
                reference_price,
                limit_price,
            } => write!(
                f,
                "limit-up locked: BUY at {reference_price:.2} with limit-up {limit_price:.2}"
            ),
            Rejection::LimitLocked {
                side: OrderSide::Sell,
                reference_price,
                limit_price,
            } => write!(
                f,
                "limit-down locked: SELL at {reference_price:.2} with limit-down {limit_price:.2}"
            ),
            Rejection::BelowMinimumLot {
                requested,
                lot_size,
            } => write!(f, "{requested} shares is below one lot of {lot_size}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BrokerOutcome {
    Filled(Fill),
    Rejected(Rejection),
}

impl BrokerOutcome {
    pub fn fill(&self) -> Option<&Fill> {
        match self {
            BrokerOutcome::Filled(fill) => Some(fill),
            BrokerOutcome::Rejected(_) => None,
        }
    }
}

/// Validate an order and produce either a fill or a rejection.
///
/// Checks, in order:
/// 1. Price-limit band around `prior_close` (skipped when there is none)
/// 2. Lot rounding: requested shares floored to whole lots, zero lots rejected
/// 3. Fees: commission both sides, stamp tax on SELL
pub fn validate_and_fill(order: &Order, rules: &BrokerRules) -> BrokerOutcome {
    if let Some(prior_close) = order.prior_close {
        let band = PriceBand::around(prior_close, rules.limit_ratio);
        let locked = match order.side {
            OrderSide::Buy => order.reference_price >= band.buy_lock_price(),
            OrderSide::Sell => order.reference_price <= band.sell_lock_price(),
        };
        if locked {
            let limit_price = match order.side {
                OrderSide::Buy => band.upper,
                OrderSide::Sell => band.lower,
            };
            return BrokerOutcome::Rejected(Rejection::LimitLocked {
                side: order.side,
                reference_price: order.reference_price,
                limit_price,
            });
        }
    }

    let requested = order.quantity.requested();
    let shares = round_down_to_lot(requested, rules.lot_size);
    if shares == 0 {
        return BrokerOutcome::Rejected(Rejection::BelowMinimumLot {
            requested,
            lot_size: rules.lot_size,
        });
    }

    let gross_amount = shares as f64 * order.reference_price;
    BrokerOutcome::Filled(Fill {
        date: order.date,
        side: order.side,
        shares,
        price: order.reference_price,
        gross_amount,
        commission: rules.fees.commission(gross_amount),
        stamp_tax: rules.fees.stamp_tax(order.side, gross_amount),
    })
}
