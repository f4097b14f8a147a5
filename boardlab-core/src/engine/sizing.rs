//! Entry sizing: the largest lot-aligned quantity the budget can pay for,
//! commission included.

use crate::broker::{round_down_to_lot, FeeSchedule};

/// Shares to request for a BUY at `price` with `budget` available.
///
/// Starts from `floor(budget / price)` rounded down to lots, then steps down
/// one lot at a time while `gross + commission` exceeds the budget. Returns 0
/// when not even one lot is affordable; the broker rejects that as below the
/// minimum lot.
pub fn affordable_shares(budget: f64, price: f64, lot_size: u64, fees: &FeeSchedule) -> u64 {
    if !(budget > 0.0 && price > 0.0) || lot_size == 0 {
        return 0;
    }

    let mut shares = round_down_to_lot((budget / price).floor() as u64, lot_size);
    while shares > 0 && fees.buy_cost(shares as f64 * price) > budget {
        shares -= lot_size;
    }
    shares
}
