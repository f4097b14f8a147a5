use super::Strategy;
use crate::domain::{Action, Bar};

/// BUY on every bar. The simulator ignores BUY while a position is open,
/// so this enters on the first fillable bar and never exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuyAndHold;

impl Strategy for BuyAndHold {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn lookback(&self) -> usize {
        0
    }

    fn decide(&self, _history: &[Bar]) -> Action {
        Action::Buy
    }
}
