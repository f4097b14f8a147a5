//! Engine configuration, built once per run and passed by reference.

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use super::exits::ExitRules;
use crate::broker::{BoardTable, BrokerRules, FeeSchedule, DEFAULT_LOT_SIZE};

pub const DEFAULT_TRADING_DAYS_PER_YEAR: usize = 252;
/// Sell no earlier than one trading day after the buy (T+1).
pub const DEFAULT_SETTLEMENT_DAYS: usize = 1;

/// Which price an order executes at. Fixed for the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPrice {
    /// Decision `t` executes at bar `t`'s close.
    #[default]
    SignalClose,
    /// Decision `t` executes at bar `t + 1`'s open. The last decision never executes.
    NextOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Instrument code, used to pick the board's price-limit ratio.
    pub symbol: String,
    pub starting_cash: f64,
    pub fees: FeeSchedule,
    pub lot_size: u64,
    pub boards: BoardTable,
    pub execution_price: ExecutionPrice,
    /// Trading days that must elapse after a buy before the position can be sold.
    pub settlement_days: usize,
    /// Fraction of cash committed to each entry (1.0 = all of it).
    pub position_size_pct: f64,
    pub exit_rules: ExitRules,
    pub trading_days_per_year: usize,
    pub risk_free_rate: f64,
}

impl EngineConfig {
    /// Reference A-share defaults for `symbol`.
    pub fn new(symbol: impl Into<String>, starting_cash: f64) -> Self {
        Self {
            symbol: symbol.into(),
            starting_cash,
            fees: FeeSchedule::default(),
            lot_size: DEFAULT_LOT_SIZE,
            boards: BoardTable::a_share(),
            execution_price: ExecutionPrice::SignalClose,
            settlement_days: DEFAULT_SETTLEMENT_DAYS,
            position_size_pct: 1.0,
            exit_rules: ExitRules::none(),
            trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
            risk_free_rate: 0.0,
        }
    }

    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_execution_price(mut self, execution_price: ExecutionPrice) -> Self {
        self.execution_price = execution_price;
        self
    }

    pub fn with_exit_rules(mut self, exit_rules: ExitRules) -> Self {
        self.exit_rules = exit_rules;
        self
    }

    /// Check every plain value. Board resolution happens in `broker_rules`.
    pub fn validate(&self) -> Result<(), EngineError> {
        let invalid = |msg: String| Err(EngineError::InvalidConfig(msg));

        if !(self.starting_cash.is_finite() && self.starting_cash > 0.0) {
            return invalid(format!(
                "starting_cash must be positive, got {}",
                self.starting_cash
            ));
        }
        if !self.fees.is_valid() {
            return invalid(format!("fee rates must be non-negative: {:?}", self.fees));
        }
        if self.lot_size == 0 {
            return invalid("lot_size must be >= 1".into());
        }
        if self.settlement_days == 0 {
            return invalid("settlement_days must be >= 1".into());
        }
        if !(self.position_size_pct > 0.0 && self.position_size_pct <= 1.0) {
            return invalid(format!(
                "position_size_pct must be in (0, 1], got {}",
                self.position_size_pct
            ));
        }
        if self.trading_days_per_year == 0 {
            return invalid("trading_days_per_year must be >= 1".into());
        }
        if !self.risk_free_rate.is_finite() {
            return invalid("risk_free_rate must be finite".into());
        }
        self.exit_rules.validate().map_err(EngineError::InvalidConfig)?;
        self.boards.validate()?;
        Ok(())
    }

    /// Resolve the instrument's board and freeze the broker parameters.
    pub fn broker_rules(&self) -> Result<BrokerRules, EngineError> {
        let limit_ratio = self.boards.resolve(&self.symbol)?;
        Ok(BrokerRules {
            limit_ratio,
            lot_size: self.lot_size,
            fees: self.fees,
        })
    }
}
