//! TOML run configuration.
//!
//! ```toml
//! [backtest]
//! symbol = "600519"
//! starting_cash = 1000000.0
//! execution_price = "signal_close"   # or "next_open"
//!
//! [fees]
//! commission_rate = 0.0003
//! min_commission = 5.0
//! stamp_tax_rate = 0.001
//!
//! [market]
//! lot_size = 100
//! [[market.boards]]
//! name = "main"
//! prefixes = ["600", "000"]
//! limit_ratio = 0.10
//!
//! [strategy]
//! type = "ma_crossover"
//! fast = 5
//! slow = 20
//!
//! [exits]
//! stop_loss = 0.08
//! ```
//!
//! Every section except `[backtest]` is optional and falls back to the
//! reference-market defaults.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use boardlab_core::broker::{BoardRule, BoardTable, FeeSchedule, DEFAULT_LOT_SIZE};
use boardlab_core::engine::{
    EngineConfig, EngineError, ExecutionPrice, ExitRules, DEFAULT_SETTLEMENT_DAYS,
    DEFAULT_TRADING_DAYS_PER_YEAR,
};
use boardlab_core::signals::{BuyAndHold, MaCrossover, Momentum, MomentumParams, Strategy};

/// Content hash of a configuration.
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid strategy: {0}")]
    Strategy(String),
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub symbol: String,
    pub starting_cash: f64,
    #[serde(default)]
    pub execution_price: ExecutionPrice,
    #[serde(default = "default_settlement_days")]
    pub settlement_days: usize,
    #[serde(default = "default_position_size_pct")]
    pub position_size_pct: f64,
    #[serde(default = "default_trading_days_per_year")]
    pub trading_days_per_year: usize,
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Inclusive date window applied to loaded bars.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn default_settlement_days() -> usize {
    DEFAULT_SETTLEMENT_DAYS
}

fn default_position_size_pct() -> f64 {
    1.0
}

fn default_trading_days_per_year() -> usize {
    DEFAULT_TRADING_DAYS_PER_YEAR
}

fn default_lot_size() -> u64 {
    DEFAULT_LOT_SIZE
}

/// Lot size and the board table. An empty `boards` list means the built-in table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSection {
    #[serde(default = "default_lot_size")]
    pub lot_size: u64,
    #[serde(default)]
    pub boards: Vec<BoardRule>,
    #[serde(default)]
    pub fallback_ratio: Option<f64>,
}

impl Default for MarketSection {
    fn default() -> Self {
        Self {
            lot_size: DEFAULT_LOT_SIZE,
            boards: Vec::new(),
            fallback_ratio: None,
        }
    }
}

impl MarketSection {
    pub fn board_table(&self) -> BoardTable {
        let table = if self.boards.is_empty() {
            BoardTable::a_share()
        } else {
            BoardTable {
                boards: self.boards.clone(),
                fallback_ratio: None,
            }
        };
        match self.fallback_ratio {
            Some(ratio) => table.with_fallback(ratio),
            None => table,
        }
    }
}

/// Which bundled strategy produces the decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StrategyConfig {
    BuyAndHold,
    MaCrossover { fast: usize, slow: usize },
    Momentum(MomentumParams),
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig::MaCrossover { fast: 5, slow: 20 }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            StrategyConfig::BuyAndHold => Ok(()),
            StrategyConfig::MaCrossover { fast, slow } => {
                if *fast == 0 || slow <= fast {
                    return Err(ConfigError::Strategy(format!(
                        "ma_crossover needs 0 < fast < slow, got fast={fast} slow={slow}"
                    )));
                }
                Ok(())
            }
            StrategyConfig::Momentum(params) => params.validate().map_err(ConfigError::Strategy),
        }
    }

    /// Validate, then construct the strategy.
    pub fn build(&self) -> Result<Box<dyn Strategy>, ConfigError> {
        self.validate()?;
        Ok(match self {
            StrategyConfig::BuyAndHold => Box::new(BuyAndHold),
            StrategyConfig::MaCrossover { fast, slow } => Box::new(MaCrossover::new(*fast, *slow)),
            StrategyConfig::Momentum(params) => Box::new(Momentum::new(params.clone())),
        })
    }

    /// Short label for reports, e.g. `ma_crossover(5, 20)`.
    pub fn label(&self) -> String {
        match self {
            StrategyConfig::BuyAndHold => "buy_and_hold".into(),
            StrategyConfig::MaCrossover { fast, slow } => format!("ma_crossover({fast}, {slow})"),
            StrategyConfig::Momentum(_) => "momentum".into(),
        }
    }
}

/// Full configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub market: MarketSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub exits: ExitRules,
}

impl BacktestConfig {
    /// Reference-market defaults for `symbol` with the default strategy.
    pub fn new(symbol: impl Into<String>, starting_cash: f64) -> Self {
        Self {
            backtest: BacktestSection {
                symbol: symbol.into(),
                starting_cash,
                execution_price: ExecutionPrice::default(),
                settlement_days: DEFAULT_SETTLEMENT_DAYS,
                position_size_pct: 1.0,
                trading_days_per_year: DEFAULT_TRADING_DAYS_PER_YEAR,
                risk_free_rate: 0.0,
                start_date: None,
                end_date: None,
            },
            fees: FeeSchedule::default(),
            market: MarketSection::default(),
            strategy: StrategyConfig::default(),
            exits: ExitRules::none(),
        }
    }

    pub fn with_strategy(mut self, strategy: StrategyConfig) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Check the strategy, the date window and every engine parameter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        if let (Some(start), Some(end)) = (self.backtest.start_date, self.backtest.end_date) {
            if start > end {
                return Err(ConfigError::Invalid(format!(
                    "start_date {start} is after end_date {end}"
                )));
            }
        }
        self.engine_config().validate()?;
        Ok(())
    }

    /// The plain-value engine configuration this file describes.
    pub fn engine_config(&self) -> EngineConfig {
        let b = &self.backtest;
        EngineConfig {
            symbol: b.symbol.clone(),
            starting_cash: b.starting_cash,
            fees: self.fees,
            lot_size: self.market.lot_size,
            boards: self.market.board_table(),
            execution_price: b.execution_price,
            settlement_days: b.settlement_days,
            position_size_pct: b.position_size_pct,
            exit_rules: self.exits,
            trading_days_per_year: b.trading_days_per_year,
            risk_free_rate: b.risk_free_rate,
        }
    }

    /// Deterministic BLAKE3 hash of the canonical JSON form.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
