//! Board table and price-limit bands.
//!
//! Each board maps a set of instrument-code prefixes to a daily limit ratio.
//! The table is supplied by the caller; `BoardTable::a_share()` is the
//! reference market layout.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A BUY at or above `upper * LIMIT_UP_TOLERANCE` is treated as limit-locked.
pub const LIMIT_UP_TOLERANCE: f64 = 0.99;
/// A SELL at or below `lower * LIMIT_DOWN_TOLERANCE` is treated as limit-locked.
pub const LIMIT_DOWN_TOLERANCE: f64 = 1.01;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoardError {
    #[error("no board matches symbol '{symbol}' and no fallback ratio is configured")]
    UnknownBoard { symbol: String },
    #[error("board '{board}' has invalid limit ratio {ratio} (must be in (0, 1))")]
    InvalidRatio { board: String, ratio: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRule {
    pub name: String,
    pub prefixes: Vec<String>,
    /// Maximum daily move as a fraction of the prior close (0.10 = 10%).
    pub limit_ratio: f64,
}

impl BoardRule {
    pub fn new(name: &str, prefixes: &[&str], limit_ratio: f64) -> Self {
        Self {
            name: name.to_string(),
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            limit_ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardTable {
    pub boards: Vec<BoardRule>,
    /// Ratio for symbols no board claims. `None` makes them a fatal error.
    #[serde(default)]
    pub fallback_ratio: Option<f64>,
}

/// Limit band around a prior close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub upper: f64,
    pub lower: f64,
}

impl PriceBand {
    pub fn around(prior_close: f64, ratio: f64) -> Self {
        Self {
            upper: prior_close * (1.0 + ratio),
            lower: prior_close * (1.0 - ratio),
        }
    }

    /// Price at or above which a BUY is locked.
    pub fn buy_lock_price(&self) -> f64 {
        self.upper * LIMIT_UP_TOLERANCE
    }

    /// Price at or below which a SELL is locked.
    pub fn sell_lock_price(&self) -> f64 {
        self.lower * LIMIT_DOWN_TOLERANCE
    }
}

impl BoardTable {
    /// Shanghai/Shenzhen main boards at 10%, ChiNext and STAR at 20%.
    pub fn a_share() -> Self {
        Self {
            boards: vec![
                BoardRule::new(
                    "main",
                    &["600", "601", "603", "605", "000", "001", "002", "003"],
                    0.10,
                ),
                BoardRule::new("chinext", &["300", "301"], 0.20),
                BoardRule::new("star", &["688", "689"], 0.20),
            ],
            fallback_ratio: None,
        }
    }

    pub fn with_fallback(mut self, ratio: f64) -> Self {
        self.fallback_ratio = Some(ratio);
        self
    }

    /// Every ratio must lie strictly between 0 and 1.
    pub fn validate(&self) -> Result<(), BoardError> {
        for board in &self.boards {
            if !valid_ratio(board.limit_ratio) {
                return Err(BoardError::InvalidRatio {
                    board: board.name.clone(),
                    ratio: board.limit_ratio,
                });
            }
        }
        if let Some(ratio) = self.fallback_ratio {
            if !valid_ratio(ratio) {
                return Err(BoardError::InvalidRatio {
                    board: "fallback".into(),
                    ratio,
                });
            }
        }
        Ok(())
    }

    /// Resolve the limit ratio for a symbol by longest matching prefix.
    ///
    /// Exchange decorations are ignored: `sh600519`, `600519.SH` and
    /// `600519` all resolve against the digits `600519`.
    pub fn resolve(&self, symbol: &str) -> Result<f64, BoardError> {
        let code = instrument_code(symbol);
        let best = self
            .boards
            .iter()
            .flat_map(|b| b.prefixes.iter().map(move |p| (p, b)))
            .filter(|(prefix, _)| !prefix.is_empty() && code.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len());

        match (best, self.fallback_ratio) {
            (Some((_, board)), _) => Ok(board.limit_ratio),
            (None, Some(ratio)) => Ok(ratio),
            (None, None) => Err(BoardError::UnknownBoard {
                symbol: symbol.to_string(),
            }),
        }
    }
}

impl Default for BoardTable {
    fn default() -> Self {
        Self::a_share()
    }
}

fn valid_ratio(ratio: f64) -> bool {
    ratio.is_finite() && ratio > 0.0 && ratio < 1.0
}

fn instrument_code(symbol: &str) -> String {
    symbol.chars().filter(|c| c.is_ascii_digit()).collect()
}
