//! Per-bar strategy decisions.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the strategy wants to do on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown action '{0}' (expected BUY, SELL or HOLD)")]
pub struct ParseActionError(pub String);

impl FromStr for Action {
    type Err = ParseActionError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            "HOLD" => Ok(Action::Hold),
            _ => Err(ParseActionError(s.to_string())),
        }
    }
}

/// One decision per bar. Decision `t` may only depend on bars `0..=t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub date: NaiveDate,
    pub action: Action,
}

impl Decision {
    pub fn new(date: NaiveDate, action: Action) -> Self {
        Self { date, action }
    }

    pub fn hold(date: NaiveDate) -> Self {
        Self::new(date, Action::Hold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_actions_case_insensitive() {
        assert_eq!("buy".parse::<Action>().unwrap(), Action::Buy);
        assert_eq!(" SELL ".parse::<Action>().unwrap(), Action::Sell);
        assert_eq!("Hold".parse::<Action>().unwrap(), Action::Hold);
    }

    #[test]
    fn parse_unknown_action_fails() {
        let err = "short".parse::<Action>().unwrap_err();
        assert!(err.to_string().contains("short"));
    }

    #[test]
    fn action_serializes_as_label() {
        assert_eq!(serde_json::to_string(&Action::Buy).unwrap(), "\"BUY\"");
        let back: Action = serde_json::from_str("\"HOLD\"").unwrap();
        assert_eq!(back, Action::Hold);
    }
}
