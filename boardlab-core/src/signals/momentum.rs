//! Short-term momentum strategy.
//!
//! BUY when at least `min_buy_conditions` of these hold on the bar:
//! 1. RSI recovers: previous RSI below `rsi_oversold`, current above `rsi_recovery`
//! 2. MACD golden cross: MACD crosses above its signal line
//! 3. Volume surge: volume above `volume_surge_ratio` times its moving average
//! 4. Trend: close above the `trend_ma` SMA
//!
//! SELL when RSI is above `rsi_overbought` or MACD crosses below its signal
//! line. SELL takes priority over BUY on the same bar.

use serde::{Deserialize, Serialize};

use super::Strategy;
use crate::domain::{Action, Bar};
use crate::indicators::{sma_of_series, value_at, Indicator, Macd, MacdLine, Rsi};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumParams {
    pub rsi_period: usize,
    pub rsi_oversold: f64,
    pub rsi_recovery: f64,
    pub rsi_overbought: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub volume_ma: usize,
    pub volume_surge_ratio: f64,
    pub trend_ma: usize,
    pub min_buy_conditions: usize,
}

impl Default for MomentumParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_oversold: 30.0,
            rsi_recovery: 40.0,
            rsi_overbought: 70.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            volume_ma: 5,
            volume_surge_ratio: 2.0,
            trend_ma: 20,
            min_buy_conditions: 3,
        }
    }
}

impl MomentumParams {
    /// Periods must be usable by the indicators; MACD needs `slow > fast`.
    pub fn validate(&self) -> Result<(), String> {
        let periods = [
            ("rsi_period", self.rsi_period),
            ("macd_fast", self.macd_fast),
            ("macd_signal", self.macd_signal),
            ("volume_ma", self.volume_ma),
            ("trend_ma", self.trend_ma),
        ];
        if let Some((name, _)) = periods.iter().find(|(_, p)| *p == 0) {
            return Err(format!("{name} must be >= 1"));
        }
        if self.macd_slow <= self.macd_fast {
            return Err(format!(
                "macd_slow ({}) must exceed macd_fast ({})",
                self.macd_slow, self.macd_fast
            ));
        }
        if !(1..=4).contains(&self.min_buy_conditions) {
            return Err(format!(
                "min_buy_conditions must be in 1..=4, got {}",
                self.min_buy_conditions
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Momentum {
    params: MomentumParams,
    rsi: Rsi,
    macd: Macd,
}

/// Which crossing, if any, happened on a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Golden,
    Death,
    None,
}

/// Every indicator the rules read, computed once over a bar series.
struct IndicatorSet {
    rsi: Vec<f64>,
    macd: Vec<f64>,
    signal: Vec<f64>,
    volume: Vec<f64>,
    volume_ma: Vec<f64>,
    close: Vec<f64>,
    trend_ma: Vec<f64>,
}

impl Momentum {
    pub fn new(params: MomentumParams) -> Self {
        let rsi = Rsi::new(params.rsi_period);
        let macd = Macd::new(
            params.macd_fast,
            params.macd_slow,
            params.macd_signal,
            MacdLine::Signal,
        );
        Self { params, rsi, macd }
    }

    pub fn params(&self) -> &MomentumParams {
        &self.params
    }

    fn indicators(&self, bars: &[Bar]) -> IndicatorSet {
        let (macd, signal) = self.macd.lines(bars);
        let volume: Vec<f64> = bars.iter().map(|b| b.volume as f64).collect();
        let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
        IndicatorSet {
            rsi: self.rsi.compute(bars),
            macd,
            signal,
            volume_ma: sma_of_series(&volume, self.params.volume_ma),
            volume,
            trend_ma: sma_of_series(&close, self.params.trend_ma),
            close,
        }
    }

    fn macd_cross(set: &IndicatorSet, t: usize) -> Cross {
        let Some(p) = t.checked_sub(1) else {
            return Cross::None;
        };
        let values = (
            value_at(&set.macd, p),
            value_at(&set.signal, p),
            value_at(&set.macd, t),
            value_at(&set.signal, t),
        );
        match values {
            (Some(m0), Some(s0), Some(m1), Some(s1)) if m0 < s0 && m1 > s1 => Cross::Golden,
            (Some(m0), Some(s0), Some(m1), Some(s1)) if m0 > s0 && m1 < s1 => Cross::Death,
            _ => Cross::None,
        }
    }

    /// Apply the rules to bar `t`. Only indices `..=t` are read.
    fn action_at(&self, set: &IndicatorSet, t: usize) -> Action {
        let rsi_now = value_at(&set.rsi, t);
        let cross = Self::macd_cross(set, t);

        let overbought = rsi_now.is_some_and(|r| r > self.params.rsi_overbought);
        if overbought || cross == Cross::Death {
            return Action::Sell;
        }

        let rsi_prev = t.checked_sub(1).and_then(|p| value_at(&set.rsi, p));
        let rsi_recovery = match (rsi_prev, rsi_now) {
            (Some(prev), Some(now)) => {
                prev < self.params.rsi_oversold && now > self.params.rsi_recovery
            }
            _ => false,
        };
        let volume_surge = value_at(&set.volume_ma, t)
            .is_some_and(|ma| set.volume[t] > ma * self.params.volume_surge_ratio);
        let above_trend = value_at(&set.trend_ma, t).is_some_and(|ma| set.close[t] > ma);

        let met = [
            rsi_recovery,
            cross == Cross::Golden,
            volume_surge,
            above_trend,
        ]
        .iter()
        .filter(|c| **c)
        .count();

        if met >= self.params.min_buy_conditions {
            Action::Buy
        } else {
            Action::Hold
        }
    }
}

impl Default for Momentum {
    fn default() -> Self {
        Self::new(MomentumParams::default())
    }
}

impl Strategy for Momentum {
    fn name(&self) -> &str {
        "momentum"
    }

    fn lookback(&self) -> usize {
        // The MACD cross needs the signal line on the previous bar as well.
        let macd = self.macd.lookback() + 1;
        let rsi = self.rsi.lookback() + 1;
        let trend = self.params.trend_ma.saturating_sub(1);
        let volume = self.params.volume_ma.saturating_sub(1);
        macd.max(rsi).max(trend).max(volume)
    }

    fn decide(&self, history: &[Bar]) -> Action {
        match history.len().checked_sub(1) {
            Some(t) => self.action_at(&self.indicators(history), t),
            None => Action::Hold,
        }
    }

    /// Indicators are causal, so one pass over the full series gives the
    /// same value at `t` as a pass over `bars[..=t]`.
    fn decide_series(&self, bars: &[Bar]) -> Vec<Action> {
        let set = self.indicators(bars);
        let lookback = self.lookback();
        (0..bars.len())
            .map(|t| {
                if t < lookback {
                    Action::Hold
                } else {
                    self.action_at(&set, t)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn params_validation() {
        assert!(MomentumParams::default().validate().is_ok());
        let bad = MomentumParams {
            macd_slow: 12,
            ..MomentumParams::default()
        };
        assert!(bad.validate().is_err());
        let zero = MomentumParams {
            volume_ma: 0,
            ..MomentumParams::default()
        };
        assert!(zero.validate().unwrap_err().contains("volume_ma"));
    }

    #[test]
    fn default_lookback_covers_macd_signal() {
        // slow 26 + signal 9 - 2 = 33, plus one bar for the cross
        assert_eq!(Momentum::default().lookback(), 34);
    }

    #[test]
    fn overbought_is_sell() {
        let closes: Vec<f64> = (0..60).map(|i| 10.0 + i as f64 * 0.1).collect();
        let bars = make_bars(&closes);
        assert_eq!(Momentum::default().decide(&bars), Action::Sell);
    }

    #[test]
    fn quiet_market_is_hold() {
        let bars = make_bars(&[10.0; 60]);
        assert_eq!(Momentum::default().decide(&bars), Action::Hold);
    }

    #[test]
    fn surge_above_trend_with_lowered_threshold_is_buy() {
        // Flat closes, then a volume spike on a bar that closes above MA20.
        let mut closes = vec![10.0; 59];
        closes.push(10.05);
        let mut bars = make_bars(&closes);
        bars[59].volume = 10_000;
        let strategy = Momentum::new(MomentumParams {
            min_buy_conditions: 2,
            rsi_overbought: 101.0,
            ..MomentumParams::default()
        });
        assert_eq!(strategy.decide(&bars), Action::Buy);
    }

    #[test]
    fn series_pass_matches_prefix_decisions() {
        let closes: Vec<f64> = (0..160)
            .map(|i| {
                let i = i as f64;
                10.0 + (i / 7.0).sin() * 1.5 + (i / 23.0).cos() * 0.8
            })
            .collect();
        let mut bars = make_bars(&closes);
        for (i, bar) in bars.iter_mut().enumerate() {
            if i % 11 == 0 {
                bar.volume *= 4;
            }
        }
        let strategy = Momentum::new(MomentumParams {
            min_buy_conditions: 2,
            ..MomentumParams::default()
        });

        let series = strategy.decide_series(&bars);
        assert_eq!(series.len(), bars.len());
        let lookback = strategy.lookback();
        for t in lookback..bars.len() {
            assert_eq!(series[t], strategy.decide(&bars[..=t]), "bar {t}");
        }
        assert!(series[..lookback].iter().all(|a| *a == Action::Hold));
    }
}
