//! Seeded random-walk bars for demos, benches and tests.
//!
//! Daily moves are clamped inside the main-board band so the series looks
//! like a tradable instrument, with an occasional limit-up or limit-down
//! close to exercise the broker's lock rules.

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use boardlab_core::domain::Bar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticParams {
    pub start: NaiveDate,
    /// Number of trading days (weekends are skipped).
    pub bars: usize,
    pub start_price: f64,
    /// Standard deviation-ish scale of daily returns.
    pub daily_volatility: f64,
    /// Probability that a day closes at the band edge.
    pub limit_day_probability: f64,
    pub seed: u64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap_or_default(),
            bars: 500,
            start_price: 10.0,
            daily_volatility: 0.02,
            limit_day_probability: 0.01,
            seed: 42,
        }
    }
}

/// Main-board move cap used by the walk.
const MAX_DAILY_MOVE: f64 = 0.10;

fn round_price(p: f64) -> f64 {
    (p * 100.0).round() / 100.0
}

pub fn generate_bars(params: &SyntheticParams) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut bars = Vec::with_capacity(params.bars);
    let mut price = params.start_price.max(0.01);
    let mut date = params.start;

    while bars.len() < params.bars {
        if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            date += chrono::Duration::days(1);
            continue;
        }

        let daily_return = if rng.gen_bool(params.limit_day_probability.clamp(0.0, 1.0)) {
            if rng.gen_bool(0.5) {
                MAX_DAILY_MOVE
            } else {
                -MAX_DAILY_MOVE
            }
        } else {
            // Sum of uniforms: cheap bell shape.
            let u: f64 = (0..4).map(|_| rng.gen_range(-1.0..1.0)).sum::<f64>() / 2.0;
            (u * params.daily_volatility).clamp(-0.095, 0.095)
        };

        let prior = price;
        let open = round_price(prior * (1.0 + rng.gen_range(-0.3..0.3) * params.daily_volatility));
        let close = round_price(prior * (1.0 + daily_return)).max(0.01);
        let cap_high = prior * (1.0 + MAX_DAILY_MOVE);
        let cap_low = prior * (1.0 - MAX_DAILY_MOVE);
        let high = round_price(
            (open.max(close) * (1.0 + rng.gen_range(0.0..0.01))).min(cap_high),
        )
        .max(open.max(close));
        let low = round_price(
            (open.min(close) * (1.0 - rng.gen_range(0.0..0.01))).max(cap_low),
        )
        .min(open.min(close))
        .max(0.01);

        bars.push(Bar {
            date,
            open: open.max(0.01),
            high,
            low,
            close,
            volume: rng.gen_range(500_000..5_000_000u64),
        });

        price = close;
        date += chrono::Duration::days(1);
    }

    tracing::debug!(seed = params.seed, bars = bars.len(), "generated synthetic bars");
    bars
}
