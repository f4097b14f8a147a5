//! Boundary validation, run before the simulation loop starts.

use crate::domain::{Bar, Decision};

use super::error::EngineError;

/// Reject malformed bars; return non-fatal data quality warnings.
///
/// Fatal: non-finite or non-positive prices, dates not strictly increasing.
/// Warning: inconsistent high/low range.
pub fn validate_bars(bars: &[Bar]) -> Result<Vec<String>, EngineError> {
    let mut warnings = Vec::new();

    for (i, bar) in bars.iter().enumerate() {
        if !bar.has_valid_prices() {
            return Err(EngineError::InvalidInput {
                index: i,
                reason: format!(
                    "{}: prices must be finite and positive (o={} h={} l={} c={})",
                    bar.date, bar.open, bar.high, bar.low, bar.close
                ),
            });
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(EngineError::InvalidInput {
                index: i,
                reason: format!(
                    "date {} does not follow {} (dates must be strictly increasing)",
                    bar.date,
                    bars[i - 1].date
                ),
            });
        }
        if !bar.is_sane() {
            warnings.push(format!("{}: high/low range is inconsistent", bar.date));
        }
    }

    Ok(warnings)
}

/// Decisions must pair one-to-one with bars, date for date.
pub fn validate_decisions(bars: &[Bar], decisions: &[Decision]) -> Result<(), EngineError> {
    if bars.len() != decisions.len() {
        return Err(EngineError::MisalignedDecisions(format!(
            "{} bars but {} decisions",
            bars.len(),
            decisions.len()
        )));
    }
    if let Some((i, (bar, decision))) = bars
        .iter()
        .zip(decisions)
        .enumerate()
        .find(|(_, (b, d))| b.date != d.date)
    {
        return Err(EngineError::MisalignedDecisions(format!(
            "bar {i} is dated {} but its decision is dated {}",
            bar.date, decision.date
        )));
    }
    Ok(())
}
