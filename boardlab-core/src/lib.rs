//! BoardLab Core: daily-bar backtest simulation for price-limited,
//! lot-traded, T+1 equity markets.
//!
//! - Domain types (bars, decisions, orders, fills, positions, trades, account)
//! - Exchange rule broker (price-limit band, lot rounding, fees)
//! - Indicators and bundled strategies
//! - Look-ahead-free signal precomputation
//! - Sequential execution simulator with settlement and exit rules
//!
//! No I/O happens here. Loading data, analytics and export live in
//! `boardlab-runner`.

pub mod broker;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a sweep worker touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Decision>();
        require_sync::<domain::Decision>();
        require_send::<domain::AccountState>();
        require_sync::<domain::AccountState>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();

        require_send::<broker::BrokerRules>();
        require_sync::<broker::BrokerRules>();
        require_send::<broker::BoardTable>();
        require_sync::<broker::BoardTable>();

        require_send::<engine::EngineConfig>();
        require_sync::<engine::EngineConfig>();
        require_send::<engine::SimulationResult>();
        require_sync::<engine::SimulationResult>();
        require_send::<engine::EngineError>();
        require_sync::<engine::EngineError>();

        require_send::<Box<dyn signals::Strategy>>();
        require_sync::<Box<dyn signals::Strategy>>();
        require_send::<Box<dyn indicators::Indicator>>();
        require_sync::<Box<dyn indicators::Indicator>>();
    }
}
