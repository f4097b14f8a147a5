//! Domain types for the BoardLab simulation core.

pub mod account;
pub mod bar;
pub mod decision;
pub mod fill;
pub mod order;
pub mod position;
pub mod trade;

pub use account::{AccountState, EquityPoint};
pub use bar::Bar;
pub use decision::{Action, Decision, ParseActionError};
pub use fill::Fill;
pub use order::{Order, OrderQuantity, OrderSide};
pub use position::Position;
pub use trade::{ExitReason, Trade};
