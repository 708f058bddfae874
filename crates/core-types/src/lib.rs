//! # Journal Core Types
//!
//! The shared vocabulary of the trading journal: the `TradeRecord` users log,
//! the payloads used to create and edit it, and the strategy metadata trades
//! can be linked to.
//!
//! This is a Layer 0 crate. It knows nothing about storage or presentation;
//! every other crate in the workspace depends on it.

pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{Direction, Outcome};
pub use error::CoreError;
pub use structs::{
    NewStrategy, NewTradeRecord, Strategy, StrategyUpdate, TradeRecord, TradeUpdate,
    compute_profit_loss,
};
