//! Exchange Core Domain
//!
//! Pure domain types for the simulated exchange.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod error;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{
    Order, OrderBook, OrderStatus, OrderType, PerformanceMetrics, Side, Trade,
};
pub use error::{ValidationError, ValidationResult};
pub use values::{OrderId, Price, Quantity, Symbol, Timestamp, TradeId, UserId};
