//! Exchange Matching
//!
//! The per-symbol order book and the price-time priority algorithm that
//! runs against it. Everything here is synchronous; callers provide the
//! locking that makes a book exclusive while it is matched.

mod book;
mod price_time;

pub use book::SymbolBook;
pub use price_time::PriceTimeMatcher;

// Re-export the port types for convenience
pub use exchange_ports::{MatchReport, MatchingError, MatchingResult};
