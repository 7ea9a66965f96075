//! Exchange Ports
//!
//! Port definitions (traits) for the simulated exchange.
//! These define the boundaries between the matching core and the
//! persistence and metrics collaborators around it.

mod clock;
mod error;
mod matching;
mod metrics;
mod repository;

pub use clock::Clock;
pub use error::{
    MatchingError, MatchingResult, MetricsError, MetricsResult, RepositoryError, RepositoryResult,
};
pub use matching::{MatchReport, OrderMatcher};
pub use metrics::MetricsCalculator;
pub use repository::{OrderRepository, TradeRepository};
