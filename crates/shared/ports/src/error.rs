use exchange_core::{OrderId, Symbol, ValidationError};
use thiserror::Error;

/// Failures reported by an order matcher
///
/// Liquidity problems are not errors: they end as a `Rejected` order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchingError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(Symbol),

    #[error("Order {order_id} not found in {symbol} book")]
    OrderNotFound { symbol: Symbol, order_id: OrderId },

    #[error("Order {0} is already resting in the book")]
    DuplicateOrder(OrderId),
}

pub type MatchingResult<T> = std::result::Result<T, MatchingError>;

/// Failures reported by order and trade stores
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} with ID {id} already exists")]
    AlreadyExists { entity: &'static str, id: String },

    #[error("Invalid entity: {0}")]
    Validation(#[from] ValidationError),

    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// The stored record is newer than the one being written
    #[error("{entity} with ID {id} not updated: {reason}")]
    Stale {
        entity: &'static str,
        id: String,
        reason: String,
    },
}

impl RepositoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, RepositoryError::Stale { .. })
    }
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Failures reported by a metrics calculator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetricsError {
    #[error("Invalid metrics window: {0}")]
    InvalidWindow(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Invalid metrics: {0}")]
    Validation(#[from] ValidationError),
}

pub type MetricsResult<T> = std::result::Result<T, MetricsError>;
