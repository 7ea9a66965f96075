use exchange_core::{Order, Trade};
use exchange_ports::{MatchingError, MetricsError, RepositoryError};
use thiserror::Error;

use crate::infrastructure::ConfigError;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error(transparent)]
    Matching(#[from] MatchingError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    /// The in-memory match stands; only the write-behind failed
    #[error(
        "Persistence failed for order {} after {} trade(s): {source}",
        .order.id,
        .trades.len()
    )]
    Persistence {
        order: Box<Order>,
        trades: Vec<Trade>,
        source: RepositoryError,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExchangeError>;

impl ExchangeError {
    /// True when matching succeeded and only persistence needs a retry
    pub fn is_post_match(&self) -> bool {
        matches!(self, ExchangeError::Persistence { .. })
    }
}
