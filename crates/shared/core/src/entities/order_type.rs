use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// Order types supported by the exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    /// Execute against whatever liquidity is available, never rests
    Market,
    /// Execute at specified price or better, remainder rests in the book
    Limit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "MARKET"),
            OrderType::Limit => write!(f, "LIMIT"),
        }
    }
}

impl TryFrom<&str> for OrderType {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "MARKET" => Ok(OrderType::Market),
            "LIMIT" => Ok(OrderType::Limit),
            _ => Err(ValidationError::InvalidOrderType(value.to_string())),
        }
    }
}
