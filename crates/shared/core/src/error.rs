use thiserror::Error;

use crate::entities::OrderStatus;
use crate::values::Quantity;

/// Field and state-machine validation failures
///
/// Raised before any state is touched, so a failed call never leaves a
/// half-updated value behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("order ID cannot be empty")]
    EmptyOrderId,

    #[error("user ID cannot be empty")]
    EmptyUserId,

    #[error("symbol cannot be empty")]
    EmptySymbol,

    #[error("trade ID cannot be empty")]
    EmptyTradeId,

    #[error("buy order ID cannot be empty")]
    EmptyBuyOrderId,

    #[error("sell order ID cannot be empty")]
    EmptySellOrderId,

    #[error("buy order ID and sell order ID cannot be the same")]
    SameOrderIds,

    #[error("price cannot be negative")]
    NegativePrice,

    #[error("price must be positive")]
    NonPositivePrice,

    #[error("limit orders must have a price greater than zero")]
    LimitPriceRequired,

    #[error("quantity must be positive")]
    NonPositiveQuantity,

    #[error("invalid order side: {0}")]
    InvalidSide(String),

    #[error("invalid order type: {0}")]
    InvalidOrderType(String),

    #[error("invalid order status: {0}")]
    InvalidStatus(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order is already {0} and cannot be matched")]
    TerminalOrder(OrderStatus),

    #[error("fill of {fill} exceeds remaining quantity {remaining}")]
    Overfill { fill: Quantity, remaining: Quantity },

    #[error("orders per second cannot be negative")]
    NegativeThroughput,

    #[error("average latency cannot be negative")]
    NegativeLatency,

    #[error("system load percent must be between 0 and 100")]
    LoadOutOfRange,

    #[error("optimization score must be between 0 and 100")]
    ScoreOutOfRange,
}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;
