use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{OrderStatus, OrderType, Side};
use crate::error::{ValidationError, ValidationResult};
use crate::values::{OrderId, Price, Quantity, Symbol, Timestamp, UserId};

/// Full order details
///
/// `quantity` is the remaining unfilled amount and shrinks as the order
/// trades; `filled_quantity` accumulates what has already executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Limit price; zero and ignored for market orders
    pub price: Price,
    pub quantity: Quantity,
    #[serde(default)]
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    /// Creation time, used for time priority
    pub timestamp: Timestamp,
}

impl Order {
    /// Create a validated order with explicit timestamp
    #[allow(clippy::too_many_arguments)]
    pub fn new_with_time(
        id: impl Into<OrderId>,
        user_id: impl Into<UserId>,
        symbol: impl Into<Symbol>,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> ValidationResult<Self> {
        let order = Self {
            id: id.into(),
            user_id: user_id.into(),
            symbol: symbol.into(),
            side,
            order_type,
            price,
            quantity,
            filled_quantity: Decimal::ZERO,
            status: OrderStatus::Pending,
            timestamp,
        };
        order.validate()?;
        Ok(order)
    }

    /// Create a validated order stamped with the current system time
    pub fn new(
        id: impl Into<OrderId>,
        user_id: impl Into<UserId>,
        symbol: impl Into<Symbol>,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    ) -> ValidationResult<Self> {
        Self::new_with_time(
            id,
            user_id,
            symbol,
            side,
            order_type,
            price,
            quantity,
            Utc::now(),
        )
    }

    pub fn new_limit(
        id: impl Into<OrderId>,
        user_id: impl Into<UserId>,
        symbol: impl Into<Symbol>,
        side: Side,
        price: Price,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> ValidationResult<Self> {
        Self::new_with_time(
            id,
            user_id,
            symbol,
            side,
            OrderType::Limit,
            price,
            quantity,
            timestamp,
        )
    }

    pub fn new_market(
        id: impl Into<OrderId>,
        user_id: impl Into<UserId>,
        symbol: impl Into<Symbol>,
        side: Side,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> ValidationResult<Self> {
        Self::new_with_time(
            id,
            user_id,
            symbol,
            side,
            OrderType::Market,
            Decimal::ZERO,
            quantity,
            timestamp,
        )
    }

    /// Re-check every field rule
    ///
    /// Uses the same rules as construction, so deserialized or hand-built
    /// orders can be checked before they reach the engine.
    pub fn validate(&self) -> ValidationResult<()> {
        self.validate_terms()?;
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Rules for an order at any point of its life
    ///
    /// Unlike [`Order::validate`], a fully filled order (zero remaining)
    /// passes as long as it traded something.
    pub fn validate_record(&self) -> ValidationResult<()> {
        if self.filled_quantity < Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity);
        }
        if self.quantity.is_zero() && self.has_fills() {
            return self.validate_terms();
        }
        self.validate()
    }

    fn validate_terms(&self) -> ValidationResult<()> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyOrderId);
        }
        if self.user_id.is_empty() {
            return Err(ValidationError::EmptyUserId);
        }
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if self.price < Decimal::ZERO {
            return Err(ValidationError::NegativePrice);
        }
        if self.order_type == OrderType::Limit && self.price <= Decimal::ZERO {
            return Err(ValidationError::LimitPriceRequired);
        }
        Ok(())
    }

    /// Move to `next` if the lifecycle allows it; otherwise leave the order untouched
    pub fn update_status(&mut self, next: OrderStatus) -> ValidationResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    /// Consume `fill` from the remaining quantity and advance the status
    pub fn apply_fill(&mut self, fill: Quantity) -> ValidationResult<()> {
        if fill <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity);
        }
        if fill > self.quantity {
            return Err(ValidationError::Overfill {
                fill,
                remaining: self.quantity,
            });
        }

        let next = if fill == self.quantity {
            OrderStatus::Filled
        } else {
            OrderStatus::Partial
        };
        self.update_status(next)?;

        self.quantity -= fill;
        self.filled_quantity += fill;
        Ok(())
    }

    pub fn cancel(&mut self) -> ValidationResult<()> {
        self.update_status(OrderStatus::Cancelled)
    }

    pub fn reject(&mut self) -> ValidationResult<()> {
        self.update_status(OrderStatus::Rejected)
    }

    /// Whether this order's price crosses a resting order at `resting_price`
    pub fn crosses(&self, resting_price: Price) -> bool {
        match (self.order_type, self.side) {
            (OrderType::Market, _) => true,
            (OrderType::Limit, Side::Buy) => self.price >= resting_price,
            (OrderType::Limit, Side::Sell) => self.price <= resting_price,
        }
    }

    /// Size at submission, before any fills
    pub fn original_quantity(&self) -> Quantity {
        self.quantity + self.filled_quantity
    }

    pub fn has_fills(&self) -> bool {
        self.filled_quantity > Decimal::ZERO
    }

    pub fn is_market(&self) -> bool {
        self.order_type == OrderType::Market
    }
}
