use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ValidationError, ValidationResult};
use crate::values::{OrderId, Price, Quantity, Symbol, Timestamp, TradeId};

/// Trade resulting from matching two orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
    pub symbol: Symbol,
    pub price: Price,
    pub quantity: Quantity,
    pub timestamp: Timestamp,
}

impl Trade {
    /// Create a validated trade with explicit id and timestamp
    pub fn new_with_id(
        id: impl Into<TradeId>,
        buy_order_id: impl Into<OrderId>,
        sell_order_id: impl Into<OrderId>,
        symbol: impl Into<Symbol>,
        price: Price,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> ValidationResult<Self> {
        let trade = Self {
            id: id.into(),
            buy_order_id: buy_order_id.into(),
            sell_order_id: sell_order_id.into(),
            symbol: symbol.into(),
            price,
            quantity,
            timestamp,
        };
        trade.validate()?;
        Ok(trade)
    }

    /// Create a validated trade with a fresh id
    pub fn new_with_time(
        buy_order_id: impl Into<OrderId>,
        sell_order_id: impl Into<OrderId>,
        symbol: impl Into<Symbol>,
        price: Price,
        quantity: Quantity,
        timestamp: Timestamp,
    ) -> ValidationResult<Self> {
        Self::new_with_id(
            Uuid::new_v4().to_string(),
            buy_order_id,
            sell_order_id,
            symbol,
            price,
            quantity,
            timestamp,
        )
    }

    /// Create a validated trade using current system time
    /// Note: For simulation, prefer `new_with_time` with clock-provided time
    pub fn new(
        buy_order_id: impl Into<OrderId>,
        sell_order_id: impl Into<OrderId>,
        symbol: impl Into<Symbol>,
        price: Price,
        quantity: Quantity,
    ) -> ValidationResult<Self> {
        Self::new_with_time(buy_order_id, sell_order_id, symbol, price, quantity, Utc::now())
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.id.is_empty() {
            return Err(ValidationError::EmptyTradeId);
        }
        if self.buy_order_id.is_empty() {
            return Err(ValidationError::EmptyBuyOrderId);
        }
        if self.sell_order_id.is_empty() {
            return Err(ValidationError::EmptySellOrderId);
        }
        if self.buy_order_id == self.sell_order_id {
            return Err(ValidationError::SameOrderIds);
        }
        if self.symbol.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }
        if self.price <= Decimal::ZERO {
            return Err(ValidationError::NonPositivePrice);
        }
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Returns the notional value of the trade (price * quantity)
    pub fn value(&self) -> Decimal {
        self.price * self.quantity
    }

    /// Whether `order_id` is either side of this trade
    pub fn involves(&self, order_id: &str) -> bool {
        self.buy_order_id == order_id || self.sell_order_id == order_id
    }
}
