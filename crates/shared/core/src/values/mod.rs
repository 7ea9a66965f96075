use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Symbol identifier for a tradeable instrument
pub type Symbol = String;

/// Caller-assigned order identifier
pub type OrderId = String;

/// Engine-assigned trade identifier
pub type TradeId = String;

/// Owner of an order, used for self-trade prevention
pub type UserId = String;
