use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Order;
use crate::values::{Price, Symbol, Timestamp};

/// Point-in-time copy of one symbol's book
///
/// `buy_orders` are best bid first (price descending, then oldest first);
/// `sell_orders` are best ask first (price ascending, then oldest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub buy_orders: Vec<Order>,
    pub sell_orders: Vec<Order>,
    pub last_updated: Timestamp,
}

impl OrderBook {
    pub fn empty(symbol: impl Into<Symbol>, last_updated: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            buy_orders: Vec::new(),
            sell_orders: Vec::new(),
            last_updated,
        }
    }

    /// Best bid price (highest buy order)
    pub fn best_bid(&self) -> Option<Price> {
        self.buy_orders.first().map(|o| o.price)
    }

    /// Best ask price (lowest sell order)
    pub fn best_ask(&self) -> Option<Price> {
        self.sell_orders.first().map(|o| o.price)
    }

    /// Spread between best ask and best bid
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Mid price between best bid and ask
    pub fn mid_price(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            _ => None,
        }
    }

    /// Number of resting orders across both sides
    pub fn order_count(&self) -> usize {
        self.buy_orders.len() + self.sell_orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy_orders.is_empty() && self.sell_orders.is_empty()
    }
}
