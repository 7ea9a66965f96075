use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use exchange_core::{
    Order, OrderBook, OrderId, OrderType, Price, Side, Symbol, Timestamp, ValidationError,
};
use exchange_ports::{MatchingError, MatchingResult};

/// Priority key for one resting order
///
/// Bids sort by price descending, asks by price ascending; ties go to the
/// older timestamp, then to the earlier insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BookKey {
    price: Price,
    timestamp: Timestamp,
    sequence: u64,
    is_bid: bool,
}

impl Ord for BookKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_price = if self.is_bid {
            other.price.cmp(&self.price)
        } else {
            self.price.cmp(&other.price)
        };
        by_price
            .then_with(|| self.timestamp.cmp(&other.timestamp))
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

impl PartialOrd for BookKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Live book for a single symbol
///
/// Owns its resting orders. Every order held here is an active LIMIT
/// order with positive remaining quantity.
#[derive(Debug, Clone)]
pub struct SymbolBook {
    symbol: Symbol,
    bids: BTreeMap<BookKey, Order>,
    asks: BTreeMap<BookKey, Order>,
    index: HashMap<OrderId, BookKey>,
    sequence: u64,
    last_updated: Timestamp,
}

impl SymbolBook {
    pub fn new(symbol: impl Into<Symbol>, now: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            index: HashMap::new(),
            sequence: 0,
            last_updated: now,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.last_updated = now;
    }

    /// Rest an order on its own side at its priority position
    pub fn insert(&mut self, order: Order) -> MatchingResult<()> {
        if order.symbol != self.symbol {
            return Err(MatchingError::SymbolNotFound(order.symbol));
        }
        if self.index.contains_key(&order.id) {
            return Err(MatchingError::DuplicateOrder(order.id));
        }
        order.validate()?;
        if order.order_type == OrderType::Market {
            return Err(ValidationError::InvalidOrderType(format!(
                "{} orders cannot rest",
                order.order_type
            ))
            .into());
        }
        if !order.status.is_active() {
            return Err(ValidationError::TerminalOrder(order.status).into());
        }

        self.sequence += 1;
        let key = BookKey {
            price: order.price,
            timestamp: order.timestamp,
            sequence: self.sequence,
            is_bid: order.side.is_buy(),
        };
        self.index.insert(order.id.clone(), key);
        self.side_mut(order.side).insert(key, order);
        Ok(())
    }

    /// Take a resting order out of the book
    pub fn remove(&mut self, order_id: &str) -> Option<Order> {
        let key = self.index.remove(order_id)?;
        let side = if key.is_bid { Side::Buy } else { Side::Sell };
        self.side_mut(side).remove(&key)
    }

    pub(crate) fn remove_key(&mut self, side: Side, key: &BookKey) -> Option<Order> {
        let order = self.side_mut(side).remove(key)?;
        self.index.remove(&order.id);
        Some(order)
    }

    pub fn get(&self, order_id: &str) -> Option<&Order> {
        let key = self.index.get(order_id)?;
        if key.is_bid {
            self.bids.get(key)
        } else {
            self.asks.get(key)
        }
    }

    pub fn contains(&self, order_id: &str) -> bool {
        self.index.contains_key(order_id)
    }

    pub(crate) fn side_mut(&mut self, side: Side) -> &mut BTreeMap<BookKey, Order> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    /// Resting orders on one side, best first
    pub fn orders(&self, side: Side) -> impl Iterator<Item = &Order> {
        match side {
            Side::Buy => self.bids.values(),
            Side::Sell => self.asks.values(),
        }
    }

    /// Best bid price (highest buy order)
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first_key_value().map(|(k, _)| k.price)
    }

    /// Best ask price (lowest sell order)
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first_key_value().map(|(k, _)| k.price)
    }

    /// Number of orders in the book
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Copy both sides in priority order
    pub fn snapshot(&self) -> OrderBook {
        OrderBook {
            symbol: self.symbol.clone(),
            buy_orders: self.bids.values().cloned().collect(),
            sell_orders: self.asks.values().cloned().collect(),
            last_updated: self.last_updated,
        }
    }
}
