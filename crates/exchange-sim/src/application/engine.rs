use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use exchange_core::{Order, OrderBook, OrderStatus, Quantity, Symbol, Timestamp};
use exchange_matching::{PriceTimeMatcher, SymbolBook};
use exchange_ports::{Clock, MatchReport, MatchingError, MatchingResult, OrderMatcher};
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::infrastructure::EngineConfig;

const NEVER: i64 = i64::MIN;

/// One symbol's book plus the totals kept under the same lock
#[derive(Debug)]
struct BookSlot {
    book: SymbolBook,
    volume: Quantity,
}

impl BookSlot {
    fn new(symbol: &str, now: Timestamp) -> Self {
        Self {
            book: SymbolBook::new(symbol, now),
            volume: Decimal::ZERO,
        }
    }
}

/// Point-in-time engine counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub symbols: usize,
    pub resting_orders: usize,
    pub orders_received: u64,
    pub orders_rejected: u64,
    pub orders_cancelled: u64,
    pub trades_executed: u64,
    pub total_volume: Decimal,
    pub last_match_at: Option<Timestamp>,
}

/// Multi-symbol matching engine
///
/// Each symbol's book sits behind its own `RwLock`: orders for different
/// symbols match in parallel, orders for the same symbol are serialized.
/// Persistence is left to the caller.
pub struct MatchingEngine {
    books: DashMap<Symbol, Arc<RwLock<BookSlot>>>,
    matcher: PriceTimeMatcher,
    clock: Arc<dyn Clock>,
    auto_create_books: bool,
    orders_received: AtomicU64,
    orders_rejected: AtomicU64,
    orders_cancelled: AtomicU64,
    trades_executed: AtomicU64,
    last_match_micros: AtomicI64,
}

impl MatchingEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        info!("Matching engine started with {} clock", clock.name());
        Self {
            books: DashMap::new(),
            matcher: PriceTimeMatcher::new(),
            clock,
            auto_create_books: false,
            orders_received: AtomicU64::new(0),
            orders_rejected: AtomicU64::new(0),
            orders_cancelled: AtomicU64::new(0),
            trades_executed: AtomicU64::new(0),
            last_match_micros: AtomicI64::new(NEVER),
        }
    }

    pub fn with_symbols<I, S>(clock: Arc<dyn Clock>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Symbol>,
    {
        let engine = Self::new(clock);
        for symbol in symbols {
            engine.add_symbol(symbol);
        }
        engine
    }

    pub fn from_config(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let mut engine = Self::with_symbols(clock, config.symbols.iter().cloned());
        engine.auto_create_books = config.auto_create_books;
        engine
    }

    /// Register an empty book; false if the symbol already has one
    pub fn add_symbol(&self, symbol: impl Into<Symbol>) -> bool {
        let symbol = symbol.into();
        if symbol.is_empty() {
            return false;
        }
        match self.books.entry(symbol) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                let slot = BookSlot::new(vacant.key(), self.clock.now());
                info!("Created order book for {}", vacant.key());
                vacant.insert(Arc::new(RwLock::new(slot)));
                true
            }
        }
    }

    /// Registered symbols, sorted
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.books.iter().map(|e| e.key().clone()).collect();
        symbols.sort();
        symbols
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.books.contains_key(symbol)
    }

    pub fn auto_creates_books(&self) -> bool {
        self.auto_create_books
    }

    pub async fn stats(&self) -> EngineStats {
        let slots: Vec<Arc<RwLock<BookSlot>>> =
            self.books.iter().map(|e| Arc::clone(e.value())).collect();

        let mut resting_orders = 0;
        let mut total_volume = Decimal::ZERO;
        for slot in &slots {
            let slot = slot.read().await;
            resting_orders += slot.book.order_count();
            total_volume += slot.volume;
        }

        let last = self.last_match_micros.load(Ordering::Acquire);
        EngineStats {
            symbols: slots.len(),
            resting_orders,
            orders_received: self.orders_received.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
            orders_cancelled: self.orders_cancelled.load(Ordering::Relaxed),
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
            total_volume,
            last_match_at: (last != NEVER)
                .then(|| DateTime::<Utc>::from_timestamp_micros(last))
                .flatten(),
        }
    }

    // Clones the Arc out so no map guard outlives this call
    fn slot(&self, symbol: &str) -> Option<Arc<RwLock<BookSlot>>> {
        self.books.get(symbol).map(|entry| Arc::clone(entry.value()))
    }

    fn slot_for_order(&self, symbol: &str) -> Option<Arc<RwLock<BookSlot>>> {
        if let Some(slot) = self.slot(symbol) {
            return Some(slot);
        }
        if !self.auto_create_books || symbol.is_empty() {
            return None;
        }
        let entry = self.books.entry(symbol.to_string()).or_insert_with(|| {
            info!("Auto-creating order book for {}", symbol);
            Arc::new(RwLock::new(BookSlot::new(symbol, self.clock.now())))
        });
        Some(Arc::clone(entry.value()))
    }

    fn refuse(&self, order: &Order, error: MatchingError) -> MatchingError {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
        warn!("Order {} refused: {}", order.id, error);
        error
    }
}

#[async_trait]
impl OrderMatcher for MatchingEngine {
    async fn execute(&self, order: &mut Order) -> MatchingResult<MatchReport> {
        self.orders_received.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = order.validate() {
            return Err(self.refuse(order, e.into()));
        }

        let Some(slot) = self.slot_for_order(&order.symbol) else {
            if order.status == OrderStatus::Pending {
                order.reject()?;
            }
            let error = MatchingError::SymbolNotFound(order.symbol.clone());
            return Err(self.refuse(order, error));
        };

        let report = {
            let mut slot = slot.write().await;
            let now = self.clock.now();
            let report = match self.matcher.match_order(&mut slot.book, order, now) {
                Ok(report) => report,
                Err(e) => return Err(self.refuse(order, e)),
            };
            slot.volume += report.trades.iter().map(|t| t.quantity).sum::<Decimal>();
            if !report.trades.is_empty() {
                // Symbols finish out of order; keep the latest
                self.last_match_micros
                    .fetch_max(now.timestamp_micros(), Ordering::AcqRel);
            }
            report
        };

        self.trades_executed
            .fetch_add(report.trades.len() as u64, Ordering::Relaxed);
        if order.status == OrderStatus::Rejected {
            self.orders_rejected.fetch_add(1, Ordering::Relaxed);
        }

        debug!(
            "Order {} {} {} {}: {} trade(s), status {}",
            order.id,
            order.side,
            order.order_type,
            order.symbol,
            report.trades.len(),
            order.status
        );
        Ok(report)
    }

    async fn get_order_book(&self, symbol: &str) -> MatchingResult<OrderBook> {
        let slot = self
            .slot(symbol)
            .ok_or_else(|| MatchingError::SymbolNotFound(symbol.to_string()))?;
        let slot = slot.read().await;
        Ok(slot.book.snapshot())
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> MatchingResult<Order> {
        let slot = self
            .slot(symbol)
            .ok_or_else(|| MatchingError::SymbolNotFound(symbol.to_string()))?;
        let mut slot = slot.write().await;

        let mut order = slot
            .book
            .remove(order_id)
            .ok_or_else(|| MatchingError::OrderNotFound {
                symbol: symbol.to_string(),
                order_id: order_id.to_string(),
            })?;
        order.cancel()?;
        slot.book.touch(self.clock.now());

        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
        info!(
            "Cancelled order {} on {} with {} remaining",
            order.id, symbol, order.quantity
        );
        Ok(order)
    }
}
