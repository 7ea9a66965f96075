use async_trait::async_trait;
use exchange_core::{Order, OrderBook, Trade};

use crate::error::MatchingResult;

/// Everything one match call changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchReport {
    /// Trades in the order they were generated
    pub trades: Vec<Trade>,
    /// Post-fill state of every resting order the incoming order traded with
    pub makers: Vec<Order>,
}

impl MatchReport {
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}

/// Port for the matching engine
///
/// Implementations own the per-symbol books and are their only writer.
/// Dropping a returned future abandons the call.
#[async_trait]
pub trait OrderMatcher: Send + Sync {
    /// Match `order` against its symbol's book, updating its status and
    /// remaining quantity in place
    async fn execute(&self, order: &mut Order) -> MatchingResult<MatchReport>;

    /// Match `order` and return only the generated trades
    async fn match_orders(&self, order: &mut Order) -> MatchingResult<Vec<Trade>> {
        Ok(self.execute(order).await?.trades)
    }

    /// Consistent copy of both sides of `symbol`'s book
    async fn get_order_book(&self, symbol: &str) -> MatchingResult<OrderBook>;

    /// Remove a resting order and mark it cancelled
    async fn cancel_order(&self, symbol: &str, order_id: &str) -> MatchingResult<Order>;
}
