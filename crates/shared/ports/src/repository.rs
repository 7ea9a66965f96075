use async_trait::async_trait;
use exchange_core::{Order, OrderStatus, Timestamp, Trade};

use crate::error::RepositoryResult;

/// Store of record for orders, written after matching
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order; fails if the id is already stored
    async fn save(&self, order: &Order) -> RepositoryResult<()>;

    /// Replace a stored order; fails if the id is unknown
    async fn update(&self, order: &Order) -> RepositoryResult<()>;

    async fn delete(&self, id: &str) -> RepositoryResult<()>;

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Order>;

    async fn get_by_user_id(&self, user_id: &str) -> RepositoryResult<Vec<Order>>;

    async fn get_by_symbol(&self, symbol: &str) -> RepositoryResult<Vec<Order>>;

    async fn get_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>>;

    /// Orders that are still `Pending` or `Partial`
    async fn get_active_orders(&self) -> RepositoryResult<Vec<Order>>;

    /// Orders created within `[start, end]`
    async fn get_orders_in_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> RepositoryResult<Vec<Order>>;
}

/// Store of record for executed trades
#[async_trait]
pub trait TradeRepository: Send + Sync {
    async fn save(&self, trade: &Trade) -> RepositoryResult<()>;

    async fn get_by_id(&self, id: &str) -> RepositoryResult<Trade>;

    /// Trades where `order_id` was either the buyer or the seller
    async fn get_by_order_id(&self, order_id: &str) -> RepositoryResult<Vec<Trade>>;

    async fn get_by_symbol(&self, symbol: &str) -> RepositoryResult<Vec<Trade>>;

    async fn get_trades_in_time_range(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> RepositoryResult<Vec<Trade>>;

    /// Newest trades first, at most `limit`
    async fn get_recent_trades(&self, limit: usize) -> RepositoryResult<Vec<Trade>>;

    async fn delete(&self, id: &str) -> RepositoryResult<()>;
}
