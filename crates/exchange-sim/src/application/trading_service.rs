use exchange_core::{Order, OrderBook, OrderStatus, Trade};
use exchange_ports::{
    MatchReport, OrderMatcher, OrderRepository, RepositoryError, RepositoryResult, TradeRepository,
};
use log::{debug, error, info};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ExchangeError, Result};
use crate::infrastructure::ServiceConfig;

/// Outcome of a placed order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementResult {
    /// Order state after matching
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Order entry on top of a matcher and the stores of record
///
/// Matching finishes (and releases the book) before anything is written,
/// so a slow store never holds up other orders on the symbol. Each store
/// call is bounded by the request timeout.
pub struct TradingService<M, O, T>
where
    M: OrderMatcher,
    O: OrderRepository,
    T: TradeRepository,
{
    matcher: Arc<M>,
    orders: Arc<O>,
    trades: Arc<T>,
    request_timeout: Duration,
}

impl<M, O, T> TradingService<M, O, T>
where
    M: OrderMatcher,
    O: OrderRepository,
    T: TradeRepository,
{
    pub fn new(matcher: Arc<M>, orders: Arc<O>, trades: Arc<T>, config: &ServiceConfig) -> Self {
        Self {
            matcher,
            orders,
            trades,
            request_timeout: config.request_timeout(),
        }
    }

    pub fn matcher(&self) -> &Arc<M> {
        &self.matcher
    }

    /// Match `order`, then record it, its counterparties and its trades
    ///
    /// Refused orders are not stored. A store failure after matching is
    /// `ExchangeError::Persistence`; the match itself stands.
    pub async fn place_order(&self, mut order: Order) -> Result<PlacementResult> {
        let report = self.matcher.execute(&mut order).await?;

        if order.status == OrderStatus::Rejected {
            info!("Order {} rejected: no eligible liquidity", order.id);
        }

        if let Err(source) = self.persist(&order, &report).await {
            error!(
                "Order {} matched with {} trade(s) but was not fully stored: {}",
                order.id,
                report.trades.len(),
                source
            );
            return Err(ExchangeError::Persistence {
                order: Box::new(order),
                trades: report.trades,
                source,
            });
        }

        Ok(PlacementResult {
            order,
            trades: report.trades,
        })
    }

    pub async fn cancel_order(&self, symbol: &str, order_id: &str) -> Result<Order> {
        let order = self.matcher.cancel_order(symbol, order_id).await?;

        if let Err(source) = self.upsert_order(&order).await {
            error!("Cancelled order {} was not stored: {}", order.id, source);
            return Err(ExchangeError::Persistence {
                order: Box::new(order),
                trades: Vec::new(),
                source,
            });
        }
        Ok(order)
    }

    pub async fn order_book(&self, symbol: &str) -> Result<OrderBook> {
        Ok(self.matcher.get_order_book(symbol).await?)
    }

    pub async fn order(&self, order_id: &str) -> Result<Order> {
        Ok(self.bounded("get order", self.orders.get_by_id(order_id)).await?)
    }

    pub async fn user_orders(&self, user_id: &str) -> Result<Vec<Order>> {
        Ok(self
            .bounded("get user orders", self.orders.get_by_user_id(user_id))
            .await?)
    }

    pub async fn trades_for_order(&self, order_id: &str) -> Result<Vec<Trade>> {
        Ok(self
            .bounded("get order trades", self.trades.get_by_order_id(order_id))
            .await?)
    }

    pub async fn recent_trades(&self, limit: usize) -> Result<Vec<Trade>> {
        Ok(self
            .bounded("get recent trades", self.trades.get_recent_trades(limit))
            .await?)
    }

    /// Attempt every write and report the first failure
    async fn persist(&self, order: &Order, report: &MatchReport) -> RepositoryResult<()> {
        let mut first_error = None;

        let mut note = |result: RepositoryResult<()>| {
            if let Err(e) = result {
                error!("Write failed: {}", e);
                first_error.get_or_insert(e);
            }
        };

        note(self.upsert_order(order).await);
        for maker in &report.makers {
            note(self.upsert_order(maker).await);
        }
        for trade in &report.trades {
            note(self.bounded("save trade", self.trades.save(trade)).await);
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Store the latest state of `order`
    ///
    /// Placements on one symbol persist concurrently, so a maker's writes
    /// can land out of order. A stale write lost to a newer one is fine.
    async fn upsert_order(&self, order: &Order) -> RepositoryResult<()> {
        match self.bounded("update order", self.orders.update(order)).await {
            Err(e) if e.is_not_found() => self.bounded("save order", self.orders.save(order)).await,
            Err(e) if e.is_stale() => {
                debug!("Skipped stale write: {}", e);
                Ok(())
            }
            other => other,
        }
    }

    async fn bounded<F, R>(&self, operation: &str, call: F) -> RepositoryResult<R>
    where
        F: Future<Output = RepositoryResult<R>>,
    {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .unwrap_or_else(|_| {
                Err(RepositoryError::Unavailable(format!(
                    "{} timed out after {}ms",
                    operation,
                    self.request_timeout.as_millis()
                )))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::MatchingEngine;
    use crate::infrastructure::{InMemoryOrderRepository, InMemoryTradeRepository};
    use exchange_clock::ManualClock;
    use exchange_core::Side;
    use exchange_ports::{Clock, MatchingError};
    use rust_decimal_macros::dec;

    type Service = TradingService<MatchingEngine, InMemoryOrderRepository, InMemoryTradeRepository>;

    fn service() -> (Service, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at_epoch());
        let engine = Arc::new(MatchingEngine::with_symbols(clock.clone(), ["BTCUSD"]));
        let service = TradingService::new(
            engine,
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(InMemoryTradeRepository::new()),
            &ServiceConfig::default(),
        );
        (service, clock)
    }

    #[tokio::test]
    async fn test_place_order_persists_everything() {
        let (service, clock) = service();
        let sell =
            Order::new_limit("s-1", "alice", "BTCUSD", Side::Sell, dec!(100), dec!(3), clock.now())
                .unwrap();
        service.place_order(sell).await.unwrap();

        let buy = Order::new_limit("b-1", "bob", "BTCUSD", Side::Buy, dec!(100), dec!(1), clock.now())
            .unwrap();
        let placed = service.place_order(buy).await.unwrap();

        assert_eq!(placed.order.status, OrderStatus::Filled);
        assert_eq!(placed.trades.len(), 1);

        let stored_buy = service.order("b-1").await.unwrap();
        assert_eq!(stored_buy, placed.order);
        let stored_sell = service.order("s-1").await.unwrap();
        assert_eq!(stored_sell.status, OrderStatus::Partial);
        assert_eq!(stored_sell.quantity, dec!(2));

        assert_eq!(service.trades_for_order("s-1").await.unwrap(), placed.trades);
        assert_eq!(service.recent_trades(10).await.unwrap(), placed.trades);
        assert_eq!(service.user_orders("alice").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refused_order_is_not_stored() {
        let (service, clock) = service();
        let order =
            Order::new_limit("x-1", "alice", "XRPUSD", Side::Buy, dec!(1), dec!(1), clock.now())
                .unwrap();

        let err = service.place_order(order).await.unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::Matching(MatchingError::SymbolNotFound(_))
        ));
        assert!(!err.is_post_match());

        let err = service.order("x-1").await.unwrap_err();
        assert!(matches!(err, ExchangeError::Repository(e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_cancel_updates_store() {
        let (service, clock) = service();
        let order =
            Order::new_limit("b-1", "bob", "BTCUSD", Side::Buy, dec!(99), dec!(1), clock.now())
                .unwrap();
        service.place_order(order).await.unwrap();

        let cancelled = service.cancel_order("BTCUSD", "b-1").await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(service.order("b-1").await.unwrap().status, OrderStatus::Cancelled);
        assert!(service.order_book("BTCUSD").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_late_maker_write_does_not_regress_store() {
        let (service, clock) = service();
        let mut maker =
            Order::new_limit("s-1", "alice", "BTCUSD", Side::Sell, dec!(100), dec!(2), clock.now())
                .unwrap();
        service.orders.save(&maker).await.unwrap();

        maker.apply_fill(dec!(1)).unwrap();
        let partial = maker.clone();
        maker.apply_fill(dec!(1)).unwrap();

        // The fill that completed the maker is stored first
        service.upsert_order(&maker).await.unwrap();
        service.upsert_order(&partial).await.unwrap();

        let stored = service.order("s-1").await.unwrap();
        assert_eq!(stored.status, OrderStatus::Filled);
        assert_eq!(stored.quantity, dec!(0));
        assert_eq!(stored.filled_quantity, dec!(2));
    }
}
