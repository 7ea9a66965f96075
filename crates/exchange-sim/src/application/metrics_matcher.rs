use async_trait::async_trait;
use exchange_core::{Order, OrderBook};
use exchange_ports::{Clock, MatchReport, MatchingResult, OrderMatcher};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{OrderEvent, RealTimeMetrics, TradeEvent};

/// Matcher decorator that feeds the metrics collector
///
/// Every `execute` is timed; the order and each resulting trade are
/// recorded with that latency. Refused orders are recorded too.
pub struct MetricsMatcher<M: OrderMatcher> {
    inner: Arc<M>,
    metrics: Arc<RealTimeMetrics>,
    clock: Arc<dyn Clock>,
}

impl<M: OrderMatcher> MetricsMatcher<M> {
    pub fn new(inner: Arc<M>, metrics: Arc<RealTimeMetrics>, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            metrics,
            clock,
        }
    }

    pub fn inner(&self) -> &Arc<M> {
        &self.inner
    }

    pub fn metrics(&self) -> &Arc<RealTimeMetrics> {
        &self.metrics
    }
}

#[async_trait]
impl<M: OrderMatcher> OrderMatcher for MetricsMatcher<M> {
    async fn execute(&self, order: &mut Order) -> MatchingResult<MatchReport> {
        let submitted = order.clone();
        let started = Instant::now();
        let result = self.inner.execute(order).await;
        let latency = started.elapsed();

        self.metrics
            .record_order(OrderEvent::from_order(&submitted, self.clock.now(), latency))
            .await;
        if let Ok(report) = &result {
            for trade in &report.trades {
                self.metrics
                    .record_trade(TradeEvent::from_trade(trade, latency))
                    .await;
            }
        }
        result
    }

    async fn get_order_book(&self, symbol: &str) -> MatchingResult<OrderBook> {
        self.inner.get_order_book(symbol).await
    }

    async fn cancel_order(&self, symbol: &str, order_id: &str) -> MatchingResult<Order> {
        self.inner.cancel_order(symbol, order_id).await
    }
}
