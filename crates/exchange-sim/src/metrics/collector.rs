//! Sliding-window collector for order and trade events

use chrono::Duration;
use exchange_core::{
    Order, OrderId, OrderType, Price, Quantity, Side, Symbol, Timestamp, Trade, TradeId,
};
use exchange_ports::{Clock, MetricsResult};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration as Latency;
use tokio::sync::RwLock;

use super::window_seconds;

/// One order passing through the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEvent {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Quantity,
    pub price: Price,
    pub timestamp: Timestamp,
    pub latency: Latency,
}

impl OrderEvent {
    /// Build from an order as submitted, before matching mutated it
    pub fn from_order(order: &Order, timestamp: Timestamp, latency: Latency) -> Self {
        Self {
            order_id: order.id.clone(),
            symbol: order.symbol.clone(),
            side: order.side,
            order_type: order.order_type,
            quantity: order.original_quantity(),
            price: order.price,
            timestamp,
            latency,
        }
    }
}

/// One executed trade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeEvent {
    pub trade_id: TradeId,
    pub symbol: Symbol,
    pub quantity: Quantity,
    pub price: Price,
    pub timestamp: Timestamp,
    pub latency: Latency,
    pub buy_order_id: OrderId,
    pub sell_order_id: OrderId,
}

impl TradeEvent {
    pub fn from_trade(trade: &Trade, latency: Latency) -> Self {
        Self {
            trade_id: trade.id.clone(),
            symbol: trade.symbol.clone(),
            quantity: trade.quantity,
            price: trade.price,
            timestamp: trade.timestamp,
            latency,
            buy_order_id: trade.buy_order_id.clone(),
            sell_order_id: trade.sell_order_id.clone(),
        }
    }
}

/// Per-symbol figures inside a snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolMetrics {
    pub symbol: Symbol,
    pub order_count: u64,
    pub trade_count: u64,
    pub volume: Quantity,
    pub avg_price: Option<Price>,
    pub high_price: Option<Price>,
    pub low_price: Option<Price>,
    /// Price of the most recent trade
    pub last_price: Option<Price>,
    pub avg_latency: Latency,
}

impl SymbolMetrics {
    fn empty(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            order_count: 0,
            trade_count: 0,
            volume: Decimal::ZERO,
            avg_price: None,
            high_price: None,
            low_price: None,
            last_price: None,
            avg_latency: Latency::ZERO,
        }
    }
}

/// Aggregated figures over `[window_start, window_end]`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    pub order_count: u64,
    pub trade_count: u64,
    pub total_volume: Quantity,
    pub avg_latency: Latency,
    pub max_latency: Latency,
    pub min_latency: Latency,
    pub orders_per_sec: f64,
    pub trades_per_sec: f64,
    pub volume_per_sec: f64,
    pub symbol_metrics: BTreeMap<Symbol, SymbolMetrics>,
}

#[derive(Debug, Default)]
struct EventLog {
    orders: VecDeque<OrderEvent>,
    trades: VecDeque<TradeEvent>,
}

impl EventLog {
    fn prune(&mut self, cutoff: Timestamp) {
        self.orders.retain(|e| e.timestamp >= cutoff);
        self.trades.retain(|e| e.timestamp >= cutoff);
    }
}

/// Real-time metrics over a sliding window
///
/// Events older than the retention window are dropped each time a new
/// one is recorded, so memory stays proportional to recent activity.
pub struct RealTimeMetrics {
    window: Duration,
    clock: Arc<dyn Clock>,
    log: RwLock<EventLog>,
}

impl RealTimeMetrics {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            clock,
            log: RwLock::new(EventLog::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub async fn record_order(&self, event: OrderEvent) {
        let cutoff = self.clock.now() - self.window;
        let mut log = self.log.write().await;
        log.orders.push_back(event);
        log.prune(cutoff);
    }

    pub async fn record_trade(&self, event: TradeEvent) {
        let cutoff = self.clock.now() - self.window;
        let mut log = self.log.write().await;
        log.trades.push_back(event);
        log.prune(cutoff);
    }

    /// Aggregate the events in `[now - window, now]`
    pub async fn calculate_metrics(&self, window: Duration) -> MetricsResult<MetricsSnapshot> {
        let seconds = window_seconds(window)?;

        let window_end = self.clock.now();
        let window_start = window_end - window;
        let in_window = |ts: &Timestamp| *ts >= window_start && *ts <= window_end;

        let log = self.log.read().await;
        let mut latencies = Vec::new();
        let mut symbols: BTreeMap<Symbol, SymbolAccumulator> = BTreeMap::new();
        let mut order_count = 0u64;
        let mut trade_count = 0u64;
        let mut total_volume = Decimal::ZERO;

        for event in log.orders.iter().filter(|e| in_window(&e.timestamp)) {
            order_count += 1;
            latencies.push(event.latency);
            let acc = symbols.entry(event.symbol.clone()).or_default();
            acc.order_count += 1;
            acc.latencies.push(event.latency);
        }

        for event in log.trades.iter().filter(|e| in_window(&e.timestamp)) {
            trade_count += 1;
            total_volume += event.quantity;
            latencies.push(event.latency);
            let acc = symbols.entry(event.symbol.clone()).or_default();
            acc.trade_count += 1;
            acc.volume += event.quantity;
            acc.latencies.push(event.latency);
            acc.record_price(event.price, event.timestamp);
        }
        drop(log);

        let (avg_latency, max_latency, min_latency) = latency_stats(&latencies);

        Ok(MetricsSnapshot {
            window_start,
            window_end,
            order_count,
            trade_count,
            total_volume,
            avg_latency,
            max_latency,
            min_latency,
            orders_per_sec: order_count as f64 / seconds,
            trades_per_sec: trade_count as f64 / seconds,
            volume_per_sec: total_volume.to_f64().unwrap_or(0.0) / seconds,
            symbol_metrics: symbols
                .into_iter()
                .map(|(symbol, acc)| {
                    let metrics = acc.finish(&symbol);
                    (symbol, metrics)
                })
                .collect(),
        })
    }

    /// Snapshot over the retention window
    pub async fn current_metrics(&self) -> MetricsResult<MetricsSnapshot> {
        self.calculate_metrics(self.window).await
    }

    pub async fn reset(&self) {
        let mut log = self.log.write().await;
        log.orders.clear();
        log.trades.clear();
    }
}

#[derive(Default)]
struct SymbolAccumulator {
    order_count: u64,
    trade_count: u64,
    volume: Quantity,
    price_sum: Decimal,
    high: Option<Price>,
    low: Option<Price>,
    last: Option<(Timestamp, Price)>,
    latencies: Vec<Latency>,
}

impl SymbolAccumulator {
    fn record_price(&mut self, price: Price, at: Timestamp) {
        self.price_sum += price;
        self.high = Some(self.high.map_or(price, |h| h.max(price)));
        self.low = Some(self.low.map_or(price, |l| l.min(price)));
        // Equal timestamps keep the later-recorded trade
        if self.last.is_none_or(|(ts, _)| at >= ts) {
            self.last = Some((at, price));
        }
    }

    fn finish(self, symbol: &str) -> SymbolMetrics {
        let mut metrics = SymbolMetrics::empty(symbol);
        metrics.order_count = self.order_count;
        metrics.trade_count = self.trade_count;
        metrics.volume = self.volume;
        if self.trade_count > 0 {
            metrics.avg_price = Some(self.price_sum / Decimal::from(self.trade_count));
        }
        metrics.high_price = self.high;
        metrics.low_price = self.low;
        metrics.last_price = self.last.map(|(_, price)| price);
        metrics.avg_latency = latency_stats(&self.latencies).0;
        metrics
    }
}

/// (average, max, min); all zero for no samples
fn latency_stats(latencies: &[Latency]) -> (Latency, Latency, Latency) {
    let (Some(max), Some(min)) = (latencies.iter().max(), latencies.iter().min()) else {
        return (Latency::ZERO, Latency::ZERO, Latency::ZERO);
    };
    let total: Latency = latencies.iter().sum();
    (total / latencies.len() as u32, *max, *min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_clock::ManualClock;
    use exchange_ports::MetricsError;
    use rust_decimal_macros::dec;

    fn collector() -> (RealTimeMetrics, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at_epoch());
        clock.advance(Duration::hours(1));
        (RealTimeMetrics::new(Duration::seconds(60), clock.clone()), clock)
    }

    fn trade_event(symbol: &str, price: Price, qty: Quantity, at: Timestamp, ms: u64) -> TradeEvent {
        let trade = Trade::new_with_time("b", "s", symbol, price, qty, at).unwrap();
        TradeEvent::from_trade(&trade, Latency::from_millis(ms))
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let (metrics, clock) = collector();
        let snapshot = metrics.current_metrics().await.unwrap();

        assert_eq!(snapshot.order_count, 0);
        assert_eq!(snapshot.avg_latency, Latency::ZERO);
        assert_eq!(snapshot.window_end, clock.now());
        assert!(snapshot.symbol_metrics.is_empty());
    }

    #[tokio::test]
    async fn test_aggregates_orders_and_trades() {
        let (metrics, clock) = collector();
        let now = clock.now();
        let order = Order::new_limit("o-1", "u", "BTCUSD", Side::Buy, dec!(100), dec!(2), now)
            .unwrap();
        metrics
            .record_order(OrderEvent::from_order(&order, now, Latency::from_millis(4)))
            .await;
        metrics
            .record_trade(trade_event("BTCUSD", dec!(100), dec!(1), now, 2))
            .await;
        metrics
            .record_trade(trade_event("BTCUSD", dec!(110), dec!(3), now, 6))
            .await;

        let snapshot = metrics.calculate_metrics(Duration::seconds(10)).await.unwrap();

        assert_eq!(snapshot.order_count, 1);
        assert_eq!(snapshot.trade_count, 2);
        assert_eq!(snapshot.total_volume, dec!(4));
        assert_eq!(snapshot.avg_latency, Latency::from_millis(4));
        assert_eq!(snapshot.max_latency, Latency::from_millis(6));
        assert_eq!(snapshot.min_latency, Latency::from_millis(2));
        assert!((snapshot.trades_per_sec - 0.2).abs() < 1e-9);
        assert!((snapshot.volume_per_sec - 0.4).abs() < 1e-9);

        let btc = &snapshot.symbol_metrics["BTCUSD"];
        assert_eq!(btc.order_count, 1);
        assert_eq!(btc.volume, dec!(4));
        assert_eq!(btc.avg_price, Some(dec!(105)));
        assert_eq!(btc.high_price, Some(dec!(110)));
        assert_eq!(btc.low_price, Some(dec!(100)));
        assert_eq!(btc.last_price, Some(dec!(110)));
    }

    #[tokio::test]
    async fn test_sub_millisecond_window_rates() {
        let (metrics, clock) = collector();
        metrics
            .record_trade(trade_event("BTCUSD", dec!(100), dec!(2), clock.now(), 1))
            .await;

        let snapshot = metrics
            .calculate_metrics(Duration::microseconds(250))
            .await
            .unwrap();
        assert_eq!(snapshot.trade_count, 1);
        assert!((snapshot.trades_per_sec - 4000.0).abs() < 1e-6);
        assert!((snapshot.volume_per_sec - 8000.0).abs() < 1e-6);
        assert!(snapshot.orders_per_sec.is_finite());
    }

    #[tokio::test]
    async fn test_last_price_follows_trade_time() {
        let (metrics, clock) = collector();
        let now = clock.now();
        metrics
            .record_trade(trade_event("ETHUSD", dec!(20), dec!(1), now, 1))
            .await;
        metrics
            .record_trade(trade_event("ETHUSD", dec!(10), dec!(1), now - Duration::seconds(5), 1))
            .await;

        let snapshot = metrics.current_metrics().await.unwrap();
        assert_eq!(snapshot.symbol_metrics["ETHUSD"].last_price, Some(dec!(20)));
    }

    #[tokio::test]
    async fn test_old_events_are_pruned() {
        let (metrics, clock) = collector();
        metrics
            .record_trade(trade_event("BTCUSD", dec!(100), dec!(1), clock.now(), 1))
            .await;

        clock.advance(Duration::seconds(61));
        metrics
            .record_trade(trade_event("BTCUSD", dec!(101), dec!(1), clock.now(), 1))
            .await;

        let snapshot = metrics.calculate_metrics(Duration::hours(2)).await.unwrap();
        assert_eq!(snapshot.trade_count, 1);
        assert_eq!(snapshot.symbol_metrics["BTCUSD"].last_price, Some(dec!(101)));
    }

    #[tokio::test]
    async fn test_invalid_window_and_reset() {
        let (metrics, clock) = collector();
        metrics
            .record_trade(trade_event("BTCUSD", dec!(100), dec!(1), clock.now(), 1))
            .await;

        assert!(matches!(
            metrics.calculate_metrics(Duration::zero()).await,
            Err(MetricsError::InvalidWindow(_))
        ));
        assert!(matches!(
            metrics.calculate_metrics(Duration::nanoseconds(10)).await,
            Err(MetricsError::InvalidWindow(_))
        ));

        metrics.reset().await;
        assert_eq!(metrics.current_metrics().await.unwrap().trade_count, 0);
    }
}
