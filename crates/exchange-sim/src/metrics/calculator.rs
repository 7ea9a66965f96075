use async_trait::async_trait;
use chrono::Duration;
use exchange_core::{OrderStatus, PerformanceMetrics};
use exchange_ports::{Clock, MetricsCalculator, MetricsResult, OrderRepository};
use log::debug;
use std::sync::Arc;

use super::collector::RealTimeMetrics;
use super::window_seconds;
use crate::infrastructure::MetricsConfig;

const FILL_WEIGHT: f64 = 0.7;
const LATENCY_WEIGHT: f64 = 0.3;
/// Latency score reaches zero at this multiple of the target
const LATENCY_CEILING: f64 = 10.0;

/// Performance figures derived from stored orders and collected events
pub struct EngineMetricsCalculator<O: OrderRepository> {
    orders: Arc<O>,
    collector: Arc<RealTimeMetrics>,
    clock: Arc<dyn Clock>,
    max_active_orders: usize,
    target_latency_ms: f64,
}

impl<O: OrderRepository> EngineMetricsCalculator<O> {
    pub fn new(
        orders: Arc<O>,
        collector: Arc<RealTimeMetrics>,
        clock: Arc<dyn Clock>,
        config: &MetricsConfig,
    ) -> Self {
        Self {
            orders,
            collector,
            clock,
            max_active_orders: config.max_active_orders.max(1),
            target_latency_ms: config.target_latency_ms,
        }
    }

    /// 100 at or under target, falling linearly to 0 at the ceiling
    fn latency_score(&self, latency_ms: f64) -> f64 {
        if latency_ms <= self.target_latency_ms {
            return 100.0;
        }
        let span = self.target_latency_ms * (LATENCY_CEILING - 1.0);
        let over = latency_ms - self.target_latency_ms;
        (100.0 * (1.0 - over / span)).clamp(0.0, 100.0)
    }
}

#[async_trait]
impl<O: OrderRepository> MetricsCalculator for EngineMetricsCalculator<O> {
    async fn calculate_orders_per_second(&self, window: Duration) -> MetricsResult<f64> {
        let seconds = window_seconds(window)?;
        let now = self.clock.now();
        let orders = self
            .orders
            .get_orders_in_time_range(now - window, now)
            .await?;
        Ok(orders.len() as f64 / seconds)
    }

    async fn calculate_average_latency(&self, window: Duration) -> MetricsResult<f64> {
        window_seconds(window)?;
        let snapshot = self.collector.calculate_metrics(window).await?;
        Ok(snapshot.avg_latency.as_secs_f64() * 1000.0)
    }

    async fn calculate_system_load(&self) -> MetricsResult<f64> {
        let active = self.orders.get_active_orders().await?.len();
        let load = active as f64 / self.max_active_orders as f64 * 100.0;
        Ok(load.min(100.0))
    }

    async fn calculate_optimization_score(&self, window: Duration) -> MetricsResult<f64> {
        window_seconds(window)?;
        let now = self.clock.now();
        let orders = self
            .orders
            .get_orders_in_time_range(now - window, now)
            .await?;

        let terminal = orders.iter().filter(|o| o.status.is_terminal()).count();
        let filled = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Filled)
            .count();
        let fill_ratio = if terminal == 0 {
            1.0
        } else {
            filled as f64 / terminal as f64
        };

        let latency_ms = self.calculate_average_latency(window).await?;
        let score = FILL_WEIGHT * fill_ratio * 100.0 + LATENCY_WEIGHT * self.latency_score(latency_ms);
        Ok(score.clamp(0.0, 100.0))
    }

    async fn get_performance_metrics(&self, window: Duration) -> MetricsResult<PerformanceMetrics> {
        let orders_per_second = self.calculate_orders_per_second(window).await?;
        let average_latency_ms = self.calculate_average_latency(window).await?;
        let system_load_percent = self.calculate_system_load().await?;
        let optimization_score = self.calculate_optimization_score(window).await?;

        debug!(
            "Performance: {:.2} orders/s, {:.3}ms, load {:.1}%, score {:.1}",
            orders_per_second, average_latency_ms, system_load_percent, optimization_score
        );

        Ok(PerformanceMetrics::new(
            orders_per_second,
            average_latency_ms,
            system_load_percent,
            optimization_score,
        )?)
    }
}
