use async_trait::async_trait;
use chrono::Duration;
use exchange_core::PerformanceMetrics;

use crate::error::MetricsResult;

/// Port for deriving performance figures from engine activity
#[async_trait]
pub trait MetricsCalculator: Send + Sync {
    async fn calculate_orders_per_second(&self, window: Duration) -> MetricsResult<f64>;

    /// Average processing latency in milliseconds
    async fn calculate_average_latency(&self, window: Duration) -> MetricsResult<f64>;

    /// Current load as a percentage in `[0, 100]`
    async fn calculate_system_load(&self) -> MetricsResult<f64>;

    /// Overall score in `[0, 100]`
    async fn calculate_optimization_score(&self, window: Duration) -> MetricsResult<f64>;

    async fn get_performance_metrics(&self, window: Duration) -> MetricsResult<PerformanceMetrics>;
}
