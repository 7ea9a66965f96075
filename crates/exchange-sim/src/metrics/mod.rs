//! Runtime metrics: event collection, derived performance figures and
//! trend analysis over sampled snapshots

mod analyzer;
mod calculator;
mod collector;
mod monitor;

pub use analyzer::{
    Bottleneck, BottleneckKind, LatencyAnalysis, PerformanceAnalysis, PerformanceAnalyzer,
    ThroughputPrediction, TrendDirection,
};
pub use calculator::EngineMetricsCalculator;
pub use collector::{MetricsSnapshot, OrderEvent, RealTimeMetrics, SymbolMetrics, TradeEvent};
pub use monitor::{HealthStatus, MetricsMonitor, MetricsSummary};

use chrono::Duration;
use exchange_ports::{MetricsError, MetricsResult};

/// Length of a rate window in seconds, at microsecond resolution
///
/// Windows shorter than one microsecond are refused so rates stay finite.
pub(crate) fn window_seconds(window: Duration) -> MetricsResult<f64> {
    let micros = window
        .num_microseconds()
        .map(|us| us as f64)
        .unwrap_or_else(|| window.num_milliseconds() as f64 * 1000.0);
    if micros < 1.0 {
        return Err(MetricsError::InvalidWindow(format!(
            "window must be at least 1us, got {}ns",
            window.num_nanoseconds().unwrap_or(i64::MIN)
        )));
    }
    Ok(micros / 1_000_000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_seconds() {
        assert_eq!(window_seconds(Duration::seconds(60)).unwrap(), 60.0);
        assert!((window_seconds(Duration::microseconds(500)).unwrap() - 0.0005).abs() < 1e-12);
        assert!((window_seconds(Duration::microseconds(1)).unwrap() - 1e-6).abs() < 1e-15);

        for bad in [Duration::zero(), Duration::nanoseconds(999), Duration::seconds(-5)] {
            assert!(matches!(
                window_seconds(bad),
                Err(MetricsError::InvalidWindow(_))
            ));
        }
    }
}
