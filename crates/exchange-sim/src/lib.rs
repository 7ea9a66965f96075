//! Simulated exchange
//!
//! Per-symbol price-time matching behind async ports, with in-memory
//! stores of record, sliding-window metrics and a trading service that
//! persists outside the matching critical section.

// Application layer
pub mod application;

// Infrastructure layer
pub mod infrastructure;

// Metrics
pub mod metrics;

// Cross-cutting concerns
pub mod error;

pub use application::{
    EngineStats, MatchingEngine, MetricsMatcher, PlacementResult, TradingService,
};
pub use error::{ExchangeError, Result};
pub use infrastructure::{ExchangeConfig, InMemoryOrderRepository, InMemoryTradeRepository};
pub use metrics::{EngineMetricsCalculator, MetricsMonitor, MetricsSnapshot, RealTimeMetrics};
