mod engine;
mod metrics_matcher;
mod trading_service;

pub use engine::{EngineStats, MatchingEngine};
pub use metrics_matcher::MetricsMatcher;
pub use trading_service::{PlacementResult, TradingService};
