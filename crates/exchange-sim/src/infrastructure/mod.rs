pub mod config;
pub mod repositories;

pub use config::{
    AnalysisConfig, ConfigError, EngineConfig, ExchangeConfig, MetricsConfig, ServiceConfig,
};
pub use repositories::{InMemoryOrderRepository, InMemoryTradeRepository};
