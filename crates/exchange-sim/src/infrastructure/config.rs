//! Configuration loading for the exchange
//!
//! Settings come from a JSON file or from environment variables layered
//! over defaults:
//! - Engine symbols and book creation policy
//! - Metrics window and capacity figures
//! - Performance analysis thresholds and sampling
//! - Persistence timeout for the trading service

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Longest accepted metrics window, one week
pub const MAX_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;

/// Root configuration for the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Exchange name/identifier
    #[serde(default = "default_exchange_name")]
    pub name: String,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub service: ServiceConfig,
}

/// Matching engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Symbols with a book from startup
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Open a book on first order instead of rejecting unknown symbols
    #[serde(default)]
    pub auto_create_books: bool,
}

/// Metrics collection and scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Active order count treated as 100% load
    #[serde(default = "default_max_active_orders")]
    pub max_active_orders: usize,

    /// Latency at or below which the latency score is perfect
    #[serde(default = "default_target_latency_ms")]
    pub target_latency_ms: f64,
}

/// Performance analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Average latency above this is a bottleneck
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: f64,

    /// Expected orders plus trades per second
    #[serde(default = "default_throughput_threshold")]
    pub throughput_threshold: f64,

    /// Share of the expected throughput below which throughput is a bottleneck
    #[serde(default = "default_bottleneck_ratio")]
    pub bottleneck_ratio: f64,

    /// Most recent snapshots used for trend detection
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,

    #[serde(default = "default_history_size")]
    pub history_size: usize,

    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
}

/// Trading service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Upper bound for each repository call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_exchange_name() -> String {
    "Simulated Exchange".to_string()
}

fn default_symbols() -> Vec<String> {
    vec!["BTCUSD".to_string(), "ETHUSD".to_string()]
}

fn default_window_secs() -> u64 {
    60
}

fn default_max_active_orders() -> usize {
    10_000
}

fn default_target_latency_ms() -> f64 {
    10.0
}

fn default_latency_threshold_ms() -> f64 {
    100.0
}

fn default_throughput_threshold() -> f64 {
    1_000.0
}

fn default_bottleneck_ratio() -> f64 {
    0.7
}

fn default_trend_window() -> usize {
    5
}

fn default_history_size() -> usize {
    100
}

fn default_sample_interval_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: default_exchange_name(),
            engine: EngineConfig::default(),
            metrics: MetricsConfig::default(),
            analysis: AnalysisConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            auto_create_books: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            max_active_orders: default_max_active_orders(),
            target_latency_ms: default_target_latency_ms(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            latency_threshold_ms: default_latency_threshold_ms(),
            throughput_threshold: default_throughput_threshold(),
            bottleneck_ratio: default_bottleneck_ratio(),
            trend_window: default_trend_window(),
            history_size: default_history_size(),
            sample_interval_ms: default_sample_interval_ms(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl MetricsConfig {
    /// Metrics window, capped at `MAX_WINDOW_SECS`
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs.min(MAX_WINDOW_SECS) as i64)
    }
}

impl AnalysisConfig {
    pub fn latency_threshold(&self) -> std::time::Duration {
        std::time::Duration::from_nanos((self.latency_threshold_ms.max(0.0) * 1e6).round() as u64)
    }

    pub fn sample_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sample_interval_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let latency = self.latency_threshold_ms;
        if !latency.is_finite() || latency <= 0.0 {
            return Err(ConfigError::Invalid(
                "latency threshold must be positive".to_string(),
            ));
        }
        let throughput = self.throughput_threshold;
        if !throughput.is_finite() || throughput <= 0.0 {
            return Err(ConfigError::Invalid(
                "throughput threshold must be positive".to_string(),
            ));
        }
        let ratio = self.bottleneck_ratio;
        if ratio.is_nan() || ratio <= 0.0 || ratio > 1.0 {
            return Err(ConfigError::Invalid(
                "bottleneck ratio must be in (0, 1]".to_string(),
            ));
        }
        if self.trend_window < 2 {
            return Err(ConfigError::Invalid(
                "trend window needs at least two snapshots".to_string(),
            ));
        }
        if self.history_size == 0 || self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "analysis history and interval must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServiceConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.request_timeout_ms)
    }
}

impl ExchangeConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, test fixtures)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("EXCHANGE_NAME") {
            self.name = name;
        }
        if let Some(symbols) = lookup("EXCHANGE_SYMBOLS") {
            self.engine.symbols = symbols
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(value) = lookup("EXCHANGE_AUTO_CREATE_BOOKS") {
            self.engine.auto_create_books = parse_env("EXCHANGE_AUTO_CREATE_BOOKS", &value)?;
        }
        if let Some(value) = lookup("METRICS_WINDOW_SECS") {
            self.metrics.window_secs = parse_env("METRICS_WINDOW_SECS", &value)?;
        }
        if let Some(value) = lookup("METRICS_MAX_ACTIVE_ORDERS") {
            self.metrics.max_active_orders = parse_env("METRICS_MAX_ACTIVE_ORDERS", &value)?;
        }
        if let Some(value) = lookup("METRICS_TARGET_LATENCY_MS") {
            self.metrics.target_latency_ms = parse_env("METRICS_TARGET_LATENCY_MS", &value)?;
        }
        if let Some(value) = lookup("ANALYSIS_LATENCY_THRESHOLD_MS") {
            self.analysis.latency_threshold_ms =
                parse_env("ANALYSIS_LATENCY_THRESHOLD_MS", &value)?;
        }
        if let Some(value) = lookup("ANALYSIS_THROUGHPUT_THRESHOLD") {
            self.analysis.throughput_threshold =
                parse_env("ANALYSIS_THROUGHPUT_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("ANALYSIS_HISTORY_SIZE") {
            self.analysis.history_size = parse_env("ANALYSIS_HISTORY_SIZE", &value)?;
        }
        if let Some(value) = lookup("ANALYSIS_SAMPLE_INTERVAL_MS") {
            self.analysis.sample_interval_ms = parse_env("ANALYSIS_SAMPLE_INTERVAL_MS", &value)?;
        }
        if let Some(value) = lookup("REQUEST_TIMEOUT_MS") {
            self.service.request_timeout_ms = parse_env("REQUEST_TIMEOUT_MS", &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.symbols.is_empty() && !self.engine.auto_create_books {
            return Err(ConfigError::Invalid(
                "at least one symbol is required unless books are auto-created".to_string(),
            ));
        }
        if self.engine.symbols.iter().any(|s| s.is_empty()) {
            return Err(ConfigError::Invalid("symbols cannot be empty".to_string()));
        }
        if self.metrics.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "metrics window must be positive".to_string(),
            ));
        }
        if self.metrics.window_secs > MAX_WINDOW_SECS {
            return Err(ConfigError::Invalid(format!(
                "metrics window cannot exceed {} seconds",
                MAX_WINDOW_SECS
            )));
        }
        if self.metrics.max_active_orders == 0 {
            return Err(ConfigError::Invalid(
                "max active orders must be positive".to_string(),
            ));
        }
        let target = self.metrics.target_latency_ms;
        if target.is_nan() || target <= 0.0 {
            return Err(ConfigError::Invalid(
                "target latency must be positive".to_string(),
            ));
        }
        self.analysis.validate()?;
        if self.service.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {error}")]
    Io { path: String, error: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {key}")]
    Env { key: String, value: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ExchangeConfig::default();
        assert_eq!(config.engine.symbols, vec!["BTCUSD", "ETHUSD"]);
        assert!(!config.engine.auto_create_books);
        assert_eq!(config.metrics.window_secs, 60);
        assert_eq!(
            config.analysis.latency_threshold(),
            std::time::Duration::from_millis(100)
        );
        assert_eq!(config.analysis.trend_window, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_json() {
        let json = r#"{
            "name": "Test Venue",
            "engine": { "symbols": ["SOLUSD"] },
            "service": { "request_timeout_ms": 250 }
        }"#;

        let config = ExchangeConfig::from_json(json).unwrap();
        assert_eq!(config.name, "Test Venue");
        assert_eq!(config.engine.symbols, vec!["SOLUSD"]);
        assert_eq!(config.metrics, MetricsConfig::default());
        assert_eq!(
            config.service.request_timeout(),
            std::time::Duration::from_millis(250)
        );
    }

    #[test]
    fn test_parse_rejects_invalid() {
        let result = ExchangeConfig::from_json(r#"{ "metrics": { "window_secs": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = ExchangeConfig::from_json("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let config = ExchangeConfig::default()
            .with_overrides(lookup(&[
                ("EXCHANGE_SYMBOLS", "btcusd, xrpusd,"),
                ("EXCHANGE_AUTO_CREATE_BOOKS", "true"),
                ("METRICS_WINDOW_SECS", "30"),
            ]))
            .unwrap();

        assert_eq!(config.engine.symbols, vec!["BTCUSD", "XRPUSD"]);
        assert!(config.engine.auto_create_books);
        assert_eq!(config.metrics.window(), chrono::Duration::seconds(30));
    }

    #[test]
    fn test_env_rejects_malformed_values() {
        let result = ExchangeConfig::default()
            .with_overrides(lookup(&[("REQUEST_TIMEOUT_MS", "soon")]));

        match result {
            Err(ConfigError::Env { key, value }) => {
                assert_eq!(key, "REQUEST_TIMEOUT_MS");
                assert_eq!(value, "soon");
            }
            other => panic!("expected env error, got {:?}", other),
        }
    }

    #[test]
    fn test_analysis_settings() {
        let json = r#"{ "analysis": { "history_size": 20, "bottleneck_ratio": 0.5 } }"#;
        let config = ExchangeConfig::from_json(json).unwrap();
        assert_eq!(config.analysis.history_size, 20);
        assert_eq!(config.analysis.bottleneck_ratio, 0.5);
        assert_eq!(config.analysis.throughput_threshold, 1_000.0);

        for bad in [
            r#"{ "analysis": { "bottleneck_ratio": 1.5 } }"#,
            r#"{ "analysis": { "trend_window": 1 } }"#,
            r#"{ "analysis": { "latency_threshold_ms": 0 } }"#,
            r#"{ "analysis": { "history_size": 0 } }"#,
        ] {
            assert!(
                matches!(ExchangeConfig::from_json(bad), Err(ConfigError::Invalid(_))),
                "{bad} should be refused"
            );
        }

        let config = ExchangeConfig::default()
            .with_overrides(lookup(&[("ANALYSIS_SAMPLE_INTERVAL_MS", "250")]))
            .unwrap();
        assert_eq!(
            config.analysis.sample_interval(),
            std::time::Duration::from_millis(250)
        );
    }

    #[test]
    fn test_window_upper_bound() {
        let json = format!(r#"{{ "metrics": {{ "window_secs": {} }} }}"#, MAX_WINDOW_SECS);
        let config = ExchangeConfig::from_json(&json).unwrap();
        assert_eq!(config.metrics.window(), chrono::Duration::days(7));

        let json = format!(r#"{{ "metrics": {{ "window_secs": {} }} }}"#, u64::MAX);
        assert!(matches!(
            ExchangeConfig::from_json(&json),
            Err(ConfigError::Invalid(_))
        ));

        let result = ExchangeConfig::default()
            .with_overrides(lookup(&[("METRICS_WINDOW_SECS", "9223372036854775807")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        // Built by hand, skipping validation
        let metrics = MetricsConfig {
            window_secs: u64::MAX,
            ..MetricsConfig::default()
        };
        assert_eq!(metrics.window(), chrono::Duration::days(7));
    }

    #[test]
    fn test_missing_file() {
        let result = ExchangeConfig::from_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
