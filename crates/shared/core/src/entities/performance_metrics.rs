use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Derived performance snapshot
///
/// Not produced by the engine; a metrics calculator builds it from
/// observed activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub orders_per_second: f64,
    pub average_latency_ms: f64,
    pub system_load_percent: f64,
    pub optimization_score: f64,
}

impl PerformanceMetrics {
    pub fn new(
        orders_per_second: f64,
        average_latency_ms: f64,
        system_load_percent: f64,
        optimization_score: f64,
    ) -> ValidationResult<Self> {
        let metrics = Self {
            orders_per_second,
            average_latency_ms,
            system_load_percent,
            optimization_score,
        };
        metrics.validate()?;
        Ok(metrics)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        if self.orders_per_second.is_nan() || self.orders_per_second < 0.0 {
            return Err(ValidationError::NegativeThroughput);
        }
        if self.average_latency_ms.is_nan() || self.average_latency_ms < 0.0 {
            return Err(ValidationError::NegativeLatency);
        }
        if !(0.0..=100.0).contains(&self.system_load_percent) {
            return Err(ValidationError::LoadOutOfRange);
        }
        if !(0.0..=100.0).contains(&self.optimization_score) {
            return Err(ValidationError::ScoreOutOfRange);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Light load, low latency and a good score
    pub fn is_healthy(&self) -> bool {
        self.system_load_percent < 80.0
            && self.average_latency_ms < 100.0
            && self.optimization_score > 70.0
    }

    /// Throughput weighted by score per unit of latency-load
    ///
    /// Zero when latency or load is zero, since the ratio is undefined.
    pub fn calculate_efficiency(&self) -> f64 {
        let denominator = self.average_latency_ms * self.system_load_percent / 100.0;
        if denominator == 0.0 {
            return 0.0;
        }
        (self.orders_per_second * self.optimization_score) / denominator
    }
}
