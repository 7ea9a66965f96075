//! Trend, prediction and bottleneck analysis over metrics snapshots

use exchange_core::Timestamp;
use serde::Serialize;
use std::fmt;
use std::time::Duration as Latency;

use super::collector::MetricsSnapshot;
use crate::infrastructure::AnalysisConfig;

/// Smoothing factor for throughput prediction
const SMOOTHING_ALPHA: f64 = 0.3;
/// Slope must exceed this share of one standard deviation to count as a trend
const TREND_SENSITIVITY: f64 = 0.1;
/// Buffered events above which the collector is under memory pressure
const EVENT_PRESSURE: u64 = 10_000;
const URGENT_SEVERITY: f64 = 0.8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrendDirection {
    Up,
    Down,
    #[default]
    Flat,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Up => write!(f, "UP"),
            TrendDirection::Down => write!(f, "DOWN"),
            TrendDirection::Flat => write!(f, "FLAT"),
        }
    }
}

/// Latency trend over the snapshot history
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyAnalysis {
    pub trend: TrendDirection,
    pub current: Latency,
    pub predicted: Latency,
    pub p50: Latency,
    pub p95: Latency,
    pub p99: Latency,
}

/// Orders plus trades per second, now and next
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThroughputPrediction {
    pub trend: TrendDirection,
    pub current: f64,
    pub predicted: f64,
    pub max_observed: f64,
    /// 0 to 1, higher when the slope is steady
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BottleneckKind {
    HighLatency,
    LowThroughput,
    MemoryPressure,
    LatencyVariance,
}

impl BottleneckKind {
    pub fn component(&self) -> &'static str {
        match self {
            BottleneckKind::HighLatency => "MATCHING_ENGINE",
            BottleneckKind::LowThroughput => "ORDER_ENTRY",
            BottleneckKind::MemoryPressure => "METRICS_COLLECTOR",
            BottleneckKind::LatencyVariance => "SYSTEM_LOAD",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            BottleneckKind::HighLatency => "average latency is above the threshold",
            BottleneckKind::LowThroughput => "throughput is below the expected rate",
            BottleneckKind::MemoryPressure => "the collector is buffering a large number of events",
            BottleneckKind::LatencyVariance => "latency spread between fastest and slowest is wide",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bottleneck {
    pub kind: BottleneckKind,
    /// 0 to 1
    pub severity: f64,
    pub component: &'static str,
    pub description: &'static str,
}

impl Bottleneck {
    fn new(kind: BottleneckKind, severity: f64) -> Self {
        Self {
            kind,
            severity: severity.clamp(0.0, 1.0),
            component: kind.component(),
            description: kind.description(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceAnalysis {
    pub timestamp: Timestamp,
    pub latency: LatencyAnalysis,
    pub throughput: ThroughputPrediction,
    pub bottlenecks: Vec<Bottleneck>,
    pub recommendations: Vec<String>,
}

/// Statistical analysis of a snapshot history
///
/// Trends come from a least-squares slope over the most recent
/// `trend_window` snapshots, compared against a tenth of their standard
/// deviation. Throughput is forecast with exponential smoothing.
#[derive(Debug, Clone)]
pub struct PerformanceAnalyzer {
    latency_threshold: Latency,
    throughput_threshold: f64,
    bottleneck_ratio: f64,
    trend_window: usize,
}

impl PerformanceAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            latency_threshold: config.latency_threshold(),
            throughput_threshold: config.throughput_threshold,
            bottleneck_ratio: config.bottleneck_ratio,
            trend_window: config.trend_window.max(2),
        }
    }

    pub fn analyze_latency(&self, history: &[MetricsSnapshot]) -> LatencyAnalysis {
        let Some(last) = history.last() else {
            return LatencyAnalysis::default();
        };

        let nanos: Vec<f64> = history
            .iter()
            .map(|s| s.avg_latency.as_nanos() as f64)
            .collect();
        let trend = self.trend(&nanos);
        let predicted = match trend {
            TrendDirection::Flat => last.avg_latency,
            _ => nanos_to_latency(nanos[nanos.len() - 1] + slope(&nanos)),
        };

        let mut sorted: Vec<Latency> = history.iter().map(|s| s.avg_latency).collect();
        sorted.sort();

        LatencyAnalysis {
            trend,
            current: last.avg_latency,
            predicted,
            p50: percentile(&sorted, 0.50),
            p95: percentile(&sorted, 0.95),
            p99: percentile(&sorted, 0.99),
        }
    }

    pub fn predict_throughput(&self, history: &[MetricsSnapshot]) -> ThroughputPrediction {
        let rates: Vec<f64> = history.iter().map(throughput).collect();
        let Some(&current) = rates.last() else {
            return ThroughputPrediction::default();
        };

        ThroughputPrediction {
            trend: self.trend(&rates),
            current,
            predicted: smoothed_forecast(&rates, SMOOTHING_ALPHA),
            max_observed: rates.iter().copied().fold(0.0, f64::max),
            confidence: trend_confidence(&rates),
        }
    }

    pub fn detect_bottlenecks(&self, snapshot: &MetricsSnapshot) -> Vec<Bottleneck> {
        let mut found = Vec::new();
        let threshold = self.latency_threshold.as_secs_f64();

        if snapshot.avg_latency > self.latency_threshold {
            let severity = capped_ratio(snapshot.avg_latency.as_secs_f64(), 2.0 * threshold);
            found.push(Bottleneck::new(BottleneckKind::HighLatency, severity));
        }

        let rate = throughput(snapshot);
        if rate < self.throughput_threshold * self.bottleneck_ratio {
            let severity = 1.0 - rate / self.throughput_threshold;
            found.push(Bottleneck::new(BottleneckKind::LowThroughput, severity));
        }

        let events = snapshot.order_count + snapshot.trade_count;
        if events > EVENT_PRESSURE {
            let severity = capped_ratio(events as f64, 2.0 * EVENT_PRESSURE as f64);
            found.push(Bottleneck::new(BottleneckKind::MemoryPressure, severity));
        }

        let spread = snapshot.max_latency.saturating_sub(snapshot.min_latency);
        if spread > self.latency_threshold {
            let severity = capped_ratio(spread.as_secs_f64(), 2.0 * threshold);
            found.push(Bottleneck::new(BottleneckKind::LatencyVariance, severity));
        }

        found
    }

    pub fn recommendations(
        &self,
        latency_trend: TrendDirection,
        throughput_trend: TrendDirection,
        bottlenecks: &[Bottleneck],
    ) -> Vec<String> {
        let mut advice: Vec<&str> = Vec::new();

        if latency_trend == TrendDirection::Up {
            advice.push("Latency is rising: profile the matching path");
            advice.push("Check resource allocation on the engine host");
        }
        if throughput_trend == TrendDirection::Down {
            advice.push("Throughput is falling: spread symbols across more workers");
            advice.push("Review book data structures for hot symbols");
        }

        for bottleneck in bottlenecks {
            match bottleneck.kind {
                BottleneckKind::HighLatency => {
                    if bottleneck.severity > URGENT_SEVERITY {
                        advice.push("URGENT: latency is far above threshold");
                    }
                    advice.push("Review store latency and request timeouts");
                    advice.push("Cache order book snapshots for readers");
                }
                BottleneckKind::LowThroughput => {
                    advice.push("Add order entry capacity");
                    advice.push("Shorten the critical section around matching");
                }
                BottleneckKind::MemoryPressure => {
                    advice.push("Shorten the metrics window");
                    advice.push("Export events to external storage");
                }
                BottleneckKind::LatencyVariance => {
                    advice.push("Investigate jitter between symbols");
                    advice.push("Pin workers to keep resource allocation steady");
                }
            }
        }

        if bottlenecks.is_empty() {
            advice.push("No bottlenecks detected");
            advice.push("Keep monitoring for early signs of degradation");
        }

        advice.into_iter().map(String::from).collect()
    }

    /// Full analysis of `history`, judging bottlenecks on its latest snapshot
    pub fn analyze(&self, history: &[MetricsSnapshot], now: Timestamp) -> PerformanceAnalysis {
        let latency = self.analyze_latency(history);
        let throughput = self.predict_throughput(history);
        let bottlenecks = history
            .last()
            .map(|latest| self.detect_bottlenecks(latest))
            .unwrap_or_default();
        let recommendations =
            self.recommendations(latency.trend, throughput.trend, &bottlenecks);

        PerformanceAnalysis {
            timestamp: now,
            latency,
            throughput,
            bottlenecks,
            recommendations,
        }
    }

    fn trend(&self, values: &[f64]) -> TrendDirection {
        if values.len() < 2 {
            return TrendDirection::Flat;
        }
        let recent = &values[values.len().saturating_sub(self.trend_window)..];
        let rise = slope(recent);
        let threshold = std_dev(recent) * TREND_SENSITIVITY;

        if rise > threshold {
            TrendDirection::Up
        } else if rise < -threshold {
            TrendDirection::Down
        } else {
            TrendDirection::Flat
        }
    }
}

fn throughput(snapshot: &MetricsSnapshot) -> f64 {
    snapshot.orders_per_sec + snapshot.trades_per_sec
}

fn capped_ratio(value: f64, limit: f64) -> f64 {
    if limit <= 0.0 {
        return 1.0;
    }
    (value / limit).min(1.0)
}

// Saturates; NaN becomes zero
fn nanos_to_latency(nanos: f64) -> Latency {
    Latency::from_nanos(nanos.max(0.0).round() as u64)
}

/// Least-squares slope against the sample index
fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let average = mean(values);
    let variance = values
        .iter()
        .map(|v| (v - average) * (v - average))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

fn smoothed_forecast(values: &[f64], alpha: f64) -> f64 {
    let Some((&first, rest)) = values.split_first() else {
        return 0.0;
    };
    if rest.is_empty() {
        return first;
    }
    let smoothed = rest
        .iter()
        .fold(first, |acc, v| alpha * v + (1.0 - alpha) * acc);
    alpha * values[values.len() - 1] + (1.0 - alpha) * smoothed
}

/// Inverse of the coefficient of variation of three-point slopes
fn trend_confidence(values: &[f64]) -> f64 {
    const NEUTRAL: f64 = 0.5;
    if values.len() < 3 {
        return NEUTRAL;
    }
    let slopes: Vec<f64> = values.windows(3).map(slope).collect();
    let average = mean(&slopes);
    if average == 0.0 {
        return NEUTRAL;
    }
    let cv = (std_dev(&slopes) / average).abs();
    (1.0 / (1.0 + cv)).clamp(0.0, 1.0)
}

/// Nearest-rank percentile of an ascending slice
fn percentile(sorted: &[Latency], p: f64) -> Latency {
    if sorted.is_empty() {
        return Latency::ZERO;
    }
    let index = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
    sorted[index]
}
