//! Periodic sampling, snapshot history and health reporting

use chrono::Duration;
use exchange_core::Timestamp;
use exchange_ports::{Clock, MetricsResult};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::interval;

use super::analyzer::{PerformanceAnalysis, PerformanceAnalyzer};
use super::collector::{MetricsSnapshot, RealTimeMetrics};
use crate::infrastructure::AnalysisConfig;

/// Point-in-time view of the monitor itself
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthStatus {
    pub running: bool,
    pub healthy: bool,
    pub started_at: Option<Timestamp>,
    pub last_analysis_at: Option<Timestamp>,
    pub history_size: usize,
    pub max_history: usize,
    pub uptime_secs: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub timestamp: Timestamp,
    pub current: MetricsSnapshot,
    pub analysis: Option<PerformanceAnalysis>,
    pub health: HealthStatus,
    pub active_bottlenecks: usize,
}

#[derive(Debug)]
struct MonitorState {
    history: VecDeque<MetricsSnapshot>,
    last_analysis: Option<PerformanceAnalysis>,
    healthy: bool,
    started_at: Option<Timestamp>,
}

/// Samples the collector, keeps a bounded history and analyzes it
///
/// Analysis needs at least two snapshots. A failed sample marks the
/// monitor unhealthy until the next good one.
pub struct MetricsMonitor {
    collector: Arc<RealTimeMetrics>,
    analyzer: PerformanceAnalyzer,
    clock: Arc<dyn Clock>,
    max_history: usize,
    sample_interval: std::time::Duration,
    running: AtomicBool,
    state: RwLock<MonitorState>,
}

impl MetricsMonitor {
    pub fn new(
        collector: Arc<RealTimeMetrics>,
        clock: Arc<dyn Clock>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            collector,
            analyzer: PerformanceAnalyzer::new(config),
            clock,
            max_history: config.history_size.max(1),
            sample_interval: config.sample_interval(),
            running: AtomicBool::new(false),
            state: RwLock::new(MonitorState {
                history: VecDeque::new(),
                last_analysis: None,
                healthy: true,
                started_at: None,
            }),
        }
    }

    /// Take a snapshot over the collector's window and re-run the analysis
    pub async fn sample(&self) -> MetricsResult<MetricsSnapshot> {
        let snapshot = match self.collector.current_metrics().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Metrics sample failed: {}", e);
                self.state.write().await.healthy = false;
                return Err(e);
            }
        };

        let mut state = self.state.write().await;
        state.history.push_back(snapshot.clone());
        while state.history.len() > self.max_history {
            state.history.pop_front();
        }

        if state.history.len() >= 2 {
            let history: Vec<MetricsSnapshot> = state.history.iter().cloned().collect();
            let analysis = self.analyzer.analyze(&history, self.clock.now());
            debug!(
                "Analysis: latency {}, throughput {}, {} bottleneck(s)",
                analysis.latency.trend,
                analysis.throughput.trend,
                analysis.bottlenecks.len()
            );
            state.last_analysis = Some(analysis);
        }
        state.healthy = true;
        Ok(snapshot)
    }

    /// Sample every `sample_interval` until `stop`; None if already running
    pub async fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        {
            let mut state = self.state.write().await;
            state.started_at = Some(self.clock.now());
            state.healthy = true;
        }
        info!(
            "Metrics monitor sampling every {}ms",
            self.sample_interval.as_millis()
        );

        let monitor = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticks = interval(monitor.sample_interval);
            // The first tick fires immediately
            ticks.tick().await;
            loop {
                ticks.tick().await;
                if !monitor.running.load(Ordering::SeqCst) {
                    break;
                }
                let _ = monitor.sample().await;
            }
            debug!("Metrics monitor stopped");
        }))
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn is_healthy(&self) -> bool {
        self.is_running() && self.state.read().await.healthy
    }

    /// Oldest first
    pub async fn history(&self) -> Vec<MetricsSnapshot> {
        self.state.read().await.history.iter().cloned().collect()
    }

    pub async fn analysis(&self) -> Option<PerformanceAnalysis> {
        self.state.read().await.last_analysis.clone()
    }

    pub async fn health_status(&self) -> HealthStatus {
        let running = self.is_running();
        let state = self.state.read().await;
        let uptime = match (running, state.started_at) {
            (true, Some(started)) => self.clock.now() - started,
            _ => Duration::zero(),
        };
        HealthStatus {
            running,
            healthy: state.healthy,
            started_at: state.started_at,
            last_analysis_at: state.last_analysis.as_ref().map(|a| a.timestamp),
            history_size: state.history.len(),
            max_history: self.max_history,
            uptime_secs: uptime.num_seconds(),
        }
    }

    pub async fn summary(&self) -> MetricsResult<MetricsSummary> {
        let current = self.collector.current_metrics().await?;
        let analysis = self.analysis().await;
        let health = self.health_status().await;
        Ok(MetricsSummary {
            timestamp: self.clock.now(),
            active_bottlenecks: analysis.as_ref().map_or(0, |a| a.bottlenecks.len()),
            current,
            analysis,
            health,
        })
    }

    /// Clear the collector, the history and the last analysis
    pub async fn reset(&self) {
        self.collector.reset().await;
        let mut state = self.state.write().await;
        state.history.clear();
        state.last_analysis = None;
    }
}
