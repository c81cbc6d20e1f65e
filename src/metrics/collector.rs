//! Metrics collector - thread-safe collection with latency tracking

use super::types::{CheckCounts, TestMetrics};
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};

/// Responses in this range are not counted as failed requests
pub const EXPECTED_STATUSES: std::ops::Range<u16> = 200..400;

#[derive(Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<TestMetrics>>,
    /// Request latencies in microseconds
    request_latencies: Arc<RwLock<Histogram<u64>>>,
    system: Arc<RwLock<System>>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Self {
        // 3 significant digits, auto-resizing
        let latency_hist = Histogram::new(3).expect("3 significant figures is a valid precision");

        let system = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            metrics: Arc::new(RwLock::new(TestMetrics::default())),
            request_latencies: Arc::new(RwLock::new(latency_hist)),
            system: Arc::new(RwLock::new(system)),
            start_time: Instant::now(),
        }
    }

    pub fn vu_started(&self) {
        let mut metrics = self.metrics.write();
        metrics.vus.active += 1;
        metrics.vus.max = metrics.vus.max.max(metrics.vus.active);
    }

    pub fn vu_stopped(&self) {
        let mut metrics = self.metrics.write();
        metrics.vus.active = metrics.vus.active.saturating_sub(1);
    }

    pub fn iteration_completed(&self) {
        self.metrics.write().vus.iterations += 1;
    }

    pub fn request_started(&self) {
        self.metrics.write().requests.in_flight += 1;
    }

    /// A response arrived, whatever its status
    pub fn request_completed(&self, status: u16, latency: Duration) {
        let mut metrics = self.metrics.write();
        metrics.requests.total += 1;
        metrics.requests.in_flight = metrics.requests.in_flight.saturating_sub(1);
        *metrics.requests.status_codes.entry(status).or_insert(0) += 1;
        if !EXPECTED_STATUSES.contains(&status) {
            metrics.requests.failed += 1;
        }
        drop(metrics);

        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        let _ = self.request_latencies.write().record(micros.max(1));
    }

    /// No response: connection refused, reset, timed out
    pub fn request_errored(&self) {
        let mut metrics = self.metrics.write();
        metrics.requests.total += 1;
        metrics.requests.failed += 1;
        metrics.requests.network_errors += 1;
        metrics.requests.in_flight = metrics.requests.in_flight.saturating_sub(1);
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let mut metrics = self.metrics.write();
        let counts = metrics
            .checks
            .by_name
            .entry(name.to_string())
            .or_insert_with(CheckCounts::default);
        if passed {
            counts.passes += 1;
        } else {
            counts.fails += 1;
        }
    }

    /// Update system metrics (CPU, memory)
    pub fn update_system_metrics(&self) {
        let mut system = self.system.write();
        system.refresh_cpu_all();
        system.refresh_memory();

        let mut metrics = self.metrics.write();
        metrics.system.cpu_usage = system.global_cpu_usage();
        metrics.system.memory_used_mb = system.used_memory() / 1024 / 1024;
        metrics.system.memory_total_mb = system.total_memory() / 1024 / 1024;
    }

    pub fn get_snapshot(&self) -> TestMetrics {
        self.metrics.read().clone()
    }

    pub fn latency_histogram(&self) -> Histogram<u64> {
        self.request_latencies.read().clone()
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        LatencyStats::from_histogram(&self.request_latencies.read())
    }

    pub fn active_vus(&self) -> u64 {
        self.metrics.read().vus.active
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency distribution in milliseconds
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LatencyStats {
    pub min: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: f64,
    pub mean: f64,
    pub count: u64,
}

impl LatencyStats {
    pub fn from_histogram(hist: &Histogram<u64>) -> Self {
        if hist.is_empty() {
            return Self::default();
        }
        Self {
            min: micros_to_ms(hist.min()),
            med: micros_to_ms(hist.value_at_quantile(0.50)),
            p90: micros_to_ms(hist.value_at_quantile(0.90)),
            p95: micros_to_ms(hist.value_at_quantile(0.95)),
            p99: micros_to_ms(hist.value_at_quantile(0.99)),
            max: micros_to_ms(hist.max()),
            mean: hist.mean() / 1000.0,
            count: hist.len(),
        }
    }
}

pub(crate) fn micros_to_ms(micros: u64) -> f64 {
    micros as f64 / 1000.0
}
