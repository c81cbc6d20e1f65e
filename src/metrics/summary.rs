//! End-of-run result and its JSON export

use std::path::Path;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;
use uuid::Uuid;

use super::collector::{micros_to_ms, LatencyStats, MetricsCollector};
use super::threshold::{ThresholdOutcome, ThresholdSpec};
use super::types::TestMetrics;

/// Aggregated outcome of one run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    pub target: String,
    pub elapsed: Duration,
    pub metrics: TestMetrics,
    pub latency: LatencyStats,
    pub thresholds: Vec<ThresholdOutcome>,
    histogram: Histogram<u64>,
}

impl RunResult {
    pub fn from_collector(
        target: impl Into<String>,
        elapsed: Duration,
        collector: &MetricsCollector,
    ) -> Self {
        let histogram = collector.latency_histogram();
        Self {
            run_id: Uuid::new_v4(),
            target: target.into(),
            elapsed,
            metrics: collector.get_snapshot(),
            latency: LatencyStats::from_histogram(&histogram),
            thresholds: Vec::new(),
            histogram,
        }
    }

    /// Latency in milliseconds at `quantile` in `[0, 1]`
    pub fn latency_at_quantile(&self, quantile: f64) -> Option<f64> {
        if self.histogram.is_empty() {
            return None;
        }
        let micros = if quantile <= 0.0 {
            self.histogram.min()
        } else if quantile >= 1.0 {
            self.histogram.max()
        } else {
            self.histogram.value_at_quantile(quantile)
        };
        Some(micros_to_ms(micros))
    }

    pub fn latency_mean_ms(&self) -> Option<f64> {
        (!self.histogram.is_empty()).then(|| self.histogram.mean() / 1000.0)
    }

    /// Evaluate every threshold once and keep the outcomes
    pub fn evaluate_thresholds(&mut self, specs: &[ThresholdSpec]) {
        let outcomes: Vec<ThresholdOutcome> =
            specs.iter().map(|spec| spec.evaluate(self)).collect();
        self.thresholds = outcomes;
    }

    pub fn thresholds_passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.passed)
    }

    pub fn failed_checks(&self) -> u64 {
        self.metrics.checks.totals().fails
    }

    pub fn passed_checks(&self) -> u64 {
        self.metrics.checks.totals().passes
    }

    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            run_id: self.run_id.to_string(),
            target: &self.target,
            elapsed_secs: self.elapsed.as_secs_f64(),
            passed: self.thresholds_passed(),
            thresholds: &self.thresholds,
            latency_ms: &self.latency,
            metrics: &self.metrics,
        }
    }

    /// Write the JSON summary to `path`
    pub fn export_summary(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(path, json)
    }
}

/// Serializable view of a [`RunResult`]
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub run_id: String,
    pub target: &'a str,
    pub elapsed_secs: f64,
    pub passed: bool,
    pub thresholds: &'a [ThresholdOutcome],
    pub latency_ms: &'a LatencyStats,
    pub metrics: &'a TestMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_export() {
        let collector = MetricsCollector::new();
        collector.request_started();
        collector.request_completed(200, Duration::from_millis(12));
        collector.record_check("status was 200", true);

        let mut result = RunResult::from_collector(
            "http://127.0.0.1:4433/enqueue",
            Duration::from_secs(1),
            &collector,
        );
        result.evaluate_thresholds(&["http_req_duration: p(99) < 3000".parse().unwrap()]);
        assert!(result.thresholds_passed());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        result.export_summary(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["passed"], serde_json::json!(true));
        assert_eq!(written["metrics"]["requests"]["total"], serde_json::json!(1));
        assert_eq!(
            written["metrics"]["checks"]["by_name"]["status was 200"]["passes"],
            serde_json::json!(1)
        );
        assert_eq!(
            written["thresholds"][0]["expression"],
            serde_json::json!("http_req_duration: p(99) < 3000")
        );
    }

    #[test]
    fn test_no_thresholds_means_pass() {
        let result = RunResult::from_collector("x", Duration::ZERO, &MetricsCollector::new());
        assert!(result.thresholds_passed());
        assert_eq!(result.latency_at_quantile(0.99), None);
    }
}
