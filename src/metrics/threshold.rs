//! Pass/fail assertions over the aggregated run metrics
//!
//! Expressions use the same shape as k6 thresholds, e.g. `p(99) < 3000` on
//! `http_req_duration` or `rate < 0.01` on `http_req_failed`. Durations are in
//! milliseconds, rates are fractions in `[0, 1]`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::summary::RunResult;
use crate::error::ThresholdError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    HttpReqDuration,
    HttpReqFailed,
    Checks,
    HttpReqs,
    Iterations,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Self::HttpReqDuration => "http_req_duration",
            Self::HttpReqFailed => "http_req_failed",
            Self::Checks => "checks",
            Self::HttpReqs => "http_reqs",
            Self::Iterations => "iterations",
        }
    }

    fn supports(&self, aggregation: Aggregation) -> bool {
        use Aggregation::*;
        match self {
            Self::HttpReqDuration => matches!(aggregation, Avg | Min | Med | Max | Percentile(_)),
            Self::HttpReqFailed | Self::Checks => matches!(aggregation, Rate),
            Self::HttpReqs | Self::Iterations => matches!(aggregation, Count | Rate),
        }
    }
}

impl FromStr for Metric {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "http_req_duration" => Ok(Self::HttpReqDuration),
            "http_req_failed" => Ok(Self::HttpReqFailed),
            "checks" => Ok(Self::Checks),
            "http_reqs" => Ok(Self::HttpReqs),
            "iterations" => Ok(Self::Iterations),
            other => Err(ThresholdError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Avg,
    Min,
    Med,
    Max,
    /// Percentile in `[0, 100]`
    Percentile(f64),
    Rate,
    Count,
}

impl FromStr for Aggregation {
    type Err = ThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "avg" => return Ok(Self::Avg),
            "min" => return Ok(Self::Min),
            "med" => return Ok(Self::Med),
            "max" => return Ok(Self::Max),
            "rate" => return Ok(Self::Rate),
            "count" => return Ok(Self::Count),
            _ => {}
        }

        let inner = s
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| ThresholdError::UnknownAggregation(s.to_string()))?;
        let pct: f64 = inner
            .trim()
            .parse()
            .map_err(|_| ThresholdError::Percentile(inner.to_string()))?;
        if !(0.0..=100.0).contains(&pct) {
            return Err(ThresholdError::Percentile(inner.to_string()));
        }
        Ok(Self::Percentile(pct))
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Med => f.write_str("med"),
            Self::Max => f.write_str("max"),
            Self::Percentile(p) => write!(f, "p({})", p),
            Self::Rate => f.write_str("rate"),
            Self::Count => f.write_str("count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operator {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl Operator {
    /// Two-character operators first so `<=` is not read as `<`
    const TOKENS: [(&'static str, Operator); 6] = [
        ("<=", Operator::Le),
        (">=", Operator::Ge),
        ("==", Operator::Eq),
        ("!=", Operator::Ne),
        ("<", Operator::Lt),
        (">", Operator::Gt),
    ];

    pub fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Self::Lt => observed < bound,
            Self::Le => observed <= bound,
            Self::Gt => observed > bound,
            Self::Ge => observed >= bound,
            Self::Eq => (observed - bound).abs() < f64::EPSILON,
            Self::Ne => (observed - bound).abs() >= f64::EPSILON,
        }
    }

    fn symbol(&self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(token, _)| *token)
            .unwrap_or("?")
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A single assertion such as `http_req_duration: p(99) < 3000`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdSpec {
    pub metric: Metric,
    pub aggregation: Aggregation,
    pub operator: Operator,
    pub bound: f64,
}

impl ThresholdSpec {
    /// Parse `expression` as an assertion on `metric`
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ThresholdError> {
        let metric: Metric = metric.parse()?;

        let (lhs, operator, rhs) = Operator::TOKENS
            .iter()
            .find_map(|(token, op)| {
                expression
                    .split_once(token)
                    .map(|(lhs, rhs)| (lhs, *op, rhs))
            })
            .ok_or_else(|| ThresholdError::MissingOperator(expression.to_string()))?;

        let aggregation: Aggregation = lhs.parse()?;
        if !metric.supports(aggregation) {
            return Err(ThresholdError::Unsupported {
                metric: metric.to_string(),
                aggregation: aggregation.to_string(),
            });
        }

        let bound: f64 = rhs
            .trim()
            .parse()
            .map_err(|_| ThresholdError::Bound(rhs.trim().to_string()))?;

        Ok(Self {
            metric,
            aggregation,
            operator,
            bound,
        })
    }

    /// Current value of the aggregated metric, `None` when nothing was sampled
    pub fn observe(&self, result: &RunResult) -> Option<f64> {
        let requests = &result.metrics.requests;
        let elapsed = result.elapsed.as_secs_f64();
        let per_second = |count: u64| (elapsed > 0.0).then(|| count as f64 / elapsed);

        match (self.metric, self.aggregation) {
            (Metric::HttpReqDuration, Aggregation::Avg) => result.latency_mean_ms(),
            (Metric::HttpReqDuration, Aggregation::Min) => result.latency_at_quantile(0.0),
            (Metric::HttpReqDuration, Aggregation::Med) => result.latency_at_quantile(0.5),
            (Metric::HttpReqDuration, Aggregation::Max) => result.latency_at_quantile(1.0),
            (Metric::HttpReqDuration, Aggregation::Percentile(p)) => {
                result.latency_at_quantile(p / 100.0)
            }
            (Metric::HttpReqFailed, _) => (requests.total > 0).then(|| requests.failed_rate()),
            (Metric::Checks, _) => {
                let totals = result.metrics.checks.totals();
                (totals.total() > 0).then(|| totals.pass_rate())
            }
            (Metric::HttpReqs, Aggregation::Count) => Some(requests.total as f64),
            (Metric::HttpReqs, _) => per_second(requests.total),
            (Metric::Iterations, Aggregation::Count) => Some(result.metrics.vus.iterations as f64),
            (Metric::Iterations, _) => per_second(result.metrics.vus.iterations),
            (Metric::HttpReqDuration, _) => None,
        }
    }

    /// Evaluate against the run; a metric with no samples fails its threshold
    pub fn evaluate(&self, result: &RunResult) -> ThresholdOutcome {
        let observed = self.observe(result);
        let passed = observed.is_some_and(|value| self.operator.holds(value, self.bound));
        ThresholdOutcome {
            expression: self.to_string(),
            observed,
            passed,
        }
    }
}

impl FromStr for ThresholdSpec {
    type Err = ThresholdError;

    /// Parses `<metric>: <expression>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (metric, expression) = s
            .split_once(':')
            .ok_or_else(|| ThresholdError::Syntax(s.to_string()))?;
        Self::parse(metric, expression)
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {} {}",
            self.metric, self.aggregation, self.operator, self.bound
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    pub expression: String,
    pub observed: Option<f64>,
    pub passed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::collector::MetricsCollector;
    use std::time::Duration;

    fn result_with(latencies_ms: &[u64], statuses: &[u16]) -> RunResult {
        let collector = MetricsCollector::new();
        for (ms, status) in latencies_ms.iter().zip(statuses) {
            collector.request_started();
            collector.request_completed(*status, Duration::from_millis(*ms));
            collector.record_check("status was 200", *status == 200);
            collector.iteration_completed();
        }
        RunResult::from_collector("http://stub/enqueue", Duration::from_secs(10), &collector)
    }

    #[test]
    fn test_parse_source_threshold() {
        let spec: ThresholdSpec = "http_req_duration: p(99) < 3000".parse().unwrap();
        assert_eq!(spec.metric, Metric::HttpReqDuration);
        assert_eq!(spec.aggregation, Aggregation::Percentile(99.0));
        assert_eq!(spec.operator, Operator::Lt);
        assert_eq!(spec.bound, 3000.0);
        assert_eq!(spec.to_string(), "http_req_duration: p(99) < 3000");
    }

    #[test]
    fn test_parse_two_char_operators() {
        let spec = ThresholdSpec::parse("http_req_failed", "rate<=0.01").unwrap();
        assert_eq!(spec.operator, Operator::Le);
        assert_eq!(spec.bound, 0.01);

        let spec = ThresholdSpec::parse("http_reqs", "count >= 10").unwrap();
        assert_eq!(spec.operator, Operator::Ge);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "latency: p(99) < 3".parse::<ThresholdSpec>(),
            Err(ThresholdError::UnknownMetric("latency".to_string()))
        );
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration", "p(99) 3000"),
            Err(ThresholdError::MissingOperator(_))
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration", "p(101) < 3000"),
            Err(ThresholdError::Percentile(_))
        ));
        assert!(matches!(
            ThresholdSpec::parse("http_req_duration", "rate < 0.1"),
            Err(ThresholdError::Unsupported { .. })
        ));
        assert!(matches!(
            ThresholdSpec::parse("checks", "rate > fast"),
            Err(ThresholdError::Bound(_))
        ));
        assert!(matches!(
            "p(99) < 3000".parse::<ThresholdSpec>(),
            Err(ThresholdError::Syntax(_))
        ));
    }

    #[test]
    fn test_latency_threshold_evaluation() {
        let result = result_with(&[10, 20, 30, 4000], &[200, 200, 200, 200]);

        let max = ThresholdSpec::parse("http_req_duration", "max < 3000").unwrap();
        assert!(!max.evaluate(&result).passed);

        let med = ThresholdSpec::parse("http_req_duration", "med < 100").unwrap();
        assert!(med.evaluate(&result).passed);

        let min = ThresholdSpec::parse("http_req_duration", "min >= 10").unwrap();
        assert!(min.evaluate(&result).passed);
    }

    #[test]
    fn test_rate_thresholds() {
        let result = result_with(&[5, 5, 5, 5], &[200, 200, 500, 500]);

        let checks = ThresholdSpec::parse("checks", "rate > 0.9").unwrap();
        let outcome = checks.evaluate(&result);
        assert_eq!(outcome.observed, Some(0.5));
        assert!(!outcome.passed);

        let failed = ThresholdSpec::parse("http_req_failed", "rate < 0.6").unwrap();
        assert!(failed.evaluate(&result).passed);

        let reqs = ThresholdSpec::parse("http_reqs", "rate == 0.4").unwrap();
        assert!(reqs.evaluate(&result).passed);

        let iterations = ThresholdSpec::parse("iterations", "count != 4").unwrap();
        assert!(!iterations.evaluate(&result).passed);
    }

    #[test]
    fn test_unsampled_metric_fails() {
        let result = result_with(&[], &[]);
        let spec = ThresholdSpec::parse("http_req_duration", "p(99) < 3000").unwrap();
        let outcome = spec.evaluate(&result);
        assert_eq!(outcome.observed, None);
        assert!(!outcome.passed);
    }
}
