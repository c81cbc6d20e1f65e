//! Metric types

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RequestMetrics {
    pub total: u64,
    /// Network errors plus responses outside 200..400
    pub failed: u64,
    pub network_errors: u64,
    pub in_flight: u64,
    pub status_codes: BTreeMap<u16, u64>,
}

impl RequestMetrics {
    pub fn failed_rate(&self) -> f64 {
        ratio(self.failed, self.total)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckCounts {
    pub passes: u64,
    pub fails: u64,
}

impl CheckCounts {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        ratio(self.passes, self.total())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckMetrics {
    pub by_name: BTreeMap<String, CheckCounts>,
}

impl CheckMetrics {
    pub fn totals(&self) -> CheckCounts {
        self.by_name
            .values()
            .fold(CheckCounts::default(), |acc, c| CheckCounts {
                passes: acc.passes + c.passes,
                fails: acc.fails + c.fails,
            })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VuMetrics {
    pub active: u64,
    pub max: u64,
    pub iterations: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemMetrics {
    pub cpu_usage: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TestMetrics {
    pub requests: RequestMetrics,
    pub checks: CheckMetrics,
    pub vus: VuMetrics,
    pub system: SystemMetrics,
}

pub(crate) fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
