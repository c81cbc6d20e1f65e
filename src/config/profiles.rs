use std::time::Duration;

use crate::driver::RampStage;

/// Ramp shape plus default thresholds, selectable by name
#[derive(Debug, Clone, PartialEq)]
pub struct LoadProfile {
    pub name: &'static str,
    pub start_vus: u32,
    pub stages: Vec<RampStage>,
    pub thresholds: Vec<&'static str>,
}

pub const DEFAULT_PROFILE: &str = "ramp";

pub const PROFILE_NAMES: [&str; 3] = ["smoke", "ramp", "stress"];

/// Get a load profile by name, `None` when no profile has that name
pub fn get_load_profile(profile: &str) -> Option<LoadProfile> {
    match profile {
        "smoke" => Some(smoke_profile()),
        "ramp" => Some(ramp_profile()),
        "stress" => Some(stress_profile()),
        _ => None,
    }
}

/// Smoke profile for checking the endpoint answers at all
///
/// - 1 virtual client held for 5 seconds
/// - p99 latency under 3s
pub fn smoke_profile() -> LoadProfile {
    LoadProfile {
        name: "smoke",
        start_vus: 1,
        stages: vec![RampStage::new(Duration::from_secs(5), 1)],
        thresholds: vec!["http_req_duration: p(99) < 3000"],
    }
}

/// Standard ramp used against both queue servers
///
/// - ramp to 15 virtual clients over 30 seconds
/// - hold 15 for 1 minute
/// - ramp down to 0 over 20 seconds
/// - p99 latency under 3s
pub fn ramp_profile() -> LoadProfile {
    LoadProfile {
        name: "ramp",
        start_vus: 1,
        stages: vec![
            RampStage::new(Duration::from_secs(30), 15),
            RampStage::new(Duration::from_secs(60), 15),
            RampStage::new(Duration::from_secs(20), 0),
        ],
        thresholds: vec!["http_req_duration: p(99) < 3000"],
    }
}

/// Stress profile for finding where latency falls apart
///
/// - 50 virtual clients for 2 minutes, then 100 for 1 minute
/// - p99 latency under 3s, under 1% failed requests
pub fn stress_profile() -> LoadProfile {
    LoadProfile {
        name: "stress",
        start_vus: 1,
        stages: vec![
            RampStage::new(Duration::from_secs(30), 50),
            RampStage::new(Duration::from_secs(120), 50),
            RampStage::new(Duration::from_secs(30), 100),
            RampStage::new(Duration::from_secs(60), 100),
            RampStage::new(Duration::from_secs(30), 0),
        ],
        thresholds: vec![
            "http_req_duration: p(99) < 3000",
            "http_req_failed: rate < 0.01",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::ThresholdSpec;

    #[test]
    fn test_profile_thresholds_parse() {
        for profile in [smoke_profile(), ramp_profile(), stress_profile()] {
            for expr in &profile.thresholds {
                assert!(expr.parse::<ThresholdSpec>().is_ok(), "{}", expr);
            }
        }
    }

    #[test]
    fn test_unknown_profile_is_rejected() {
        assert_eq!(get_load_profile("nope"), None);
        assert_eq!(get_load_profile("smok"), None);
        assert_eq!(get_load_profile("Ramp"), None);
    }

    #[test]
    fn test_every_listed_profile_resolves() {
        for name in PROFILE_NAMES {
            assert_eq!(get_load_profile(name).map(|p| p.name), Some(name));
        }
        assert!(PROFILE_NAMES.contains(&DEFAULT_PROFILE));
    }
}
