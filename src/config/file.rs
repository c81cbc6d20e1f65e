//! TOML run configuration file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::PriorityMode;
use crate::driver::RampStage;
use crate::error::LoadTestError;

/// Every field is optional; anything left out falls back to the profile
/// or the command line.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub url: Option<String>,
    pub profile: Option<String>,
    pub start_vus: Option<u32>,
    pub stages: Option<Vec<RampStage>>,
    #[serde(default, with = "humantime_serde")]
    pub pause: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub graceful_stop: Option<Duration>,
    /// metric name -> expressions on that metric
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub payload: PayloadSection,
    pub report_interval: Option<u64>,
    pub summary_export: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PayloadSection {
    pub priority: Option<PriorityMode>,
    pub seed: Option<u64>,
    pub data: Option<Value>,
    pub fixture: Option<PathBuf>,
    pub data_as_string: Option<bool>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> Result<Self, LoadTestError> {
        let raw = std::fs::read_to_string(path).map_err(|source| LoadTestError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        let mut file: Self = toml::from_str(&raw).map_err(|source| LoadTestError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        // fixture paths are relative to the config file
        if let (Some(fixture), Some(dir)) = (&file.payload.fixture, path.parent()) {
            if fixture.is_relative() {
                file.payload.fixture = Some(dir.join(fixture));
            }
        }

        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_full_file() {
        let raw = r#"
            url = "http://127.0.0.1:3333/push"
            start_vus = 0
            pause = "250ms"
            graceful_stop = "5s"
            stages = [
                { duration = "30s", target = 15 },
                { duration = "1m", target = 15 },
                { duration = "20s", target = 0 },
            ]

            [thresholds]
            http_req_duration = ["p(99) < 3000", "avg < 500"]
            http_req_failed = ["rate < 0.01"]

            [payload]
            priority = "random"
            seed = 7
            data = { kind = "email", to = "a@b.c" }
            data_as_string = true
        "#;

        let file: ConfigFile = toml::from_str(raw).unwrap();
        assert_eq!(file.url.as_deref(), Some("http://127.0.0.1:3333/push"));
        assert_eq!(file.start_vus, Some(0));
        assert_eq!(file.pause, Some(Duration::from_millis(250)));
        assert_eq!(file.timeout, None);
        let stages = file.stages.unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[1], RampStage::new(Duration::from_secs(60), 15));
        assert_eq!(file.thresholds["http_req_duration"].len(), 2);
        assert_eq!(file.payload.priority, Some(PriorityMode::Random));
        assert_eq!(file.payload.seed, Some(7));
        assert_eq!(file.payload.data_as_string, Some(true));
    }

    #[test]
    fn test_fixed_priority_and_unknown_keys() {
        let file: ConfigFile = toml::from_str("[payload]\npriority = 3").unwrap();
        assert_eq!(file.payload.priority, Some(PriorityMode::Fixed(3)));

        assert!(toml::from_str::<ConfigFile>("urll = \"x\"").is_err());
        assert!(toml::from_str::<ConfigFile>("[payload]\npriority = \"often\"").is_err());
    }

    #[test]
    fn test_fixture_path_is_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("load.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "[payload]\nfixture = \"messages.json\"").unwrap();

        let file = ConfigFile::load(&path).unwrap();
        assert_eq!(file.payload.fixture, Some(dir.path().join("messages.json")));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            ConfigFile::load(Path::new("/nonexistent/load.toml")),
            Err(LoadTestError::ConfigFile { .. })
        ));
    }
}
