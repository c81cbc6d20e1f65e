//! Run configuration
//!
//! A [`RunConfig`] is resolved once at startup from, in increasing order of
//! precedence: the built-in defaults, a named load profile, an optional TOML
//! file, and command-line flags. Nothing mutates it afterwards.

mod file;
mod profiles;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cli::{RunArgs, Target};
use crate::driver::{
    DataSource, FixedPriority, PayloadFactory, PriorityGenerator, RampSchedule, UniformPriority,
};
use crate::error::LoadTestError;
use crate::metrics::ThresholdSpec;

pub use file::{ConfigFile, PayloadSection};
pub use profiles::{get_load_profile, LoadProfile, DEFAULT_PROFILE, PROFILE_NAMES};

pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);
pub const DEFAULT_REPORT_INTERVAL: u64 = 2;
pub const DEFAULT_PRIORITY: i32 = 1;

/// How each request's priority is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "PriorityValue")]
pub enum PriorityMode {
    Fixed(i32),
    /// Uniform in `[0, 10)`
    Random,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriorityValue {
    Fixed(i32),
    Named(String),
}

impl TryFrom<PriorityValue> for PriorityMode {
    type Error = String;

    fn try_from(value: PriorityValue) -> Result<Self, Self::Error> {
        match value {
            PriorityValue::Fixed(n) => Ok(Self::Fixed(n)),
            PriorityValue::Named(s) => s.parse(),
        }
    }
}

impl FromStr for PriorityMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "random" => Ok(Self::Random),
            other => other
                .parse()
                .map(Self::Fixed)
                .map_err(|_| format!("priority must be an integer or 'random', got '{}'", other)),
        }
    }
}

impl Default for PriorityMode {
    fn default() -> Self {
        Self::Fixed(DEFAULT_PRIORITY)
    }
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "fixed {}", n),
            Self::Random => write!(
                f,
                "uniform [{}, {})",
                UniformPriority::DEFAULT_LOW,
                UniformPriority::DEFAULT_HIGH
            ),
        }
    }
}

/// Where the request `data` field comes from before the fixture is loaded
#[derive(Debug, Clone, PartialEq)]
pub enum DataSetting {
    Literal(Value),
    Fixture(PathBuf),
}

impl Default for DataSetting {
    fn default() -> Self {
        Self::Literal(Value::String("1".to_string()))
    }
}

/// Fully resolved configuration of one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub url: String,
    pub profile: String,
    pub schedule: RampSchedule,
    pub thresholds: Vec<ThresholdSpec>,
    pub priority: PriorityMode,
    pub seed: Option<u64>,
    pub data: DataSetting,
    pub data_as_string: bool,
    pub pause: Duration,
    pub timeout: Duration,
    pub graceful_stop: Duration,
    pub report_interval: u64,
    pub live: bool,
    pub summary_export: Option<PathBuf>,
}

impl RunConfig {
    /// Resolve flags, config file and profile into one configuration
    pub fn from_args(args: &RunArgs) -> Result<Self, LoadTestError> {
        let file = match &args.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        Self::resolve(args, file)
    }

    pub fn resolve(args: &RunArgs, file: ConfigFile) -> Result<Self, LoadTestError> {
        let profile_name = args
            .profile
            .clone()
            .or(file.profile.clone())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let profile = get_load_profile(&profile_name).ok_or_else(|| {
            LoadTestError::Config(format!(
                "unknown profile '{}', expected one of: {}",
                profile_name,
                PROFILE_NAMES.join(", ")
            ))
        })?;

        let url = args
            .url
            .clone()
            .or_else(|| args.target.as_ref().map(Target::url))
            .or(file.url.clone())
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/enqueue", Target::ENQUEUE_PORT));
        validate_url(&url)?;

        let stages = if !args.stages.is_empty() {
            args.stages.clone()
        } else {
            file.stages.clone().unwrap_or_else(|| profile.stages.clone())
        };
        let start_vus = args
            .start_vus
            .or(file.start_vus)
            .unwrap_or(profile.start_vus);
        let schedule = RampSchedule::new(start_vus, stages)?;

        let thresholds = if !args.thresholds.is_empty() {
            args.thresholds
                .iter()
                .map(|expr| expr.parse())
                .collect::<Result<Vec<ThresholdSpec>, _>>()?
        } else if !file.thresholds.is_empty() {
            let mut specs = Vec::new();
            for (metric, exprs) in &file.thresholds {
                for expr in exprs {
                    specs.push(ThresholdSpec::parse(metric, expr)?);
                }
            }
            specs
        } else {
            profile
                .thresholds
                .iter()
                .map(|expr| expr.parse())
                .collect::<Result<Vec<ThresholdSpec>, _>>()?
        };

        let payload = &file.payload;
        let data = if let Some(fixture) = &args.fixture {
            DataSetting::Fixture(fixture.clone())
        } else if let Some(raw) = &args.data {
            DataSetting::Literal(parse_literal(raw))
        } else if let Some(fixture) = &payload.fixture {
            DataSetting::Fixture(fixture.clone())
        } else if let Some(value) = &payload.data {
            DataSetting::Literal(value.clone())
        } else {
            DataSetting::default()
        };

        let timeout = args.timeout.or(file.timeout).unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(LoadTestError::Config("timeout must be greater than zero".to_string()));
        }

        let data_as_string = args.data_as_string
            || payload.data_as_string.unwrap_or(false)
            || args.target.as_ref().is_some_and(Target::wants_string_data);

        Ok(Self {
            url,
            profile: profile.name.to_string(),
            schedule,
            thresholds,
            priority: args.priority.or(payload.priority).unwrap_or_default(),
            seed: args.seed.or(payload.seed),
            data,
            data_as_string,
            pause: args.pause.or(file.pause).unwrap_or(DEFAULT_PAUSE),
            timeout,
            graceful_stop: args
                .graceful_stop
                .or(file.graceful_stop)
                .unwrap_or(DEFAULT_GRACEFUL_STOP),
            report_interval: args
                .report_interval
                .or(file.report_interval)
                .unwrap_or(DEFAULT_REPORT_INTERVAL),
            live: !args.quiet,
            summary_export: args.summary_export.clone().or(file.summary_export),
        })
    }

    pub fn priority_generator(&self) -> Arc<dyn PriorityGenerator> {
        match (self.priority, self.seed) {
            (PriorityMode::Fixed(n), _) => Arc::new(FixedPriority(n)),
            (PriorityMode::Random, Some(seed)) => Arc::new(
                UniformPriority::seeded(
                    UniformPriority::DEFAULT_LOW,
                    UniformPriority::DEFAULT_HIGH,
                    seed,
                )
                .unwrap_or_default(),
            ),
            (PriorityMode::Random, None) => Arc::new(UniformPriority::default()),
        }
    }

    /// Build the payload factory, loading the fixture if one is configured
    pub fn payload_factory(&self) -> Result<PayloadFactory, LoadTestError> {
        let data = match &self.data {
            DataSetting::Literal(value) => DataSource::Literal(value.clone()),
            DataSetting::Fixture(path) => DataSource::from_fixture(path)?,
        };
        Ok(PayloadFactory::new(self.priority_generator(), data)
            .with_data_as_string(self.data_as_string))
    }
}

/// `--data` takes JSON, but a bare word is sent as a string
fn parse_literal(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn validate_url(url: &str) -> Result<(), LoadTestError> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| LoadTestError::Config(format!("invalid url '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(LoadTestError::Config(format!(
            "unsupported url scheme '{}' in '{}'",
            other, url
        ))),
    }
}
