//! Error types for load test setup.
//!
//! Everything in here is fatal and surfaces before the first request is sent.
//! Failures that happen while the run is in progress are recorded as metric
//! samples instead.

use std::path::PathBuf;
use thiserror::Error;

/// Setup-time failure of a load test run
#[derive(Debug, Error)]
pub enum LoadTestError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Threshold(#[from] ThresholdError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

/// Malformed ramp stage definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    #[error("stage '{0}' must look like <duration>:<target>, e.g. 30s:15")]
    Syntax(String),

    #[error("stage '{input}' has an invalid duration: {reason}")]
    Duration { input: String, reason: String },

    #[error("stage '{0}' has an invalid target; expected a non-negative integer")]
    Target(String),

    #[error("at least one stage is required")]
    Empty,
}

/// Malformed threshold expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("threshold '{0}' must look like <metric>: <aggregation> <op> <value>")]
    Syntax(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("unknown aggregation '{0}'")]
    UnknownAggregation(String),

    #[error("aggregation '{aggregation}' is not available for metric '{metric}'")]
    Unsupported { metric: String, aggregation: String },

    #[error("percentile must be within [0, 100], got '{0}'")]
    Percentile(String),

    #[error("threshold '{0}' has no comparison operator")]
    MissingOperator(String),

    #[error("threshold bound '{0}' is not a number")]
    Bound(String),
}

/// Unreadable or malformed payload fixture
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fixture {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("fixture {0} is an empty array")]
    Empty(PathBuf),
}

pub type Result<T, E = LoadTestError> = std::result::Result<T, E>;
