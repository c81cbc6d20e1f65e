//! Ramping virtual-client load generator for the simcue queue endpoints.
//!
//! Virtual clients repeatedly POST a JSON payload to one endpoint, check the
//! response status and pause. Their number follows a list of ramp stages.
//! Latency and status samples are aggregated and evaluated against
//! thresholds once the last stage ends.

pub mod cli;
pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;

pub use config::RunConfig;
pub use driver::{DriverOptions, LoadDriver};
pub use error::LoadTestError;
pub use metrics::{MetricsCollector, RunResult, ThresholdSpec};
