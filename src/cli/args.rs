use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::config::PriorityMode;
use crate::driver::RampStage;

/// simcue Load Testing Tool
#[derive(Parser, Debug)]
#[command(name = "simcue-load")]
#[command(about = "Ramping virtual-client load generator for the simcue queue endpoints")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Mode {
    /// Run the load test and report threshold results
    Run(RunArgs),

    /// Resolve and print the run plan without sending any request
    Plan(RunArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// TOML run configuration file
    #[arg(long, env = "SIMCUE_LOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Full endpoint URL, overrides the target preset
    #[arg(long, env = "SIMCUE_LOAD_URL")]
    pub url: Option<String>,

    /// Load profile: smoke, ramp, stress
    #[arg(long)]
    pub profile: Option<String>,

    /// Ramp stage as <duration>:<target>, repeatable (replaces the profile stages)
    #[arg(long = "stage", value_name = "DURATION:TARGET")]
    pub stages: Vec<RampStage>,

    /// Virtual clients active before the first stage starts ramping
    #[arg(long)]
    pub start_vus: Option<u32>,

    /// Threshold as '<metric>: <expression>', repeatable (replaces configured thresholds)
    #[arg(long = "threshold", value_name = "METRIC: EXPR")]
    pub thresholds: Vec<String>,

    /// Request priority: an integer, or 'random' for uniform in [0, 10)
    #[arg(long)]
    pub priority: Option<PriorityMode>,

    /// Seed for random priorities
    #[arg(long)]
    pub seed: Option<u64>,

    /// Literal JSON value for the data field
    #[arg(long, conflicts_with = "fixture")]
    pub data: Option<String>,

    /// JSON file supplying the data field (arrays are sampled per request)
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Send non-string data values as JSON text
    #[arg(long)]
    pub data_as_string: bool,

    /// Pause between iterations of a virtual client
    #[arg(long, value_parser = humantime::parse_duration)]
    pub pause: Option<Duration>,

    /// Per-request timeout
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// How long in-flight requests may finish after the last stage
    #[arg(long, value_parser = humantime::parse_duration)]
    pub graceful_stop: Option<Duration>,

    /// Live metrics refresh interval in seconds
    #[arg(long)]
    pub report_interval: Option<u64>,

    /// Disable the live metrics display
    #[arg(short, long)]
    pub quiet: bool,

    /// Write the end-of-run summary as JSON to this file
    #[arg(long)]
    pub summary_export: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub target: Option<Target>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Target {
    /// Rust queue server, POST /enqueue
    Enqueue(PresetArgs),

    /// Go queue server, POST /push
    Push(PresetArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PresetArgs {
    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Server port, defaults to the preset's port
    #[arg(long)]
    pub port: Option<u16>,
}

impl Target {
    pub const ENQUEUE_PORT: u16 = 4433;
    pub const PUSH_PORT: u16 = 3333;

    pub fn url(&self) -> String {
        match self {
            Self::Enqueue(args) => format!(
                "http://{}:{}/enqueue",
                args.host,
                args.port.unwrap_or(Self::ENQUEUE_PORT)
            ),
            Self::Push(args) => format!(
                "http://{}:{}/push",
                args.host,
                args.port.unwrap_or(Self::PUSH_PORT)
            ),
        }
    }

    /// The Go server's `data` field is a string
    pub fn wants_string_data(&self) -> bool {
        matches!(self, Self::Push(_))
    }
}
