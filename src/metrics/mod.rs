pub mod collector;
pub mod reporter;
pub mod summary;
pub mod threshold;
pub mod types;

pub use collector::{LatencyStats, MetricsCollector};
pub use summary::{RunResult, RunSummary};
pub use threshold::{ThresholdOutcome, ThresholdSpec};
