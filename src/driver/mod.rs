//! Load driver - reconciles running virtual clients with the ramp schedule
//!
//! A supervisor loop wakes every [`SUPERVISOR_TICK`], asks the schedule how
//! many clients should be active right now and spawns or retires clients to
//! match. Retired clients are the most recently started ones. Once the last
//! stage has elapsed every client is told to stop, in-flight requests get the
//! graceful-stop window to finish, and the thresholds are evaluated once.

pub mod client;
pub mod payload;
pub mod stage;
pub mod target;

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::LoadTestError;
use crate::metrics::{MetricsCollector, RunResult, ThresholdSpec};

pub use client::VirtualClient;
pub use payload::{
    DataSource, FixedPriority, FixtureValues, PayloadFactory, PriorityGenerator, RequestPayload,
    SequencePriority, UniformPriority,
};
pub use stage::{DriverPhase, RampSchedule, RampStage};
pub use target::{HttpTarget, RequestOutcome, STATUS_CHECK};

/// How often the supervisor reconciles active clients with the schedule
pub const SUPERVISOR_TICK: Duration = Duration::from_millis(100);

/// Timing knobs of a run
#[derive(Debug, Clone)]
pub struct DriverOptions {
    pub schedule: RampSchedule,
    /// Sleep between two iterations of the same client
    pub pause: Duration,
    /// How long in-flight requests may run past the end of the last stage
    pub graceful_stop: Duration,
}

struct RunningClient {
    stop: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct LoadDriver {
    options: DriverOptions,
    target: HttpTarget,
    payloads: PayloadFactory,
    thresholds: Vec<ThresholdSpec>,
}

impl LoadDriver {
    pub fn new(
        options: DriverOptions,
        target: HttpTarget,
        payloads: PayloadFactory,
        thresholds: Vec<ThresholdSpec>,
    ) -> Self {
        Self {
            options,
            target,
            payloads,
            thresholds,
        }
    }

    pub fn from_config(config: &RunConfig) -> Result<Self, LoadTestError> {
        let target = HttpTarget::new(config.url.clone(), config.timeout)?;
        Ok(Self::new(
            DriverOptions {
                schedule: config.schedule.clone(),
                pause: config.pause,
                graceful_stop: config.graceful_stop,
            },
            target,
            config.payload_factory()?,
            config.thresholds.clone(),
        ))
    }

    /// Execute the whole schedule and return the evaluated result.
    ///
    /// Cancelling `shutdown` ends the schedule early; the result is still
    /// collected and evaluated.
    pub async fn run(
        &self,
        collector: &MetricsCollector,
        shutdown: CancellationToken,
    ) -> RunResult {
        let schedule = &self.options.schedule;
        let total = schedule.total_duration();
        let run_token = shutdown.child_token();

        tracing::info!(
            "Driving {} for {} ({})",
            self.target.url(),
            humantime::format_duration(total),
            schedule
        );

        let mut active: Vec<RunningClient> = Vec::new();
        let mut retired: Vec<JoinHandle<()>> = Vec::new();
        let mut next_id = 0u64;
        let mut phase: Option<DriverPhase> = None;
        let start = Instant::now();

        loop {
            let elapsed = start.elapsed();
            let current = schedule.phase_at(elapsed);

            if phase != Some(current) {
                tracing::info!(
                    "Driver {} at {:.1}s, {} active VUs",
                    current,
                    elapsed.as_secs_f64(),
                    active.len()
                );
                phase = Some(current);
            }

            if current == DriverPhase::Finished {
                break;
            }

            let wanted = schedule.target_at(elapsed) as usize;

            while active.len() < wanted {
                next_id += 1;
                let stop = run_token.child_token();
                let client = VirtualClient {
                    id: next_id,
                    target: self.target.clone(),
                    payloads: self.payloads.clone(),
                    collector: collector.clone(),
                    pause: self.options.pause,
                };
                collector.vu_started();
                let handle = tokio::spawn(client.run(stop.clone()));
                active.push(RunningClient { stop, handle });
            }

            while active.len() > wanted {
                if let Some(client) = active.pop() {
                    client.stop.cancel();
                    collector.vu_stopped();
                    retired.push(client.handle);
                }
            }

            retired.retain(|handle| !handle.is_finished());

            let remaining = total.saturating_sub(start.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(SUPERVISOR_TICK.min(remaining)) => {}
                _ = shutdown.cancelled() => {
                    tracing::warn!("Run interrupted, stopping {} VUs", active.len());
                    break;
                }
            }
        }

        let elapsed = start.elapsed();
        run_token.cancel();
        for _ in &active {
            collector.vu_stopped();
        }

        let handles: Vec<JoinHandle<()>> = active
            .into_iter()
            .map(|client| client.handle)
            .chain(retired)
            .collect();
        self.drain(handles).await;

        let mut result = RunResult::from_collector(self.target.url(), elapsed, collector);
        result.evaluate_thresholds(&self.thresholds);

        for outcome in &result.thresholds {
            if outcome.passed {
                tracing::info!("Threshold passed: {}", outcome.expression);
            } else {
                tracing::warn!(
                    "Threshold failed: {} (observed {:?})",
                    outcome.expression,
                    outcome.observed
                );
            }
        }

        result
    }

    /// Wait for stopping clients up to the graceful-stop window, then abort the rest
    async fn drain(&self, mut handles: Vec<JoinHandle<()>>) {
        if handles.is_empty() {
            return;
        }

        tracing::info!(
            "Waiting up to {} for {} VUs to finish in-flight requests...",
            humantime::format_duration(self.options.graceful_stop),
            handles.len()
        );

        let deadline = Instant::now() + self.options.graceful_stop;
        for (idx, handle) in handles.iter_mut().enumerate() {
            match tokio::time::timeout_at(deadline, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("VU task {} panicked: {}", idx, e),
                Err(_) => break,
            }
        }

        let abandoned = handles
            .iter()
            .filter(|handle| !handle.is_finished())
            .inspect(|handle| handle.abort())
            .count();
        if abandoned > 0 {
            tracing::warn!(
                "Abandoned {} in-flight requests after graceful stop",
                abandoned
            );
        }
    }
}
