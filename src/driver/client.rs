//! Virtual client - one simulated user running the iteration loop

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::payload::PayloadFactory;
use super::target::{HttpTarget, RequestOutcome, STATUS_CHECK};
use crate::metrics::MetricsCollector;

pub struct VirtualClient {
    pub id: u64,
    pub target: HttpTarget,
    pub payloads: PayloadFactory,
    pub collector: MetricsCollector,
    pub pause: Duration,
}

impl VirtualClient {
    /// Build → send → check → pause until `stop` fires.
    ///
    /// A request already on the wire when `stop` fires is allowed to finish
    /// and is recorded; the pause is cut short and no new iteration starts.
    pub async fn run(self, stop: CancellationToken) {
        tracing::debug!("VU {} started", self.id);

        while !stop.is_cancelled() {
            self.iterate().await;

            tokio::select! {
                _ = tokio::time::sleep(self.pause) => {}
                _ = stop.cancelled() => break,
            }
        }

        tracing::debug!("VU {} stopped", self.id);
    }

    async fn iterate(&self) {
        let payload = self.payloads.build();

        self.collector.request_started();
        let outcome = self.target.post(&payload).await;

        match &outcome {
            RequestOutcome::Response { status, latency } => {
                if *status != 200 {
                    tracing::debug!("VU {} got status {}", self.id, status);
                }
                self.collector.request_completed(*status, *latency);
            }
            RequestOutcome::NetworkError { reason } => {
                tracing::debug!("VU {} request failed: {}", self.id, reason);
                self.collector.request_errored();
            }
        }

        self.collector.record_check(STATUS_CHECK, outcome.status_ok());
        self.collector.iteration_completed();
    }
}
