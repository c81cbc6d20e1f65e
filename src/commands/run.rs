//! `run` mode - drive the configured endpoint and report thresholds

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::cli::RunArgs;
use crate::config::RunConfig;
use crate::driver::LoadDriver;
use crate::metrics::reporter;
use crate::metrics::{MetricsCollector, RunResult};

pub async fn run(args: RunArgs) -> Result<RunResult> {
    let config = RunConfig::from_args(&args)?;

    tracing::info!("simcue Load Test Starting...");
    tracing::info!("Target: {}", config.url);
    tracing::info!("Profile: {}", config.profile);
    tracing::info!("Schedule: {}", config.schedule);
    tracing::info!("Priority: {}", config.priority);
    tracing::info!("Pause: {}", humantime::format_duration(config.pause));

    // fixture problems surface here, before any request goes out
    let driver = LoadDriver::from_config(&config)?;

    let collector = MetricsCollector::new();
    let shutdown = CancellationToken::new();

    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received, ending run early");
            ctrl_c.cancel();
        }
    });

    let reporter_stop = CancellationToken::new();
    if config.live {
        let collector_clone = collector.clone();
        let target = config.url.clone();
        let interval = config.report_interval;
        let stop = reporter_stop.clone();
        tokio::spawn(async move {
            reporter::start_periodic_reporter(collector_clone, interval, target, stop).await;
        });
    }

    let result = driver.run(&collector, shutdown).await;
    reporter_stop.cancel();

    reporter::print_final_report(&result);

    if let Some(path) = &config.summary_export {
        result
            .export_summary(path)
            .with_context(|| format!("failed to write summary to {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    tracing::info!("Load test complete");
    Ok(result)
}
