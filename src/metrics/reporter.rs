//! Console reporter for metrics with real-time updates

use super::collector::MetricsCollector;
use super::summary::RunResult;
use std::io::{self, Write};
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

/// Start periodic metrics reporting until `shutdown` fires
pub async fn start_periodic_reporter(
    collector: MetricsCollector,
    interval_secs: u64,
    target: String,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.cancelled() => break,
        }

        // Update system metrics before printing
        collector.update_system_metrics();

        print_live_metrics(&collector, &target);
    }
}

/// Print live metrics (clears screen and updates in place)
pub fn print_live_metrics(collector: &MetricsCollector, target: &str) {
    // Clear screen and move cursor to top
    print!("\x1B[2J\x1B[1;1H");

    let metrics = collector.get_snapshot();
    let elapsed = collector.elapsed().as_secs();
    let latency = collector.get_latency_stats();
    let checks = metrics.checks.totals();

    println!("╔════════════════════════════════════════════════════════════════╗");
    println!("║              simcue Load Test - Live Metrics                  ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!("  Target: {}", target);

    println!(
        "\n⏱️  Elapsed Time: {:02}:{:02}:{:02}",
        elapsed / 3600,
        (elapsed % 3600) / 60,
        elapsed % 60
    );

    println!("\n┌─ VIRTUAL CLIENTS ───────────────────────────────────────────┐");
    println!(
        "│  Active:       {:>8}    Peak:       {:>8}              │",
        metrics.vus.active, metrics.vus.max
    );
    println!(
        "│  Iterations:   {:>8}                                      │",
        metrics.vus.iterations
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n┌─ REQUESTS ──────────────────────────────────────────────────┐");
    println!(
        "│  Sent:         {:>8}    In-Flight:  {:>8}              │",
        metrics.requests.total, metrics.requests.in_flight
    );
    println!(
        "│  Failed:       {:>8}    Net Errors: {:>8}              │",
        metrics.requests.failed, metrics.requests.network_errors
    );
    if metrics.requests.total > 0 {
        let throughput = if elapsed > 0 {
            metrics.requests.total as f64 / elapsed as f64
        } else {
            0.0
        };
        println!(
            "│  Failed Rate:  {:>7.2}%    Throughput: {:>7.2}/sec        │",
            metrics.requests.failed_rate() * 100.0,
            throughput
        );
    }
    println!("└─────────────────────────────────────────────────────────────┘");

    if latency.count > 0 {
        println!("\n┌─ REQUEST LATENCY (ms) ──────────────────────────────────────┐");
        println!(
            "│  Min: {:>7.1}  Med: {:>7.1}  P95: {:>7.1}  P99: {:>7.1}       │",
            latency.min, latency.med, latency.p95, latency.p99
        );
        println!(
            "│  Max: {:>7.1}  Mean: {:>7.2}    Count: {:>10}            │",
            latency.max, latency.mean, latency.count
        );
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    if checks.total() > 0 {
        println!("\n┌─ CHECKS ────────────────────────────────────────────────────┐");
        println!(
            "│  Passed:       {:>8}    Failed:     {:>8}              │",
            checks.passes, checks.fails
        );
        println!("└─────────────────────────────────────────────────────────────┘");
    }

    println!("\n┌─ SYSTEM ────────────────────────────────────────────────────┐");
    println!(
        "│  CPU Usage:    {:>6.1}%    Memory: {:>6} / {:>6} MB       │",
        metrics.system.cpu_usage, metrics.system.memory_used_mb, metrics.system.memory_total_mb
    );
    println!("└─────────────────────────────────────────────────────────────┘");

    println!("\n  [Press Ctrl+C to stop test]");

    // Flush stdout to ensure immediate display
    let _ = io::stdout().flush();
}

/// Print final summary report
pub fn print_final_report(result: &RunResult) {
    let metrics = &result.metrics;
    let latency = &result.latency;
    let elapsed = result.elapsed.as_secs_f64();

    println!("\n╔════════════════════════════════════════════════════════════════╗");
    println!("║                    FINAL TEST REPORT                           ║");
    println!("╚════════════════════════════════════════════════════════════════╝");
    println!("   Run:                  {}", result.run_id);
    println!("   Target:               {}", result.target);

    println!("\n📊 REQUESTS");
    println!("   Total Sent:           {:>10}", metrics.requests.total);
    println!("   Total Failed:         {:>10}", metrics.requests.failed);
    println!("   Network Errors:       {:>10}", metrics.requests.network_errors);
    for (status, count) in &metrics.requests.status_codes {
        println!("   Status {}:           {:>10}", status, count);
    }
    if elapsed > 0.0 {
        println!(
            "   Throughput:           {:>10.2} req/sec",
            metrics.requests.total as f64 / elapsed
        );
    }
    if metrics.requests.total > 0 {
        println!(
            "   Failed Rate:          {:>10.2}%",
            metrics.requests.failed_rate() * 100.0
        );
    }

    if latency.count > 0 {
        println!("\n📈 REQUEST LATENCY");
        println!("   Min:                  {:>10.2} ms", latency.min);
        println!("   Med:                  {:>10.2} ms", latency.med);
        println!("   P90:                  {:>10.2} ms", latency.p90);
        println!("   P95:                  {:>10.2} ms", latency.p95);
        println!("   P99:                  {:>10.2} ms", latency.p99);
        println!("   Max:                  {:>10.2} ms", latency.max);
        println!("   Mean:                 {:>10.2} ms", latency.mean);
    }

    println!("\n⚙️  VIRTUAL CLIENTS");
    println!("   Peak:                 {:>10}", metrics.vus.max);
    println!("   Iterations:           {:>10}", metrics.vus.iterations);

    if !metrics.checks.by_name.is_empty() {
        println!("\n✔️  CHECKS");
        for (name, counts) in &metrics.checks.by_name {
            let mark = if counts.fails == 0 { "✓" } else { "✗" };
            println!(
                "   {} {:<28} {:>8.2}%  ✓ {} / ✗ {}",
                mark,
                name,
                counts.pass_rate() * 100.0,
                counts.passes,
                counts.fails
            );
        }
    }

    if !result.thresholds.is_empty() {
        println!("\n🎯 THRESHOLDS");
        for outcome in &result.thresholds {
            let mark = if outcome.passed { "✓" } else { "✗" };
            let observed = outcome
                .observed
                .map(|v| format!("{:.3}", v))
                .unwrap_or_else(|| "no samples".to_string());
            println!("   {} {:<40} (observed {})", mark, outcome.expression, observed);
        }
    }

    println!("\n⏱️  Test Duration: {:.2} seconds", elapsed);
    if result.thresholds_passed() {
        println!("   Result: PASSED");
    } else {
        println!("   Result: FAILED (one or more thresholds crossed)");
    }
    println!("════════════════════════════════════════════════════════════════\n");
}
