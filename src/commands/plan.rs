//! `plan` mode - show what a run would do without sending anything

use anyhow::Result;

use crate::cli::RunArgs;
use crate::config::RunConfig;

pub fn run(args: RunArgs) -> Result<RunConfig> {
    let config = RunConfig::from_args(&args)?;
    let payloads = config.payload_factory()?;
    let schedule = &config.schedule;

    println!("Target:         {}", config.url);
    println!("Profile:        {}", config.profile);
    println!("Start VUs:      {}", schedule.start_vus());
    println!("Stages:");
    let mut offset = std::time::Duration::ZERO;
    for (idx, stage) in schedule.stages().iter().enumerate() {
        println!(
            "  {:>2}. at {:>8}  {}",
            idx + 1,
            humantime::format_duration(offset).to_string(),
            stage
        );
        offset += stage.duration;
    }
    println!(
        "Total:          {} (peak {} VUs)",
        humantime::format_duration(schedule.total_duration()),
        schedule.max_target()
    );
    println!("Priority:       {}", config.priority);
    println!("Data:           {}", payloads.data_source().describe());
    println!("Sample body:    {}", serde_json::to_string(&payloads.build())?);
    println!("Pause:          {}", humantime::format_duration(config.pause));
    println!("Timeout:        {}", humantime::format_duration(config.timeout));
    println!(
        "Graceful stop:  {}",
        humantime::format_duration(config.graceful_stop)
    );
    println!("Thresholds:");
    if config.thresholds.is_empty() {
        println!("  (none)");
    }
    for threshold in &config.thresholds {
        println!("  {}", threshold);
    }

    Ok(config)
}
