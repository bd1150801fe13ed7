use anyhow::Context;
use clap::Parser;
use generator::scene::ScenePreset;
use std::path::PathBuf;
use std::time::Duration;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::{ScanArgs, WorkflowConfig};
use workflow::runner::{RunOptions, Runner};

mod console;
mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Headless sweep-sonar scan driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    /// Simulated surroundings when no workflow is given
    #[arg(long, value_enum, default_value_t = ScenePreset::CloseCall)]
    scene: ScenePreset,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 10)]
    step: u16,
    /// Readings at or below this distance (cm) raise an alert
    #[arg(long, default_value_t = 10.0)]
    threshold: f32,
    /// Stop after this many sweep passes; runs until Ctrl+C when omitted
    #[arg(long)]
    passes: Option<u64>,
    /// Play alert sequences on the sweep thread instead of a worker
    #[arg(long, default_value_t = false)]
    blocking_alerts: bool,
    /// Accept w/a/s/d drive commands on stdin
    #[arg(long, default_value_t = false)]
    interactive: bool,
    /// Print the run report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = if let Some(path) = args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(&ScanArgs {
            scene: args.scene,
            seed: args.seed,
            step_degrees: args.step,
            near_threshold_cm: args.threshold,
            max_passes: args.passes,
            blocking_alerts: args.blocking_alerts,
        })
    };
    workflow_config
        .scan
        .validate()
        .context("validating scan settings")?;

    let runner = Runner::new(workflow_config);
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime for the scan driver")?;
    let report = runtime.block_on(runner.run(RunOptions {
        interactive: args.interactive,
    }));
    // A pending stdin read must not hold the process open.
    runtime.shutdown_timeout(Duration::from_millis(100));
    let report = report?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Scan run -> passes {} (aborted {}), samples {}, timeouts {}, alerts {} (coalesced {}), frames {}, closest {}",
            report.passes,
            report.aborted_passes,
            report.samples,
            report.timeouts,
            report.alerts,
            report.coalesced_alerts,
            report.frames,
            report
                .closest_cm
                .map_or_else(|| "n/a".to_string(), |cm| format!("{cm} cm"))
        );
    }

    Ok(())
}
