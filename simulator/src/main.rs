use anyhow::Context;
use clap::Parser;
use data_io::{load_inputs, write_outputs};
use generator::scenario::build_scenario;
use gui_bridge::bridge::{default_bind_address, GuiBridge};
use gui_bridge::model::VisualizationModel;
use log::info;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::WorkflowConfig;
use workflow::runner::Runner;

mod data_io;
mod generator;
mod gui_bridge;
mod report;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Multi-sensor temporal fusion driver")]
struct Args {
    /// Fuse a synthetic scenario instead of recorded inputs
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load a workflow config from YAML
    #[arg(long)]
    workflow: Option<PathBuf>,
    #[arg(long, default_value_t = 300.0)]
    duration_secs: f64,
    #[arg(long, default_value_t = 10.0)]
    rate_hz: f64,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Directory for fused_data.json and performance_summary.json
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Keep the HTTP bridge alive after the run
    #[arg(long, default_value_t = false)]
    serve: bool,
    #[arg(long)]
    bind: Option<SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut workflow_config = if let Some(path) = &args.workflow {
        WorkflowConfig::load(path)?
    } else {
        WorkflowConfig::from_args(args.duration_secs, args.rate_hz, args.seed)
    };
    if args.offline {
        workflow_config.inputs = None;
    }
    let output_dir = args
        .output_dir
        .clone()
        .or_else(|| workflow_config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from("output"));

    let gui_bridge = GuiBridge::new();
    if args.serve {
        gui_bridge.serve(args.bind.unwrap_or_else(default_bind_address));
    }

    if args.offline || args.serve || workflow_config.inputs.is_some() {
        let data = match &workflow_config.inputs {
            Some(inputs) => load_inputs(inputs, &workflow_config.fusion.time_column)
                .context("loading recorded inputs")?,
            None => {
                info!(
                    "generating synthetic scenario: {}s at {} Hz, seed {}",
                    workflow_config.scenario.duration_secs,
                    workflow_config.scenario.rate_hz,
                    workflow_config.scenario.seed
                );
                build_scenario(&workflow_config.scenario)
                    .context("generating synthetic scenario")?
            }
        };

        let runner = Runner::new(workflow_config);
        let result = runner.execute(&data)?;
        println!(
            "{}",
            report::render_summary(&runner.config().fusion, &result.output)
        );
        info!(
            "sensor passes: {} aligned, {} skipped, {} matched rows",
            result.metrics.aligned, result.metrics.skipped, result.metrics.matched_rows
        );

        let (fused_path, summary_path) = write_outputs(&output_dir, &result.output)?;
        println!(
            "Fused data written to {}\nSummary written to {}",
            fused_path.display(),
            summary_path.display()
        );

        gui_bridge.publish(VisualizationModel::from_output(&result.output))?;
        gui_bridge.publish_status("Fusion results ready.");
    } else {
        println!("Nothing to do: pass --offline, --serve, or a workflow with inputs.");
    }

    if args.serve {
        gui_bridge.publish_status("HTTP bridge running (Ctrl+C to stop)...");
        let runtime = TokioBuilder::new_current_thread()
            .enable_all()
            .build()
            .context("creating runtime for signal handling")?;
        runtime.block_on(async {
            signal::ctrl_c().await.context("awaiting Ctrl+C to exit")?;
            Ok::<(), anyhow::Error>(())
        })?;
    }

    Ok(())
}
