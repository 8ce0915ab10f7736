//! Manufacturing line simulator.
//!
//! # Usage
//!
//! ```bash
//! # Default line, 36 shifts, logs under ./logs
//! linesim
//!
//! # Custom configuration, one shift, verbose text log
//! linesim --config line.toml --horizon 28800 --log-level debug
//! ```

use std::path::PathBuf;

use clap::Parser;
use linesim_runner::{OutputOptions, Overrides, load_config, run};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Manufacturing line simulator
#[derive(Parser, Debug)]
#[command(name = "linesim")]
#[command(about = "Discrete-event simulation of a three-machine production line")]
#[command(version)]
struct Args {
    /// Line configuration (TOML); defaults to the reference line
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for every random stream
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulated ticks to run
    #[arg(long)]
    horizon: Option<u64>,

    /// Directory for the CSV logs
    #[arg(short, long, default_value = "logs")]
    output_dir: PathBuf,

    /// Skip the merged timeline
    #[arg(long)]
    no_merge: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let overrides = Overrides { seed: args.seed, horizon: args.horizon };
    let config = load_config(args.config.as_deref(), overrides)?;
    tracing::info!(seed = config.seed, horizon = config.horizon, "starting run");

    let output = OutputOptions { dir: args.output_dir, merge: !args.no_merge };
    let report = run(config, &output)?;

    for line in report.to_string().lines() {
        tracing::info!("{line}");
    }

    Ok(())
}
