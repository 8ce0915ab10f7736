//! Runner for the manufacturing line simulator.
//!
//! This crate is the I/O shell around [`linesim_core`]: it loads the
//! configuration, runs the line once to its horizon and writes the results.
//!
//! # Outputs
//!
//! Under the output directory:
//!
//! - `Machine_<X>/log.csv`: one row per step record
//! - `Machine_<X>/exp_prod_flag.csv`: the per-tick expectation flag
//! - `merged_logs.csv`: every machine on one forward-filled [`Timeline`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logs;
pub mod merge;
pub mod observer;

use std::{
    fs,
    path::{Path, PathBuf},
};

pub use config::{Overrides, load_config, parse_config};
pub use error::RunnerError;
use linesim_core::{LineConfig, LineReport, ProductionLine};
pub use logs::{LogCollector, MachineLog};
pub use merge::{MergeKey, Timeline};
pub use observer::{RunObserver, TracingObserver};
use tracing::info;

/// File name of the merged timeline.
pub const MERGED_FILE: &str = "merged_logs.csv";

/// Where and what to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOptions {
    /// Root directory for every file
    pub dir: PathBuf,
    /// Also write the merged timeline
    pub merge: bool,
}

/// Run `config` to its horizon and write every log under `output.dir`.
pub fn run(config: LineConfig, output: &OutputOptions) -> Result<LineReport, RunnerError> {
    let mut line = ProductionLine::build(config)?;
    let mut observer = RunObserver::for_plant(line.plant());

    let report = line.run(&mut observer)?;

    write_outputs(observer.logs.machines(), output)?;
    Ok(report)
}

/// Write per-machine logs and, if requested, the merged timeline.
pub fn write_outputs(logs: &[MachineLog], output: &OutputOptions) -> Result<(), RunnerError> {
    let dir: &Path = &output.dir;
    fs::create_dir_all(dir).map_err(|e| RunnerError::write(dir, e))?;

    for log in logs {
        let written = log.write_to(dir)?;
        info!(
            machine = %log.name,
            steps = log.steps.len(),
            dir = %written.display(),
            "wrote machine log"
        );
    }

    if output.merge {
        let path = dir.join(MERGED_FILE);
        let timeline = Timeline::merge(logs);
        timeline.write_csv(&path)?;
        info!(rows = timeline.len(), path = %path.display(), "wrote merged timeline");
    }

    Ok(())
}
