//! Per-machine step logs and expectation flags.
//!
//! Each machine gets a directory `Machine_<X>` holding `log.csv` with one row
//! per step record and `exp_prod_flag.csv` with one row per tick. Step keys
//! are `<time>.<code>`; flag keys are the bare time.

use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use linesim_core::{Observation, Observer, Plant, SimTime, StepRecord};

use crate::error::RunnerError;

/// Header of `log.csv`.
pub const STEP_HEADER: &str = "step,input,time_process,output,produced,failure,mttf,repair_time";

/// Header of `exp_prod_flag.csv`.
pub const FLAG_HEADER: &str = "step,flag";

/// Everything logged for one machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineLog {
    /// Machine name as on the status board
    pub name: String,
    /// Step records in emission order
    pub steps: Vec<StepRecord>,
    /// `(time, behind)` per tick
    pub flags: Vec<(SimTime, bool)>,
}

impl MachineLog {
    /// Directory name for this machine, spaces replaced by underscores.
    pub fn dir_name(&self) -> String {
        self.name.replace(' ', "_")
    }

    /// Write `log.csv` and `exp_prod_flag.csv` under `root/<dir_name>`.
    pub fn write_to(&self, root: &Path) -> Result<PathBuf, RunnerError> {
        let dir = root.join(self.dir_name());
        fs::create_dir_all(&dir).map_err(|e| RunnerError::write(&dir, e))?;

        let path = dir.join("log.csv");
        write_file(&path, |out| {
            writeln!(out, "{STEP_HEADER}")?;
            for record in &self.steps {
                writeln!(out, "{}", step_row(record))?;
            }
            Ok(())
        })?;

        let path = dir.join("exp_prod_flag.csv");
        write_file(&path, |out| {
            writeln!(out, "{FLAG_HEADER}")?;
            for &(time, behind) in &self.flags {
                writeln!(out, "{time},{}", u8::from(behind))?;
            }
            Ok(())
        })?;

        Ok(dir)
    }
}

/// One `log.csv` row, without the trailing newline.
pub fn step_row(record: &StepRecord) -> String {
    format!(
        "{},{},{},{},{},{},{},{}",
        record.step_key(),
        record.input_level,
        record.remaining,
        record.output_level,
        record.parts_made,
        u8::from(record.broken),
        record.mttf,
        record.repair_time
    )
}

pub(crate) fn write_file<F>(path: &Path, body: F) -> Result<(), RunnerError>
where
    F: FnOnce(&mut BufWriter<fs::File>) -> std::io::Result<()>,
{
    let file = fs::File::create(path).map_err(|e| RunnerError::write(path, e))?;
    let mut out = BufWriter::new(file);
    body(&mut out).and_then(|()| out.flush()).map_err(|e| RunnerError::write(path, e))
}

/// Observer that keeps step records and flags per machine.
#[derive(Debug, Clone, Default)]
pub struct LogCollector {
    machines: Vec<MachineLog>,
}

impl LogCollector {
    /// One empty log per machine of `plant`, in board order.
    pub fn for_plant(plant: &Plant) -> Self {
        let machines = plant
            .machines()
            .map(|(_, status)| MachineLog { name: status.name.clone(), ..MachineLog::default() })
            .collect();
        Self { machines }
    }

    /// Logs in board order.
    pub fn machines(&self) -> &[MachineLog] {
        &self.machines
    }
}

impl Observer for LogCollector {
    fn observe(&mut self, observation: &Observation) {
        match observation {
            Observation::Step(record) => {
                if let Some(log) = self.machines.get_mut(record.machine.index()) {
                    log.steps.push(record.clone());
                }
            },
            Observation::Expectation(sample) => {
                if let Some(log) = self.machines.get_mut(sample.machine.index()) {
                    log.flags.push((sample.time, sample.behind));
                }
            },
            Observation::Logistics { .. } => {},
        }
    }
}
