//! Per-tick "behind expectation" monitor.

use crate::{
    clock::SimTime,
    error::SimError,
    plant::MachineId,
    process::{Context, Process, Wake, Yield},
    record::{ExpectationSample, Observation},
};

/// Flags a machine as behind once
/// `now > last_completion + mean_processing_time + tolerance`.
pub struct ExpectationMonitor {
    name: String,
    machine: MachineId,
    mean_processing_time: f64,
    tolerance: SimTime,
}

impl ExpectationMonitor {
    /// Monitor for `machine`.
    pub fn new(
        name: impl Into<String>,
        machine: MachineId,
        mean_processing_time: f64,
        tolerance: SimTime,
    ) -> Self {
        Self { name: name.into(), machine, mean_processing_time, tolerance }
    }

    /// Floor of the mean of every machine's mean processing time.
    pub fn tolerance_for(means: &[f64]) -> SimTime {
        if means.is_empty() {
            return 0;
        }
        let mean = means.iter().sum::<f64>() / means.len() as f64;
        mean.max(0.0).floor() as SimTime
    }

    fn is_behind(&self, now: SimTime, last_completion: SimTime) -> bool {
        let deadline = last_completion as f64 + self.mean_processing_time + self.tolerance as f64;
        deadline < now as f64
    }
}

impl Process for ExpectationMonitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        if let Wake::Interrupted { .. } = wake {
            return Err(SimError::UnexpectedWake { state: "sampling", wake });
        }

        let now = ctx.now();
        let behind = self.is_behind(now, ctx.plant().machine(self.machine).last_completion);
        let sample = ExpectationSample { machine: self.machine, time: now, behind };
        ctx.emit(Observation::Expectation(sample));

        Ok(Yield::timeout(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{plant::Plant, record::Recorder, scheduler::Simulation};

    #[test]
    fn tolerance_is_floor_of_mean() {
        assert_eq!(ExpectationMonitor::tolerance_for(&[250.0, 250.0, 230.0]), 243);
        assert_eq!(ExpectationMonitor::tolerance_for(&[10.0, 11.0]), 10);
        assert_eq!(ExpectationMonitor::tolerance_for(&[]), 0);
    }

    #[test]
    fn flag_flips_after_deadline() {
        let monitor = ExpectationMonitor::new("m", Plant::new().add_machine("Machine A"), 5.0, 3);

        // deadline is 0 + 5 + 3 = 8
        assert!(!monitor.is_behind(8, 0));
        assert!(monitor.is_behind(9, 0));
        assert!(!monitor.is_behind(9, 2));
    }

    #[test]
    fn samples_once_per_tick() {
        let mut plant = Plant::new();
        let machine = plant.add_machine("Machine A");
        let mut sim = Simulation::new(plant);
        sim.spawn(Box::new(ExpectationMonitor::new("Machine A expectation", machine, 2.0, 1)));

        let mut recorder = Recorder::new();
        sim.run_until(5, &mut recorder).unwrap();

        let flags: Vec<_> = recorder.expectations(machine).map(|s| (s.time, s.behind)).collect();
        assert_eq!(
            flags,
            vec![(0, false), (1, false), (2, false), (3, false), (4, true), (5, true)]
        );
    }
}
