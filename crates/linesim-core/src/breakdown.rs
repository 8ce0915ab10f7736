//! Random failure injection.

use tracing::debug;

use crate::{
    error::SimError,
    plant::MachineId,
    process::{Context, Interrupt, Interrupter, Process, ProcessId, Wake, Yield},
    sampler::DurationSampler,
};

/// Fires breakdown interrupts at one machine.
///
/// Sleeps for a sampled time to failure, then interrupts the machine unless
/// the status board says it is already broken, and repeats for the whole run.
/// Whether the interrupt lands depends on the machine's current wait; one
/// that arrives outside an interruptible wait is dropped by the scheduler.
pub struct BreakdownInjector {
    name: String,
    machine: MachineId,
    target: ProcessId,
    time_to_failure: Box<dyn DurationSampler>,
}

impl BreakdownInjector {
    /// Injector for the machine on board entry `machine`, run as `target`.
    pub fn new(
        name: impl Into<String>,
        machine: MachineId,
        target: ProcessId,
        time_to_failure: Box<dyn DurationSampler>,
    ) -> Self {
        Self { name: name.into(), machine, target, time_to_failure }
    }

    fn arm(&mut self) -> Result<Yield, SimError> {
        Ok(Yield::timeout(self.time_to_failure.sample()?))
    }
}

impl Process for BreakdownInjector {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        match wake {
            Wake::Start => self.arm(),
            Wake::TimerElapsed => {
                if ctx.plant().machine(self.machine).broken {
                    debug!(
                        injector = %self.name,
                        time = ctx.now(),
                        "machine already broken, skipping"
                    );
                } else {
                    ctx.deliver_interrupt(self.target, Interrupt::Breakdown);
                }
                self.arm()
            },
            Wake::Interrupted { .. } => Err(SimError::UnexpectedWake { state: "sleeping", wake }),
        }
    }
}
