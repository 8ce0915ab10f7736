//! Production-cycle state machine for one machine.
//!
//! ```text
//! CycleStart ─> AwaitInput* ─> HandleIn ─> Process ─> AwaitOutput* ─> HandleOut ─> Advance(1)
//!     ^                                                                              │
//!     └──────────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The three working stages share one breakdown protocol. An interrupt during
//! the stage's wait marks the machine broken, subtracts the elapsed time from
//! what is left, samples a repair time and waits it out without accepting
//! further interrupts. After the repair the stage resumes with what is left.
//! A stage with nothing left completes without suspending.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::{
    clock::SimTime,
    container::ContainerId,
    error::SimError,
    plant::MachineId,
    process::{Context, Process, Wake, Yield},
    record::{Observation, StepCode, StepRecord},
    sampler::DurationSampler,
};

/// When the machine takes its unit of input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputCommit {
    /// Take input together with the output put, after output handling.
    #[default]
    AfterHandleOut,
    /// Take input as soon as input handling finishes.
    AfterHandleIn,
}

/// Fixed per-machine parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct MachineSettings {
    /// Mean time to failure, reported in step records
    pub mttf: f64,
    /// Input handling ticks
    pub handling_in: SimTime,
    /// Output handling ticks
    pub handling_out: SimTime,
    /// Whether handling can be interrupted by a breakdown
    pub logistic_breakdowns: bool,
    /// Whether processing can be interrupted by a breakdown
    pub processing_breakdowns: bool,
    /// When input is consumed
    pub input_commit: InputCommit,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            mttf: 0.0,
            handling_in: 1,
            handling_out: 1,
            logistic_breakdowns: true,
            processing_breakdowns: true,
            input_commit: InputCommit::AfterHandleOut,
        }
    }
}

/// Buffers and board entry a machine is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachinePorts {
    /// Status board entry
    pub machine: MachineId,
    /// Raw material buffer
    pub input: ContainerId,
    /// Finished goods buffer
    pub output: ContainerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    HandleIn,
    Process,
    HandleOut,
}

impl Stage {
    fn breakdown_code(self) -> StepCode {
        match self {
            Self::HandleIn => StepCode::BreakdownDuringInput,
            Self::Process => StepCode::BreakdownDuringProcessing,
            Self::HandleOut => StepCode::BreakdownDuringOutput,
        }
    }

    fn repaired_code(self) -> StepCode {
        match self {
            Self::HandleIn => StepCode::RepairedDuringInput,
            Self::Process => StepCode::RepairedDuringProcessing,
            Self::HandleOut => StepCode::RepairedDuringOutput,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    AwaitInput,
    Working { stage: Stage, remaining: SimTime },
    Repairing { stage: Stage, remaining: SimTime, repair: SimTime },
    AwaitOutput,
    Advance,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitInput => "awaiting input",
            Self::Working { .. } => "working",
            Self::Repairing { .. } => "under repair",
            Self::AwaitOutput => "awaiting output space",
            Self::Advance => "advancing",
        }
    }
}

/// One machine of the line.
pub struct Machine {
    name: String,
    ports: MachinePorts,
    settings: MachineSettings,
    process_time: Box<dyn DurationSampler>,
    repair_time: Box<dyn DurationSampler>,
    phase: Phase,
}

impl Machine {
    /// Machine reading `ports.input`, writing `ports.output` and publishing
    /// its status on `ports.machine`.
    pub fn new(
        name: impl Into<String>,
        ports: MachinePorts,
        settings: MachineSettings,
        process_time: Box<dyn DurationSampler>,
        repair_time: Box<dyn DurationSampler>,
    ) -> Self {
        Self { name: name.into(), ports, settings, process_time, repair_time, phase: Phase::Idle }
    }

    fn record(
        &self,
        ctx: &mut Context<'_>,
        code: StepCode,
        remaining: SimTime,
        repair_time: SimTime,
    ) {
        let plant = ctx.plant();
        let status = plant.machine(self.ports.machine);
        let record = StepRecord {
            machine: self.ports.machine,
            time: ctx.now(),
            code,
            input_level: plant.container(self.ports.input).level(),
            remaining,
            output_level: plant.container(self.ports.output).level(),
            parts_made: status.parts_made,
            broken: status.broken,
            mttf: if code.is_breakdown() { 0.0 } else { self.settings.mttf },
            repair_time,
        };

        trace!(machine = %self.name, time = record.time, code = code.code(), %code, "step");
        ctx.emit(Observation::Step(record));
    }

    fn start_cycle(&mut self, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        self.record(ctx, StepCode::CycleStart, 0, 0);
        self.check_input(ctx, false)
    }

    fn check_input(&mut self, ctx: &mut Context<'_>, waited: bool) -> Result<Yield, SimError> {
        if ctx.plant().container(self.ports.input).is_empty() {
            self.record(ctx, StepCode::AwaitingInput, 0, 0);
            self.phase = Phase::AwaitInput;
            return Ok(Yield::timeout(1));
        }

        if waited {
            self.record(ctx, StepCode::InputFilled, 0, 0);
        }
        self.enter_stage(Stage::HandleIn, self.settings.handling_in, ctx)
    }

    fn check_output(&mut self, ctx: &mut Context<'_>, waited: bool) -> Result<Yield, SimError> {
        if ctx.plant().container(self.ports.output).is_full() {
            self.record(ctx, StepCode::AwaitingOutputSpace, 0, 0);
            self.phase = Phase::AwaitOutput;
            return Ok(Yield::timeout(1));
        }

        if waited {
            self.record(ctx, StepCode::OutputSpaceFreed, 0, 0);
        }
        self.enter_stage(Stage::HandleOut, self.settings.handling_out, ctx)
    }

    fn enter_stage(
        &mut self,
        stage: Stage,
        remaining: SimTime,
        ctx: &mut Context<'_>,
    ) -> Result<Yield, SimError> {
        if remaining == 0 {
            return self.finish_stage(stage, ctx);
        }

        let interruptible = match stage {
            Stage::HandleIn | Stage::HandleOut => self.settings.logistic_breakdowns,
            Stage::Process => {
                self.record(ctx, StepCode::ProcessingStarted, remaining, 0);
                self.settings.processing_breakdowns
            },
        };

        self.phase = Phase::Working { stage, remaining };
        Ok(Yield::Wait { delay: remaining, interruptible })
    }

    fn finish_stage(&mut self, stage: Stage, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        match stage {
            Stage::HandleIn => {
                if self.settings.input_commit == InputCommit::AfterHandleIn {
                    ctx.plant_mut().container_mut(self.ports.input).pick()?;
                }
                self.record(ctx, StepCode::InputHandled, 0, 0);

                let processing = self.process_time.sample()?;
                self.enter_stage(Stage::Process, processing, ctx)
            },
            Stage::Process => {
                let now = ctx.now();
                let status = ctx.plant_mut().machine_mut(self.ports.machine);
                status.parts_made += 1;
                status.last_completion = now;
                self.record(ctx, StepCode::PartCompleted, 0, 0);

                self.check_output(ctx, false)
            },
            Stage::HandleOut => {
                let plant = ctx.plant_mut();
                if self.settings.input_commit == InputCommit::AfterHandleOut {
                    plant.container_mut(self.ports.input).pick()?;
                }
                plant.container_mut(self.ports.output).store()?;
                self.record(ctx, StepCode::OutputHandled, 0, 0);

                self.phase = Phase::Advance;
                Ok(Yield::timeout(1))
            },
        }
    }

    fn break_down(
        &mut self,
        stage: Stage,
        remaining: SimTime,
        ctx: &mut Context<'_>,
    ) -> Result<Yield, SimError> {
        ctx.plant_mut().machine_mut(self.ports.machine).broken = true;
        let repair = self.repair_time.sample()?;

        debug!(machine = %self.name, time = ctx.now(), ?stage, remaining, repair, "breakdown");
        let shown = if stage == Stage::Process { remaining } else { 0 };
        self.record(ctx, stage.breakdown_code(), shown, repair);

        self.phase = Phase::Repairing { stage, remaining, repair };
        Ok(Yield::timeout(repair))
    }

    fn repaired(
        &mut self,
        stage: Stage,
        remaining: SimTime,
        repair: SimTime,
        ctx: &mut Context<'_>,
    ) -> Result<Yield, SimError> {
        let status = ctx.plant_mut().machine_mut(self.ports.machine);
        status.broken = false;
        status.breakdowns += 1;
        status.downtime += repair;

        debug!(machine = %self.name, time = ctx.now(), ?stage, remaining, "repaired");
        let shown = if stage == Stage::Process { remaining } else { 0 };
        self.record(ctx, stage.repaired_code(), shown, 0);

        self.enter_stage(stage, remaining, ctx)
    }
}

impl Process for Machine {
    fn name(&self) -> &str {
        &self.name
    }

    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError> {
        match (self.phase, wake) {
            (Phase::Idle, Wake::Start) | (Phase::Advance, Wake::TimerElapsed) => {
                self.start_cycle(ctx)
            },
            (Phase::AwaitInput, Wake::TimerElapsed) => self.check_input(ctx, true),
            (Phase::AwaitOutput, Wake::TimerElapsed) => self.check_output(ctx, true),
            (Phase::Working { stage, .. }, Wake::TimerElapsed) => self.finish_stage(stage, ctx),
            (Phase::Working { stage, remaining }, Wake::Interrupted { elapsed, .. }) => {
                self.break_down(stage, remaining.saturating_sub(elapsed), ctx)
            },
            (Phase::Repairing { stage, remaining, repair }, Wake::TimerElapsed) => {
                self.repaired(stage, remaining, repair, ctx)
            },
            (phase, wake) => Err(SimError::UnexpectedWake { state: phase.label(), wake }),
        }
    }
}
