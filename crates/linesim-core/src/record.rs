//! Observations emitted while the line runs.
//!
//! The core never writes files. Machines, monitors and controllers publish
//! [`Observation`]s through their context; the scheduler hands each one to the
//! caller's [`Observer`] right after the step that produced it.

use std::fmt;

use crate::{clock::SimTime, container::ContainerId, plant::MachineId, plant::Plant};

/// Machine phase transition codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepCode {
    /// A new cycle started.
    CycleStart,
    /// Input buffer empty, re-checking next tick.
    AwaitingInput,
    /// Input buffer has material again.
    InputFilled,
    /// Broke down while handling input.
    BreakdownDuringInput,
    /// Repaired while handling input.
    RepairedDuringInput,
    /// Input handling finished.
    InputHandled,
    /// Processing (re)started with the remaining time.
    ProcessingStarted,
    /// Broke down while processing.
    BreakdownDuringProcessing,
    /// Repaired while processing.
    RepairedDuringProcessing,
    /// Part finished.
    PartCompleted,
    /// Output buffer full, re-checking next tick.
    AwaitingOutputSpace,
    /// Output buffer has room again.
    OutputSpaceFreed,
    /// Broke down while handling output.
    BreakdownDuringOutput,
    /// Repaired while handling output.
    RepairedDuringOutput,
    /// Output handling finished.
    OutputHandled,
}

impl StepCode {
    /// Every code in numeric order.
    pub const ALL: [Self; 15] = [
        Self::CycleStart,
        Self::AwaitingInput,
        Self::InputFilled,
        Self::BreakdownDuringInput,
        Self::RepairedDuringInput,
        Self::InputHandled,
        Self::ProcessingStarted,
        Self::BreakdownDuringProcessing,
        Self::RepairedDuringProcessing,
        Self::PartCompleted,
        Self::AwaitingOutputSpace,
        Self::OutputSpaceFreed,
        Self::BreakdownDuringOutput,
        Self::RepairedDuringOutput,
        Self::OutputHandled,
    ];

    /// Numeric code used in step keys.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Inverse of [`StepCode::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Short kebab-case label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CycleStart => "cycle-start",
            Self::AwaitingInput => "awaiting-input",
            Self::InputFilled => "input-filled",
            Self::BreakdownDuringInput => "breakdown-during-input",
            Self::RepairedDuringInput => "repaired-during-input",
            Self::InputHandled => "input-handled",
            Self::ProcessingStarted => "processing-started",
            Self::BreakdownDuringProcessing => "breakdown-during-processing",
            Self::RepairedDuringProcessing => "repaired-during-processing",
            Self::PartCompleted => "part-completed",
            Self::AwaitingOutputSpace => "awaiting-output-space",
            Self::OutputSpaceFreed => "output-space-freed",
            Self::BreakdownDuringOutput => "breakdown-during-output",
            Self::RepairedDuringOutput => "repaired-during-output",
            Self::OutputHandled => "output-handled",
        }
    }

    /// Whether this record marks a breakdown.
    pub const fn is_breakdown(self) -> bool {
        matches!(
            self,
            Self::BreakdownDuringInput
                | Self::BreakdownDuringProcessing
                | Self::BreakdownDuringOutput
        )
    }
}

impl fmt::Display for StepCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot of one machine at a phase transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Machine that logged the record
    pub machine: MachineId,
    /// Simulated time
    pub time: SimTime,
    /// Transition code
    pub code: StepCode,
    /// Input buffer level
    pub input_level: u64,
    /// Remaining processing time, non-zero only around processing
    pub remaining: SimTime,
    /// Output buffer level
    pub output_level: u64,
    /// Parts completed so far
    pub parts_made: u64,
    /// Whether the machine is broken
    pub broken: bool,
    /// Configured MTTF, 0 on breakdown records
    pub mttf: f64,
    /// Sampled repair time, non-zero only on breakdown records
    pub repair_time: SimTime,
}

impl StepRecord {
    /// `"<time>.<code>"` step key.
    pub fn step_key(&self) -> String {
        format!("{}.{}", self.time, self.code.code())
    }
}

/// Per-tick "behind expectation" flag for one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectationSample {
    /// Monitored machine
    pub machine: MachineId,
    /// Simulated time
    pub time: SimTime,
    /// Whether the machine is behind its expected completion time
    pub behind: bool,
}

/// Supplier, dispatcher and transfer activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogisticsEvent {
    /// Level at or below critical, supplier called.
    SupplierCalled {
        /// Replenished buffer
        container: ContainerId,
        /// Level when the call was made
        level: u64,
    },
    /// Supplier arrived and refilled the buffer.
    Refilled {
        /// Replenished buffer
        container: ContainerId,
        /// Units added
        quantity: u64,
        /// Level after the refill
        level: u64,
    },
    /// Level at or above critical, dispatcher called.
    DispatcherCalled {
        /// Emptied buffer
        container: ContainerId,
        /// Level when the call was made
        level: u64,
    },
    /// Dispatcher arrived and emptied the buffer.
    Dispatched {
        /// Emptied buffer
        container: ContainerId,
        /// Units removed
        quantity: u64,
    },
    /// Transfer stage moved one unit from every source.
    Transferred {
        /// Destination buffer
        destination: ContainerId,
        /// Units put into the destination
        quantity: u64,
    },
}

/// Anything the line publishes while running.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// Machine phase transition
    Step(StepRecord),
    /// Expectation monitor sample
    Expectation(ExpectationSample),
    /// Buffer control or transfer activity
    Logistics {
        /// Simulated time
        time: SimTime,
        /// What happened
        event: LogisticsEvent,
    },
}

impl Observation {
    /// Simulated time of the observation.
    pub fn time(&self) -> SimTime {
        match self {
            Self::Step(record) => record.time,
            Self::Expectation(sample) => sample.time,
            Self::Logistics { time, .. } => *time,
        }
    }
}

/// Sink for run output.
pub trait Observer {
    /// Called for every observation, in emission order.
    fn observe(&mut self, observation: &Observation);

    /// Called after every scheduler step with the plant as the step left it.
    fn after_step(&mut self, _now: SimTime, _plant: &Plant) {}
}

/// Observer that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn observe(&mut self, _observation: &Observation) {}
}

/// Observer that keeps every observation in memory.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    observations: Vec<Observation>,
}

impl Recorder {
    /// Empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything recorded, in emission order.
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Consume the recorder.
    pub fn into_observations(self) -> Vec<Observation> {
        self.observations
    }

    /// Step records of one machine.
    pub fn steps(&self, machine: MachineId) -> impl Iterator<Item = &StepRecord> {
        self.observations.iter().filter_map(move |o| match o {
            Observation::Step(record) if record.machine == machine => Some(record),
            _ => None,
        })
    }

    /// Expectation samples of one machine.
    pub fn expectations(&self, machine: MachineId) -> impl Iterator<Item = &ExpectationSample> {
        self.observations.iter().filter_map(move |o| match o {
            Observation::Expectation(sample) if sample.machine == machine => Some(sample),
            _ => None,
        })
    }

    /// Logistics events with their times.
    pub fn logistics(&self) -> impl Iterator<Item = (SimTime, &LogisticsEvent)> {
        self.observations.iter().filter_map(|o| match o {
            Observation::Logistics { time, event } => Some((*time, event)),
            _ => None,
        })
    }
}

impl Observer for Recorder {
    fn observe(&mut self, observation: &Observation) {
        self.observations.push(observation.clone());
    }
}
