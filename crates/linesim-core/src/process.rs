//! Process model.
//!
//! A process is one logical thread of control written as an explicit state
//! machine. The scheduler calls [`Process::resume`] with the reason it woke
//! up; the process mutates the plant, queues observations and interrupts on
//! its [`Context`], and returns how it wants to suspend next. Returning
//! [`Yield::Wait`] is the only suspension point.
//!
//! ```text
//!            Start
//!              │
//!              ▼
//!        ┌──────────┐  Wait{delay}   ┌───────────┐
//!        │ resume() │───────────────>│ suspended │
//!        └──────────┘<───────────────└───────────┘
//!              │     TimerElapsed /        │
//!              │     Interrupted{elapsed}  │ interrupt() while not
//!              │                           │ interruptible: dropped
//!              ▼ Finished
//!        ┌──────────┐
//!        │ finished │
//!        └──────────┘
//! ```

use std::fmt;

use crate::{
    clock::SimTime,
    error::SimError,
    plant::Plant,
    record::Observation,
};

/// Stable index of a process in the scheduler's process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(usize);

impl ProcessId {
    /// Wrap a raw table index.
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Raw table index.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload carried by an interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The target machine broke down.
    Breakdown,
}

/// Why a process is being resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// First activation after spawn.
    Start,
    /// The requested wait ran to completion.
    TimerElapsed,
    /// The wait was cut short by an interrupt.
    Interrupted {
        /// Time spent waiting before the interrupt arrived.
        elapsed: SimTime,
        /// Interrupt payload.
        cause: Interrupt,
    },
}

/// How a process suspends after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Yield {
    /// Suspend for `delay` ticks.
    Wait {
        /// Ticks until the timer elapses.
        delay: SimTime,
        /// Whether an interrupt may cut this wait short. Interrupts aimed at
        /// a non-interruptible wait are dropped.
        interruptible: bool,
    },
    /// The process has nothing more to do.
    Finished,
}

impl Yield {
    /// Wait that ignores interrupts.
    pub const fn timeout(delay: SimTime) -> Self {
        Self::Wait { delay, interruptible: false }
    }

    /// Wait that an interrupt may cut short.
    pub const fn interruptible(delay: SimTime) -> Self {
        Self::Wait { delay, interruptible: true }
    }
}

/// Capability to deliver interrupts to other processes.
///
/// Breakdown injectors only need this, not access to the machine itself.
pub trait Interrupter {
    /// Queue `cause` for delivery to `target` once the current step returns.
    fn deliver_interrupt(&mut self, target: ProcessId, cause: Interrupt);
}

/// A schedulable state machine.
pub trait Process {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Advance the state machine after a wake-up.
    ///
    /// # Errors
    ///
    /// Any error aborts the run; the scheduler wraps it with the process name
    /// and simulated time.
    fn resume(&mut self, wake: Wake, ctx: &mut Context<'_>) -> Result<Yield, SimError>;
}

/// Everything a process may touch during one step.
pub struct Context<'a> {
    now: SimTime,
    me: ProcessId,
    plant: &'a mut Plant,
    observations: &'a mut Vec<Observation>,
    interrupts: &'a mut Vec<(ProcessId, Interrupt)>,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        now: SimTime,
        me: ProcessId,
        plant: &'a mut Plant,
        observations: &'a mut Vec<Observation>,
        interrupts: &'a mut Vec<(ProcessId, Interrupt)>,
    ) -> Self {
        Self { now, me, plant, observations, interrupts }
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Id of the process being stepped.
    pub fn me(&self) -> ProcessId {
        self.me
    }

    /// Shared plant state (read).
    pub fn plant(&self) -> &Plant {
        self.plant
    }

    /// Shared plant state (write).
    pub fn plant_mut(&mut self) -> &mut Plant {
        self.plant
    }

    /// Publish an observation to the run's observer.
    pub fn emit(&mut self, observation: Observation) {
        self.observations.push(observation);
    }
}

impl Interrupter for Context<'_> {
    fn deliver_interrupt(&mut self, target: ProcessId, cause: Interrupt) {
        self.interrupts.push((target, cause));
    }
}
