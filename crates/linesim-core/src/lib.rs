//! Discrete-event simulation of a small manufacturing line.
//!
//! # Architecture
//!
//! The crate is Sans-IO: nothing here touches files, stdout or wall-clock
//! time. A run is a single-threaded loop over a virtual clock.
//!
//! - [`Clock`]: pending wake-ups ordered by `(time, sequence)`
//! - [`Simulation`]: process table, interrupt delivery, run loop
//! - [`Process`]: explicit state machine resumed with a [`Wake`] and
//!   suspended by returning a [`Yield`]
//! - [`Plant`]: the bounded [`Container`]s and the machine status board
//!
//! Domain processes built on the kernel:
//!
//! - [`Machine`]: input, processing, output, each stage breakable
//! - [`BreakdownInjector`]: exponential failures fired as interrupts
//! - [`ExpectationMonitor`]: per-tick "behind expectation" flag
//! - [`SupplierControl`] / [`DispatcherControl`]: buffer level control
//! - [`Transference`]: all-or-nothing transfer between nodes
//!
//! [`ProductionLine`] wires them into the reference topology from a validated
//! [`LineConfig`]. Output leaves through an [`Observer`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod breakdown;
pub mod clock;
pub mod config;
pub mod container;
pub mod control;
pub mod error;
pub mod expectation;
pub mod line;
pub mod machine;
pub mod plant;
pub mod process;
pub mod record;
pub mod sampler;
pub mod scheduler;
pub mod transfer;

pub use breakdown::BreakdownInjector;
pub use clock::{Clock, Event, EventToken, SimTime};
pub use config::{
    DispatcherConfig, FinishedBufferConfig, LineConfig, MachineConfig, RawBufferConfig,
    SupplierConfig,
};
pub use container::{Container, ContainerError, ContainerId};
pub use control::{DispatcherControl, SupplierControl};
pub use error::{ConfigError, SimError};
pub use expectation::ExpectationMonitor;
pub use line::{ContainerReport, LineReport, MachineReport, MachineSamplers, Node, ProductionLine};
pub use machine::{InputCommit, Machine, MachinePorts, MachineSettings};
pub use plant::{MachineId, MachineStatus, Plant};
pub use process::{Context, Interrupt, Interrupter, Process, ProcessId, Wake, Yield};
pub use record::{
    ExpectationSample, LogisticsEvent, NullObserver, Observation, Observer, Recorder, StepCode,
    StepRecord,
};
pub use sampler::{
    DurationSampler, ExponentialSampler, FixedSampler, NormalSampler, ScriptedSampler, SeedStreams,
};
pub use scheduler::{Delivery, Simulation};
pub use transfer::Transference;
