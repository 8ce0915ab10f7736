//! Test harness for line simulations.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks behavioral properties after every
//! scheduler step. [`CheckedObserver`] plugs an [`InvariantRegistry`] into a
//! run as an ordinary observer. Use [`InvariantRegistry::standard()`] for the
//! properties every line must satisfy.
//!
//! # Scenarios
//!
//! [`Scenario`] builds a line, optionally with fixed durations and injected
//! breakdowns, runs it under the standard invariants and hands the
//! [`Outcome`] to oracles.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checked;
pub mod invariants;
pub mod scenario;

pub use checked::CheckedObserver;
pub use invariants::{
    CompletionNotInFuture, ContainerBounds, ContainerSnapshot, CounterMonotonicity, Invariant,
    InvariantKind, InvariantRegistry, InvariantResult, MachineSnapshot, NoProgressWhileBroken,
    PlantSnapshot, SystemSnapshot, TimeMonotonicity, Violation,
};
pub use scenario::{FixedDurations, Oracle, Outcome, Scenario, ScenarioError, Station};
