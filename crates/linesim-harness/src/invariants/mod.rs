//! Invariant checking for line simulations.
//!
//! Invariants are properties that must hold after every scheduler step,
//! whatever the seed, configuration or injected interrupts.
//!
//! # Architecture
//!
//! [`PlantSnapshot::capture`] copies the plant's counters after a step. The
//! current and previous snapshot form a [`SystemSnapshot`], which every
//! registered [`Invariant`] is checked against.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = SystemSnapshot::first(PlantSnapshot::capture(now, plant));
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    CompletionNotInFuture, ContainerBounds, CounterMonotonicity, NoProgressWhileBroken,
    TimeMonotonicity,
};
pub use snapshot::{ContainerSnapshot, MachineSnapshot, PlantSnapshot, SystemSnapshot};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Which invariant a [`Violation`] broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// Levels stay within capacity
    ContainerBounds,
    /// Time never decreases
    TimeMonotonicity,
    /// Cumulative counters never decrease
    CounterMonotonicity,
    /// Last completion is never after now
    CompletionNotInFuture,
    /// Broken machines complete nothing
    NoProgressWhileBroken,
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ContainerBounds => "container bounds",
            Self::TimeMonotonicity => "time monotonicity",
            Self::CounterMonotonicity => "counter monotonicity",
            Self::CompletionNotInFuture => "completion not in future",
            Self::NoProgressWhileBroken => "no progress while broken",
        };
        f.write_str(name)
    }
}

/// Invariant violation with context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which invariant was violated.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property checked against plant state after a step.
pub trait Invariant: Send + Sync {
    /// Invariant identity for error reporting.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every standard invariant.
    ///
    /// Includes:
    /// - [`ContainerBounds`]
    /// - [`TimeMonotonicity`]
    /// - [`CounterMonotonicity`]
    /// - [`CompletionNotInFuture`]
    /// - [`NoProgressWhileBroken`]
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ContainerBounds);
        registry.add(TimeMonotonicity);
        registry.add(CounterMonotonicity);
        registry.add(CompletionNotInFuture);
        registry.add(NoProgressWhileBroken);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation found.
    ///
    /// Use this in tests where you want immediate failure with context.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
