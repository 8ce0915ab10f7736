//! Observer that checks invariants after every step.

use linesim_core::{NullObserver, Observation, Observer, Plant, SimTime};
use tracing::warn;

use crate::invariants::{InvariantRegistry, PlantSnapshot, SystemSnapshot, Violation};

/// Runs an [`InvariantRegistry`] after every scheduler step and forwards
/// observations to an inner observer.
///
/// Violations are collected rather than raised, so a run always completes and
/// the caller sees every step that went wrong.
pub struct CheckedObserver<O = NullObserver> {
    inner: O,
    registry: InvariantRegistry,
    previous: Option<PlantSnapshot>,
    violations: Vec<(SimTime, Violation)>,
    checks: u64,
}

impl CheckedObserver {
    /// Check `registry`, discarding observations.
    pub fn new(registry: InvariantRegistry) -> Self {
        Self::wrapping(NullObserver, registry)
    }
}

impl<O: Observer> CheckedObserver<O> {
    /// Check `registry` and forward everything to `inner`.
    pub fn wrapping(inner: O, registry: InvariantRegistry) -> Self {
        Self { inner, registry, previous: None, violations: Vec::new(), checks: 0 }
    }

    /// The wrapped observer.
    pub fn inner(&self) -> &O {
        &self.inner
    }

    /// Unwrap the inner observer.
    pub fn into_inner(self) -> O {
        self.inner
    }

    /// Every violation found, with the time of the step that caused it.
    pub fn violations(&self) -> &[(SimTime, Violation)] {
        &self.violations
    }

    /// Number of steps checked.
    pub fn checks(&self) -> u64 {
        self.checks
    }

    /// No violation so far.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

impl<O: Observer> Observer for CheckedObserver<O> {
    fn observe(&mut self, observation: &Observation) {
        self.inner.observe(observation);
    }

    fn after_step(&mut self, now: SimTime, plant: &Plant) {
        self.inner.after_step(now, plant);

        let current = PlantSnapshot::capture(now, plant);
        let state = match self.previous.take() {
            Some(previous) => SystemSnapshot::transition(previous, current),
            None => SystemSnapshot::first(current),
        };

        if let Err(violations) = self.registry.check_all(&state) {
            for violation in violations {
                warn!(time = now, %violation, "invariant violated");
                self.violations.push((now, violation));
            }
        }

        self.checks += 1;
        self.previous = Some(state.current);
    }
}
