//! Standard invariant checks.
//!
//! These hold after every scheduler step of any line, whatever the seed or
//! configuration.

use super::{Invariant, InvariantKind, InvariantResult, SystemSnapshot, Violation};

/// No container is ever above its capacity.
pub struct ContainerBounds;

impl Invariant for ContainerBounds {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ContainerBounds
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for container in &state.current.containers {
            if container.level > container.capacity {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "{}: level {} above capacity {}",
                        container.name, container.level, container.capacity
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Simulated time never goes backwards between steps.
pub struct TimeMonotonicity;

impl Invariant for TimeMonotonicity {
    fn kind(&self) -> InvariantKind {
        InvariantKind::TimeMonotonicity
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        match &state.previous {
            Some(previous) if state.current.time < previous.time => Err(Violation {
                invariant: self.kind(),
                message: format!("time went from {} back to {}", previous.time, state.current.time),
            }),
            _ => Ok(()),
        }
    }
}

/// Cumulative counters never decrease.
///
/// Covers container picked/stored/delivered and machine parts, breakdowns,
/// downtime and last completion.
pub struct CounterMonotonicity;

impl Invariant for CounterMonotonicity {
    fn kind(&self) -> InvariantKind {
        InvariantKind::CounterMonotonicity
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (before, after) in state.container_pairs() {
            let counters = [
                ("picked", before.picked, after.picked),
                ("stored", before.stored, after.stored),
                ("delivered", before.delivered, after.delivered),
            ];
            if let Some((counter, from, to)) =
                counters.into_iter().find(|(_, from, to)| to < from)
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("{}: {counter} decreased {from} -> {to}", after.name),
                });
            }
        }

        for (before, after) in state.machine_pairs() {
            let counters = [
                ("parts_made", before.parts_made, after.parts_made),
                ("breakdowns", before.breakdowns, after.breakdowns),
                ("downtime", before.downtime, after.downtime),
                ("last_completion", before.last_completion, after.last_completion),
            ];
            if let Some((counter, from, to)) =
                counters.into_iter().find(|(_, from, to)| to < from)
            {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("{}: {counter} decreased {from} -> {to}", after.name),
                });
            }
        }

        Ok(())
    }
}

/// A part can only be completed in the past.
pub struct CompletionNotInFuture;

impl Invariant for CompletionNotInFuture {
    fn kind(&self) -> InvariantKind {
        InvariantKind::CompletionNotInFuture
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let now = state.current.time;
        for machine in &state.current.machines {
            if machine.last_completion > now {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "{}: last completion {} after now {now}",
                        machine.name, machine.last_completion
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A machine that stays broken across a step completes nothing in it.
pub struct NoProgressWhileBroken;

impl Invariant for NoProgressWhileBroken {
    fn kind(&self) -> InvariantKind {
        InvariantKind::NoProgressWhileBroken
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for (before, after) in state.machine_pairs() {
            if before.broken && after.broken && after.parts_made != before.parts_made {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "{}: parts {} -> {} while broken",
                        after.name, before.parts_made, after.parts_made
                    ),
                });
            }
        }
        Ok(())
    }
}
