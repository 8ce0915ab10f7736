//! Observable plant state for invariant checking.
//!
//! Snapshots copy the plant's counters at one simulated instant. Invariants
//! operate on snapshots rather than the live plant so that a check always
//! sees one consistent step boundary.

use linesim_core::{Plant, SimTime};
use serde::Serialize;

/// One container's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSnapshot {
    /// Container name.
    pub name: String,
    /// Current level.
    pub level: u64,
    /// Capacity.
    pub capacity: u64,
    /// Units taken by the consuming machine.
    pub picked: u64,
    /// Units put by the producing machine.
    pub stored: u64,
    /// Units removed by a dispatcher.
    pub delivered: u64,
}

/// One machine's status board entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineSnapshot {
    /// Machine name.
    pub name: String,
    /// Parts completed.
    pub parts_made: u64,
    /// Under repair.
    pub broken: bool,
    /// Time of the last completed part.
    pub last_completion: SimTime,
    /// Completed repairs.
    pub breakdowns: u64,
    /// Ticks spent under repair.
    pub downtime: SimTime,
}

/// Plant state at one step boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlantSnapshot {
    /// Simulated time of the step.
    pub time: SimTime,
    /// Containers in registration order.
    pub containers: Vec<ContainerSnapshot>,
    /// Machines in registration order.
    pub machines: Vec<MachineSnapshot>,
}

impl PlantSnapshot {
    /// Copy the counters of `plant` at `time`.
    pub fn capture(time: SimTime, plant: &Plant) -> Self {
        let containers = plant
            .containers()
            .map(|(_, c)| ContainerSnapshot {
                name: c.name().to_string(),
                level: c.level(),
                capacity: c.capacity(),
                picked: c.picked(),
                stored: c.stored(),
                delivered: c.delivered(),
            })
            .collect();
        let machines = plant
            .machines()
            .map(|(_, m)| MachineSnapshot {
                name: m.name.clone(),
                parts_made: m.parts_made,
                broken: m.broken,
                last_completion: m.last_completion,
                breakdowns: m.breakdowns,
                downtime: m.downtime,
            })
            .collect();

        Self { time, containers, machines }
    }
}

/// The state an invariant is checked against: the step just taken and the
/// one before it, if any.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// State after the previous step. `None` on the first check.
    pub previous: Option<PlantSnapshot>,
    /// State after the current step.
    pub current: PlantSnapshot,
}

impl SystemSnapshot {
    /// Snapshot with no plant at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// First check of a run.
    pub fn first(current: PlantSnapshot) -> Self {
        Self { previous: None, current }
    }

    /// Check of one step against the step before it.
    pub fn transition(previous: PlantSnapshot, current: PlantSnapshot) -> Self {
        Self { previous: Some(previous), current }
    }

    /// Previous and current state of every machine present in both.
    pub fn machine_pairs(&self) -> impl Iterator<Item = (&MachineSnapshot, &MachineSnapshot)> {
        self.previous
            .iter()
            .flat_map(|previous| previous.machines.iter().zip(&self.current.machines))
    }

    /// Previous and current state of every container present in both.
    pub fn container_pairs(
        &self,
    ) -> impl Iterator<Item = (&ContainerSnapshot, &ContainerSnapshot)> {
        self.previous
            .iter()
            .flat_map(|previous| previous.containers.iter().zip(&self.current.containers))
    }
}
