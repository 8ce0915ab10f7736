//! Shared simulation state.
//!
//! The plant is the arena every process works against: the containers and a
//! status board with one entry per machine. Ids are only minted here, so a
//! `ContainerId` or `MachineId` always indexes a live entry.
//!
//! Machine status is written only by the machine it describes. Breakdown
//! injectors and expectation monitors read it.

use crate::{
    clock::SimTime,
    container::{Container, ContainerError, ContainerId},
};

/// Index of a machine on the status board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MachineId(usize);

impl MachineId {
    /// Raw board index.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Observable state of one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineStatus {
    /// Machine name
    pub name: String,
    /// Parts completed so far
    pub parts_made: u64,
    /// Whether the machine is waiting for repair
    pub broken: bool,
    /// Time of the most recent part completion (0 before the first)
    pub last_completion: SimTime,
    /// Number of completed repairs
    pub breakdowns: u64,
    /// Total ticks spent under repair
    pub downtime: SimTime,
}

impl MachineStatus {
    fn new(name: String) -> Self {
        Self { name, parts_made: 0, broken: false, last_completion: 0, breakdowns: 0, downtime: 0 }
    }
}

/// Containers plus the machine status board.
#[derive(Debug, Clone, Default)]
pub struct Plant {
    containers: Vec<Container>,
    machines: Vec<MachineStatus>,
}

impl Plant {
    /// Empty plant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a container.
    ///
    /// # Errors
    ///
    /// - `ContainerError::Overflow` if `initial > capacity`
    pub fn add_container(
        &mut self,
        name: impl Into<String>,
        capacity: u64,
        initial: u64,
    ) -> Result<ContainerId, ContainerError> {
        let container = Container::new(name, capacity, initial)?;
        self.containers.push(container);
        Ok(ContainerId(self.containers.len() - 1))
    }

    /// Register a machine on the status board.
    pub fn add_machine(&mut self, name: impl Into<String>) -> MachineId {
        self.machines.push(MachineStatus::new(name.into()));
        MachineId(self.machines.len() - 1)
    }

    /// Container by id.
    pub fn container(&self, id: ContainerId) -> &Container {
        &self.containers[id.0]
    }

    /// Mutable container by id.
    pub fn container_mut(&mut self, id: ContainerId) -> &mut Container {
        &mut self.containers[id.0]
    }

    /// All containers in registration order.
    pub fn containers(&self) -> impl Iterator<Item = (ContainerId, &Container)> {
        self.containers.iter().enumerate().map(|(i, c)| (ContainerId(i), c))
    }

    /// Machine status by id.
    pub fn machine(&self, id: MachineId) -> &MachineStatus {
        &self.machines[id.0]
    }

    /// Mutable machine status by id.
    pub fn machine_mut(&mut self, id: MachineId) -> &mut MachineStatus {
        &mut self.machines[id.0]
    }

    /// All machines in registration order.
    pub fn machines(&self) -> impl Iterator<Item = (MachineId, &MachineStatus)> {
        self.machines.iter().enumerate().map(|(i, m)| (MachineId(i), m))
    }

    /// Look a container up by name.
    pub fn container_by_name(&self, name: &str) -> Option<ContainerId> {
        self.containers.iter().position(|c| c.name() == name).map(ContainerId)
    }

    /// Look a machine up by name.
    pub fn machine_by_name(&self, name: &str) -> Option<MachineId> {
        self.machines.iter().position(|m| m.name == name).map(MachineId)
    }
}
