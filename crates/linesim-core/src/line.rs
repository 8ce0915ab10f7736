//! The three-machine line.
//!
//! ```text
//! input A ─> Machine A ─> output A ─┐
//!                                   ├─> transfer ─> input C ─> Machine C ─> output C
//! input B ─> Machine B ─> output B ─┘
//! ```
//!
//! Processes are spawned in a fixed order: the six buffer controllers, then
//! machine A and B (each with its breakdown injector and expectation monitor),
//! then the transfer stage, then machine C. Same-tick ordering, and with it
//! every trace, depends on this order.

use std::fmt;

use tracing::info;

use crate::{
    breakdown::BreakdownInjector,
    clock::SimTime,
    config::{LineConfig, MachineConfig},
    container::ContainerId,
    control::{DispatcherControl, SupplierControl},
    error::{ConfigError, SimError},
    expectation::ExpectationMonitor,
    machine::{Machine, MachinePorts},
    plant::{MachineId, Plant},
    process::{Interrupt, ProcessId},
    record::Observer,
    sampler::{DurationSampler, ExponentialSampler, NormalSampler, SeedStreams},
    scheduler::{Delivery, Simulation},
    transfer::Transference,
};

/// Duration sources for one machine.
#[derive(Debug)]
pub struct MachineSamplers {
    /// Processing time per part
    pub process_time: Box<dyn DurationSampler>,
    /// Repair time per breakdown
    pub repair_time: Box<dyn DurationSampler>,
    /// Time between failures
    pub time_to_failure: Box<dyn DurationSampler>,
}

impl MachineSamplers {
    /// Normal processing, exponential repair and failure, each on its own
    /// stream taken from `streams`.
    ///
    /// # Errors
    ///
    /// - `ConfigError` if a distribution parameter is unusable
    pub fn stochastic(
        machine: &str,
        config: &MachineConfig,
        streams: &mut SeedStreams,
    ) -> Result<Self, ConfigError> {
        let process_time = NormalSampler::new(
            machine,
            config.mean_process_time,
            config.sigma_process_time,
            streams.next_rng(),
        )?;
        let repair_time =
            ExponentialSampler::with_mean(machine, "mttr", config.mttr, streams.next_rng())?;
        let time_to_failure =
            ExponentialSampler::with_mean(machine, "mttf", config.mttf, streams.next_rng())?;

        Ok(Self {
            process_time: Box::new(process_time),
            repair_time: Box::new(repair_time),
            time_to_failure: Box::new(time_to_failure),
        })
    }
}

/// Ids of one machine and its buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Board entry
    pub machine: MachineId,
    /// Raw buffer
    pub raw: ContainerId,
    /// Finished buffer
    pub finished: ContainerId,
    /// Machine process
    pub process: ProcessId,
}

/// End-of-run counters for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerReport {
    /// Container name
    pub name: String,
    /// Final level
    pub level: u64,
    /// Capacity
    pub capacity: u64,
    /// Units taken by the consuming machine
    pub picked: u64,
    /// Units put by the producing machine
    pub stored: u64,
    /// Units removed by a dispatcher
    pub delivered: u64,
}

/// End-of-run counters for one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineReport {
    /// Machine name
    pub name: String,
    /// Parts completed
    pub parts_made: u64,
    /// Completed repairs
    pub breakdowns: u64,
    /// Ticks spent under repair
    pub downtime: SimTime,
}

/// End-of-run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineReport {
    /// Simulated time of the report
    pub time: SimTime,
    /// Containers in registration order
    pub containers: Vec<ContainerReport>,
    /// Machines in registration order
    pub machines: Vec<MachineReport>,
    /// Units dispatched from the last buffer plus what is still waiting there
    pub total_delivered: u64,
}

impl fmt::Display for LineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "line report at t={}", self.time)?;
        for c in &self.containers {
            writeln!(
                f,
                "  {}: level {}/{}, picked {}, stored {}, delivered {}",
                c.name, c.level, c.capacity, c.picked, c.stored, c.delivered
            )?;
        }
        for m in &self.machines {
            writeln!(
                f,
                "  {}: {} parts, {} breakdowns, {} ticks down",
                m.name, m.parts_made, m.breakdowns, m.downtime
            )?;
        }
        write!(f, "  total delivered: {}", self.total_delivered)
    }
}

/// The canonical line, built from a [`LineConfig`].
pub struct ProductionLine {
    config: LineConfig,
    sim: Simulation,
    nodes: [Node; 3],
}

impl ProductionLine {
    /// Validate `config` and build the line with seeded random samplers.
    ///
    /// # Errors
    ///
    /// - `SimError::Config` if `config` is invalid
    pub fn build(config: LineConfig) -> Result<Self, SimError> {
        let mut streams = SeedStreams::new(config.seed);
        Self::build_with(config, |name, machine| {
            MachineSamplers::stochastic(name, machine, &mut streams)
        })
    }

    /// Validate `config` and build the line with caller-supplied samplers,
    /// requested once per machine in line order.
    ///
    /// # Errors
    ///
    /// - `SimError::Config` if `config` is invalid or `samplers` fails
    pub fn build_with<F>(config: LineConfig, mut samplers: F) -> Result<Self, SimError>
    where
        F: FnMut(&str, &MachineConfig) -> Result<MachineSamplers, ConfigError>,
    {
        config.validate()?;

        let mut plant = Plant::new();
        let mut raw = Vec::with_capacity(3);
        let mut finished = Vec::with_capacity(3);
        for ((raw_name, raw_config), (finished_name, finished_config)) in
            config.raw_buffers().into_iter().zip(config.finished_buffers())
        {
            raw.push(plant.add_container(raw_name, raw_config.capacity, raw_config.initial)?);
            finished.push(plant.add_container(
                finished_name,
                finished_config.capacity,
                finished_config.initial,
            )?);
        }
        let machines: Vec<_> =
            config.machines().iter().map(|(name, _)| plant.add_machine(*name)).collect();

        let mut sim = Simulation::new(plant);

        for (i, ((raw_name, raw_config), (finished_name, finished_config))) in
            config.raw_buffers().into_iter().zip(config.finished_buffers()).enumerate()
        {
            sim.spawn(Box::new(SupplierControl::new(
                format!("{raw_name} supplier"),
                raw[i],
                raw_config.supplier.clone(),
            )));
            sim.spawn(Box::new(DispatcherControl::new(
                format!("{finished_name} dispatcher"),
                finished[i],
                finished_config.dispatcher.clone(),
            )));
        }

        let means: Vec<f64> = config.machines().iter().map(|(_, m)| m.mean_process_time).collect();
        let tolerance = ExpectationMonitor::tolerance_for(&means);

        let mut spawn_machine = |sim: &mut Simulation, i: usize| -> Result<Node, SimError> {
            let (name, machine_config) = config.machines()[i];
            let ports = MachinePorts { machine: machines[i], input: raw[i], output: finished[i] };
            let MachineSamplers { process_time, repair_time, time_to_failure } =
                samplers(name, machine_config)?;

            let process = sim.spawn(Box::new(Machine::new(
                name,
                ports,
                machine_config.settings(),
                process_time,
                repair_time,
            )));
            sim.spawn(Box::new(BreakdownInjector::new(
                format!("{name} breakdowns"),
                ports.machine,
                process,
                time_to_failure,
            )));
            sim.spawn(Box::new(ExpectationMonitor::new(
                format!("{name} expectation"),
                ports.machine,
                machine_config.mean_process_time,
                tolerance,
            )));

            Ok(Node { machine: ports.machine, raw: ports.input, finished: ports.output, process })
        };

        let node_a = spawn_machine(&mut sim, 0)?;
        let node_b = spawn_machine(&mut sim, 1)?;
        sim.spawn(Box::new(Transference::new(
            "from A and B to C",
            vec![node_a.finished, node_b.finished],
            raw[2],
        )));
        let node_c = spawn_machine(&mut sim, 2)?;

        info!(
            seed = config.seed,
            horizon = config.horizon,
            processes = sim.process_count(),
            tolerance,
            "line built"
        );

        Ok(Self { config, sim, nodes: [node_a, node_b, node_c] })
    }

    /// Configuration the line was built from.
    pub fn config(&self) -> &LineConfig {
        &self.config
    }

    /// Machine A, B and C with their buffers.
    pub fn nodes(&self) -> &[Node; 3] {
        &self.nodes
    }

    /// Current simulated time.
    pub fn now(&self) -> SimTime {
        self.sim.now()
    }

    /// Shared plant state.
    pub fn plant(&self) -> &Plant {
        self.sim.plant()
    }

    /// Interrupt a process directly.
    pub fn interrupt(&mut self, target: ProcessId, cause: Interrupt) -> Delivery {
        self.sim.interrupt(target, cause)
    }

    /// Advance to `end_time` (capped at the horizon).
    ///
    /// # Errors
    ///
    /// The first process failure.
    pub fn run_until(
        &mut self,
        end_time: SimTime,
        observer: &mut dyn Observer,
    ) -> Result<(), SimError> {
        self.sim.run_until(end_time.min(self.config.horizon), observer)
    }

    /// Run to the horizon and report.
    ///
    /// # Errors
    ///
    /// The first process failure.
    pub fn run(&mut self, observer: &mut dyn Observer) -> Result<LineReport, SimError> {
        self.run_until(self.config.horizon, observer)?;

        let report = self.report();
        info!(
            time = report.time,
            total_delivered = report.total_delivered,
            steps = self.sim.steps(),
            "run complete"
        );
        Ok(report)
    }

    /// Counters as they stand now.
    pub fn report(&self) -> LineReport {
        let plant = self.sim.plant();
        let containers = plant
            .containers()
            .map(|(_, c)| ContainerReport {
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
            .map(|(_, m)| MachineReport {
                name: m.name.clone(),
                parts_made: m.parts_made,
                breakdowns: m.breakdowns,
                downtime: m.downtime,
            })
            .collect();

        let last = plant.container(self.nodes[2].finished);
        LineReport {
            time: self.sim.now(),
            containers,
            machines,
            total_delivered: last.delivered() + last.level(),
        }
    }
}
