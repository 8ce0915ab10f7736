//! Scenario builder for line tests.
//!
//! A scenario configures a line, optionally replaces its random durations
//! with fixed ones, injects breakdowns at chosen times, runs to the horizon
//! under the standard invariants and finally hands the outcome to oracles.
//!
//! ```ignore
//! let outcome = Scenario::new()
//!     .with_horizon(200)
//!     .with_fixed_durations(FixedDurations { process: 10, repair: 5, failure: 1_000_000 })
//!     .with_breakdown_at(20, Station::A)
//!     .oracle(Box::new(|outcome| { /* assertions */ Ok(()) }))
//!     .run()?;
//! ```

use std::fmt;

use linesim_core::{
    Delivery, FixedSampler, Interrupt, LineConfig, LineReport, MachineSamplers, Node,
    ProductionLine, Recorder, SimError, SimTime,
};
use tracing::debug;

use crate::{
    checked::CheckedObserver,
    invariants::{InvariantRegistry, PlantSnapshot, Violation},
};

/// Check run against a finished scenario.
pub type Oracle = Box<dyn Fn(&Outcome) -> Result<(), String>>;

/// One of the three machines of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Station {
    /// Machine A
    A,
    /// Machine B
    B,
    /// Machine C, fed by the transfer stage
    C,
}

impl Station {
    fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
        }
    }
}

/// Deterministic durations used for every machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedDurations {
    /// Processing ticks per part
    pub process: SimTime,
    /// Repair ticks per breakdown
    pub repair: SimTime,
    /// Ticks between failures
    pub failure: SimTime,
}

impl FixedDurations {
    fn samplers(self) -> MachineSamplers {
        MachineSamplers {
            process_time: Box::new(FixedSampler(self.process)),
            repair_time: Box::new(FixedSampler(self.repair)),
            time_to_failure: Box::new(FixedSampler(self.failure)),
        }
    }
}

/// What a scenario run produced.
pub struct Outcome {
    /// End-of-run counters.
    pub report: LineReport,
    /// Every observation of the run.
    pub recorder: Recorder,
    /// Machines with their buffers.
    pub nodes: [Node; 3],
    /// Plant counters at the horizon.
    pub final_state: PlantSnapshot,
    /// Result of each injected breakdown, in injection order.
    pub deliveries: Vec<Delivery>,
}

impl Outcome {
    /// Node of `station`.
    pub fn node(&self, station: Station) -> Node {
        self.nodes[station.index()]
    }
}

/// Why a scenario failed.
#[derive(Debug)]
pub enum ScenarioError {
    /// The line could not be built or a process failed.
    Sim(SimError),
    /// One or more invariants were violated.
    Violations(Vec<(SimTime, Violation)>),
    /// An oracle rejected the outcome.
    Oracle(String),
}

impl fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sim(err) => write!(f, "simulation failed: {err}"),
            Self::Violations(violations) => {
                write!(f, "{} invariant violations", violations.len())?;
                for (time, violation) in violations {
                    write!(f, "\n  t={time}: {violation}")?;
                }
                Ok(())
            },
            Self::Oracle(message) => write!(f, "oracle failed: {message}"),
        }
    }
}

impl std::error::Error for ScenarioError {}

impl From<SimError> for ScenarioError {
    fn from(err: SimError) -> Self {
        Self::Sim(err)
    }
}

/// Line test scenario.
pub struct Scenario {
    config: LineConfig,
    durations: Option<FixedDurations>,
    breakdowns: Vec<(SimTime, Station)>,
    oracles: Vec<Oracle>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario {
    /// Scenario over the default line.
    pub fn new() -> Self {
        Self::with_config(LineConfig::default())
    }

    /// Scenario over `config`.
    pub fn with_config(config: LineConfig) -> Self {
        Self { config, durations: None, breakdowns: Vec::new(), oracles: Vec::new() }
    }

    /// Override the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Override the horizon.
    #[must_use]
    pub fn with_horizon(mut self, horizon: SimTime) -> Self {
        self.config.horizon = horizon;
        self
    }

    /// Replace every machine's random durations.
    #[must_use]
    pub fn with_fixed_durations(mut self, durations: FixedDurations) -> Self {
        self.durations = Some(durations);
        self
    }

    /// Interrupt `station` with a breakdown once every event up to `time` ran.
    #[must_use]
    pub fn with_breakdown_at(mut self, time: SimTime, station: Station) -> Self {
        self.breakdowns.push((time, station));
        self
    }

    /// Add an oracle.
    #[must_use]
    pub fn oracle(mut self, oracle: Oracle) -> Self {
        self.oracles.push(oracle);
        self
    }

    /// Run to the horizon under the standard invariants, then apply every
    /// oracle.
    pub fn run(self) -> Result<Outcome, ScenarioError> {
        let Self { config, durations, mut breakdowns, oracles } = self;

        let mut line = match durations {
            Some(durations) => ProductionLine::build_with(config, |_, _| Ok(durations.samplers()))?,
            None => ProductionLine::build(config)?,
        };
        let mut observer =
            CheckedObserver::wrapping(Recorder::new(), InvariantRegistry::standard());

        breakdowns.sort_by_key(|&(time, _)| time);
        let mut deliveries = Vec::with_capacity(breakdowns.len());
        for (time, station) in breakdowns {
            line.run_until(time, &mut observer)?;
            let target = line.nodes()[station.index()].process;
            let delivery = line.interrupt(target, Interrupt::Breakdown);
            debug!(time = line.now(), ?station, ?delivery, "injected breakdown");
            deliveries.push(delivery);
        }

        let report = line.run(&mut observer)?;
        if !observer.is_clean() {
            return Err(ScenarioError::Violations(observer.violations().to_vec()));
        }

        let outcome = Outcome {
            report,
            recorder: observer.into_inner(),
            nodes: *line.nodes(),
            final_state: PlantSnapshot::capture(line.now(), line.plant()),
            deliveries,
        };
        for oracle in &oracles {
            oracle(&outcome).map_err(ScenarioError::Oracle)?;
        }

        Ok(outcome)
    }
}
