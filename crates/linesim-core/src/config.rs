//! Line configuration.
//!
//! One immutable [`LineConfig`] describes the whole run. `Default` reproduces
//! the reference plant: three machines, two feeding a third through a
//! transfer stage, running for 36 eight-hour shifts. Every field is validated
//! once by [`LineConfig::validate`] before anything is built.
//!
//! When deserialized, any missing top-level table takes its default, but a
//! table that is present must be complete, so a partial `[raw_c]` cannot
//! silently pick up another buffer's defaults.

use serde::{Deserialize, Serialize};

use crate::{
    clock::SimTime,
    error::ConfigError,
    machine::{InputCommit, MachineSettings},
};

/// Ticks in one eight-hour shift, one tick per second.
pub const SHIFT: SimTime = 60 * 60 * 8;

/// Default horizon: 36 shifts.
pub const DEFAULT_HORIZON: SimTime = SHIFT * 36;

/// Default run seed.
pub const DEFAULT_SEED: u64 = 42;

/// Replenishment of a raw material buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierConfig {
    /// Whether the supplier runs at all
    pub enabled: bool,
    /// Refill when the level is at or below this
    pub critical_level: u64,
    /// Ticks between the call and the delivery
    pub lead_time: SimTime,
    /// Units delivered per refill
    pub standard_supply: u64,
    /// Ticks to wait after a refill before checking again
    pub after_refill_check_time: SimTime,
    /// Ticks between ordinary checks
    pub standard_check_time: SimTime,
}

impl SupplierConfig {
    /// Supplier that never runs.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }
}

impl Default for SupplierConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_level: 50,
            lead_time: 0,
            standard_supply: 50,
            after_refill_check_time: 8,
            standard_check_time: 1,
        }
    }
}

/// Emptying of a finished goods buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Whether the dispatcher runs at all
    pub enabled: bool,
    /// Dispatch when the level is at or above this
    pub critical_level: u64,
    /// Ticks between the call and the pickup
    pub lead_time: SimTime,
    /// Ticks to wait after a pickup before checking again
    pub retrieved_check_time: SimTime,
    /// Ticks between ordinary checks
    pub standard_check_time: SimTime,
}

impl DispatcherConfig {
    /// Dispatcher that never runs.
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            critical_level: 50,
            lead_time: 0,
            retrieved_check_time: 8,
            standard_check_time: 1,
        }
    }
}

/// Raw material buffer feeding a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBufferConfig {
    /// Maximum level
    pub capacity: u64,
    /// Level at t=0
    pub initial: u64,
    /// Replenishment policy
    pub supplier: SupplierConfig,
}

/// Finished goods buffer fed by a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishedBufferConfig {
    /// Maximum level
    pub capacity: u64,
    /// Level at t=0
    pub initial: u64,
    /// Dispatch policy
    pub dispatcher: DispatcherConfig,
}

fn one() -> SimTime {
    1
}

fn enabled() -> bool {
    true
}

/// One machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    /// Mean of the normal processing time
    pub mean_process_time: f64,
    /// Standard deviation of the normal processing time
    pub sigma_process_time: f64,
    /// Mean time to failure
    pub mttf: f64,
    /// Mean time to repair
    pub mttr: f64,
    /// Input handling ticks
    #[serde(default = "one")]
    pub handling_in: SimTime,
    /// Output handling ticks
    #[serde(default = "one")]
    pub handling_out: SimTime,
    /// Breakdowns during material handling
    #[serde(default = "enabled")]
    pub logistic_breakdowns: bool,
    /// Breakdowns during processing
    #[serde(default = "enabled")]
    pub processing_breakdowns: bool,
    /// When input is consumed
    #[serde(default)]
    pub input_commit: InputCommit,
}

impl MachineConfig {
    /// Machine with the given distributions and default handling.
    pub fn new(mean_process_time: f64, sigma_process_time: f64, mttf: f64, mttr: f64) -> Self {
        Self {
            mean_process_time,
            sigma_process_time,
            mttf,
            mttr,
            handling_in: 1,
            handling_out: 1,
            logistic_breakdowns: true,
            processing_breakdowns: true,
            input_commit: InputCommit::default(),
        }
    }

    /// Runtime parameters of the machine process.
    pub fn settings(&self) -> MachineSettings {
        MachineSettings {
            mttf: self.mttf,
            handling_in: self.handling_in,
            handling_out: self.handling_out,
            logistic_breakdowns: self.logistic_breakdowns,
            processing_breakdowns: self.processing_breakdowns,
            input_commit: self.input_commit,
        }
    }

    fn validate(&self, machine: &str) -> Result<(), ConfigError> {
        let (mean, sigma) = (self.mean_process_time, self.sigma_process_time);
        if !(mean.is_finite() && sigma.is_finite()) || mean < 0.0 || sigma < 0.0 {
            return Err(ConfigError::InvalidProcessTime {
                machine: machine.to_string(),
                mean,
                sigma,
            });
        }

        for (field, value) in [("mttf", self.mttf), ("mttr", self.mttr)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidRate { machine: machine.to_string(), field, value });
            }
        }

        Ok(())
    }
}

/// Whole-line configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineConfig {
    /// Master seed for every random stream
    pub seed: u64,
    /// Simulated ticks to run
    pub horizon: SimTime,
    /// Raw material for machine A
    pub raw_a: RawBufferConfig,
    /// Output of machine A
    pub finished_a: FinishedBufferConfig,
    /// Raw material for machine B
    pub raw_b: RawBufferConfig,
    /// Output of machine B
    pub finished_b: FinishedBufferConfig,
    /// Transfer destination, raw material for machine C
    pub raw_c: RawBufferConfig,
    /// Output of machine C
    pub finished_c: FinishedBufferConfig,
    /// Machine A
    pub machine_a: MachineConfig,
    /// Machine B
    pub machine_b: MachineConfig,
    /// Machine C
    pub machine_c: MachineConfig,
}

impl Default for LineConfig {
    fn default() -> Self {
        let raw = |initial| RawBufferConfig {
            capacity: 500,
            initial,
            supplier: SupplierConfig::default(),
        };
        let finished = |dispatcher| FinishedBufferConfig { capacity: 500, initial: 0, dispatcher };

        Self {
            seed: DEFAULT_SEED,
            horizon: DEFAULT_HORIZON,
            raw_a: raw(200),
            finished_a: finished(DispatcherConfig::disabled()),
            raw_b: raw(200),
            finished_b: finished(DispatcherConfig::disabled()),
            raw_c: RawBufferConfig {
                capacity: 500,
                initial: 0,
                supplier: SupplierConfig::disabled(),
            },
            finished_c: finished(DispatcherConfig::default()),
            machine_a: MachineConfig::new(250.0, 15.0, 77_760.0, 10_800.0),
            machine_b: MachineConfig::new(250.0, 15.0, 86_400.0, 12_000.0),
            machine_c: MachineConfig::new(230.0, 10.0, 100_800.0, 1_920.0),
        }
    }
}

impl LineConfig {
    /// Reject configurations the line cannot run.
    ///
    /// # Errors
    ///
    /// The first [`ConfigError`] found, checking buffers in line order and
    /// then machines.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.horizon == 0 {
            return Err(ConfigError::ZeroHorizon);
        }

        for (node, raw) in self.raw_buffers() {
            validate_levels(node, raw.capacity, raw.initial)?;
            validate_supplier(node, raw.capacity, &raw.supplier)?;
        }
        for (node, finished) in self.finished_buffers() {
            validate_levels(node, finished.capacity, finished.initial)?;
            validate_dispatcher(node, &finished.dispatcher)?;
        }
        for (machine, config) in self.machines() {
            config.validate(machine)?;
        }

        Ok(())
    }

    /// Raw buffers with their container names.
    pub fn raw_buffers(&self) -> [(&'static str, &RawBufferConfig); 3] {
        [("input A", &self.raw_a), ("input B", &self.raw_b), ("input C", &self.raw_c)]
    }

    /// Finished buffers with their container names.
    pub fn finished_buffers(&self) -> [(&'static str, &FinishedBufferConfig); 3] {
        [
            ("output A", &self.finished_a),
            ("output B", &self.finished_b),
            ("output C", &self.finished_c),
        ]
    }

    /// Machines with their names.
    pub fn machines(&self) -> [(&'static str, &MachineConfig); 3] {
        [
            ("Machine A", &self.machine_a),
            ("Machine B", &self.machine_b),
            ("Machine C", &self.machine_c),
        ]
    }
}

fn validate_levels(node: &str, capacity: u64, initial: u64) -> Result<(), ConfigError> {
    if capacity == 0 {
        return Err(ConfigError::ZeroCapacity { node: node.to_string() });
    }
    if initial > capacity {
        return Err(ConfigError::InitialAboveCapacity { node: node.to_string(), initial, capacity });
    }
    Ok(())
}

fn validate_supplier(
    node: &str,
    capacity: u64,
    supplier: &SupplierConfig,
) -> Result<(), ConfigError> {
    if !supplier.enabled {
        return Ok(());
    }

    let fits = supplier
        .critical_level
        .checked_add(supplier.standard_supply)
        .is_some_and(|peak| peak <= capacity);
    if !fits {
        return Err(ConfigError::SupplyOverflow {
            node: node.to_string(),
            critical: supplier.critical_level,
            supply: supplier.standard_supply,
            capacity,
        });
    }

    require_positive(node, "after_refill_check_time", supplier.after_refill_check_time)?;
    require_positive(node, "standard_check_time", supplier.standard_check_time)
}

fn validate_dispatcher(node: &str, dispatcher: &DispatcherConfig) -> Result<(), ConfigError> {
    if !dispatcher.enabled {
        return Ok(());
    }

    require_positive(node, "retrieved_check_time", dispatcher.retrieved_check_time)?;
    require_positive(node, "standard_check_time", dispatcher.standard_check_time)
}

fn require_positive(node: &str, field: &'static str, value: SimTime) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroCheckInterval { node: node.to_string(), field });
    }
    Ok(())
}
