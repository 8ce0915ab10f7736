//! Error types for the simulation core.
//!
//! Three families, none of them recoverable mid-run:
//! - [`ConfigError`]: rejected at setup, before simulated time starts
//! - [`crate::container::ContainerError`]: a level invariant was violated
//! - [`SimError::NegativeDuration`]: a sampled wait came out negative
//!
//! Errors raised inside a process are wrapped in [`SimError::Process`] so the
//! abort names the simulated time and the process that failed.

use thiserror::Error;

use crate::{clock::SimTime, container::ContainerError, process::Wake};

/// Invalid line configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Container capacity must be positive
    #[error("{node}: capacity must be greater than zero")]
    ZeroCapacity {
        /// Buffer name
        node: String,
    },

    /// Initial level does not fit
    #[error("{node}: initial level {initial} exceeds capacity {capacity}")]
    InitialAboveCapacity {
        /// Buffer name
        node: String,
        /// Configured initial level
        initial: u64,
        /// Configured capacity
        capacity: u64,
    },

    /// A refill at the critical level would overflow the buffer
    #[error("{node}: supply {supply} at critical level {critical} overflows capacity {capacity}")]
    SupplyOverflow {
        /// Buffer name
        node: String,
        /// Critical level that triggers a refill
        critical: u64,
        /// Units delivered per refill
        supply: u64,
        /// Configured capacity
        capacity: u64,
    },

    /// An enabled controller would re-check forever within one tick
    #[error("{node}: {field} must be greater than zero when control is enabled")]
    ZeroCheckInterval {
        /// Buffer name
        node: String,
        /// Offending field
        field: &'static str,
    },

    /// MTTF/MTTR must be positive and finite
    #[error("{machine}: {field} must be positive and finite, got {value}")]
    InvalidRate {
        /// Machine name
        machine: String,
        /// Offending field
        field: &'static str,
        /// Configured value
        value: f64,
    },

    /// Processing-time distribution parameters are unusable
    #[error("{machine}: invalid processing time mean {mean} / sigma {sigma}")]
    InvalidProcessTime {
        /// Machine name
        machine: String,
        /// Configured mean
        mean: f64,
        /// Configured sigma
        sigma: f64,
    },

    /// The run would not advance
    #[error("simulation horizon must be greater than zero")]
    ZeroHorizon,
}

/// Fatal simulation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Container level invariant violated
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A duration sampled below zero
    #[error("negative {what} duration: {value}")]
    NegativeDuration {
        /// Which quantity was being sampled
        what: &'static str,
        /// Truncated sample
        value: i64,
    },

    /// A scripted sampler ran out of values
    #[error("sampler '{0}' exhausted")]
    SamplerExhausted(String),

    /// A process was resumed in a way its state machine cannot accept
    #[error("unexpected {wake:?} while {state}")]
    UnexpectedWake {
        /// State the process was in
        state: &'static str,
        /// Offending wake-up
        wake: Wake,
    },

    /// Setup rejected the configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A process step failed
    #[error("process '{process}' failed at t={time}: {source}")]
    Process {
        /// Process name
        process: String,
        /// Simulated time of the failing step
        time: SimTime,
        /// Underlying error
        #[source]
        source: Box<SimError>,
    },
}

impl SimError {
    /// Innermost error, unwrapping any process context.
    pub fn root(&self) -> &Self {
        match self {
            Self::Process { source, .. } => source.root(),
            other => other,
        }
    }
}
