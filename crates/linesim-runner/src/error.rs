//! Runner error types.

use std::{io, path::PathBuf};

use linesim_core::{ConfigError, SimError};
use thiserror::Error;

/// Errors that end a runner invocation.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The line could not be built or a process failed.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// The configuration file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    ReadConfig {
        /// File that was being read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid TOML for a line.
    #[error("invalid configuration {}: {source}", path.display())]
    ParseConfig {
        /// File that was being parsed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: Box<toml::de::Error>,
    },

    /// A log file could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File or directory that was being written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
}

impl From<ConfigError> for RunnerError {
    fn from(err: ConfigError) -> Self {
        Self::Sim(SimError::Config(err))
    }
}

impl RunnerError {
    /// Writing `path` failed with `source`.
    pub fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Write { path: path.into(), source }
    }
}
