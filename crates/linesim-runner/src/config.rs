//! Configuration loading.
//!
//! A run starts from [`LineConfig::default`], optionally replaced by a TOML
//! file, then seed and horizon overrides from the command line. Missing
//! top-level tables in the file keep their defaults.

use std::{fs, path::Path};

use linesim_core::{LineConfig, SimTime};
use tracing::debug;

use crate::error::RunnerError;

/// Command-line overrides applied on top of the loaded configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    /// Replaces the configured seed
    pub seed: Option<u64>,
    /// Replaces the configured horizon
    pub horizon: Option<SimTime>,
}

/// Parse a line configuration from TOML text.
///
/// `origin` only labels errors.
pub fn parse_config(text: &str, origin: &Path) -> Result<LineConfig, RunnerError> {
    toml::from_str(text).map_err(|source| RunnerError::ParseConfig {
        path: origin.to_path_buf(),
        source: Box::new(source),
    })
}

/// Load the configuration for a run and validate it.
pub fn load_config(path: Option<&Path>, overrides: Overrides) -> Result<LineConfig, RunnerError> {
    let mut config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|source| RunnerError::ReadConfig { path: path.to_path_buf(), source })?;
            debug!(path = %path.display(), "loaded configuration file");
            parse_config(&text, path)?
        },
        None => LineConfig::default(),
    };

    if let Some(seed) = overrides.seed {
        config.seed = seed;
    }
    if let Some(horizon) = overrides.horizon {
        config.horizon = horizon;
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use linesim_core::ConfigError;

    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let text = r#"
            seed = 7
            horizon = 1000

            [machine_c]
            mean_process_time = 100.0
            sigma_process_time = 5.0
            mttf = 5000.0
            mttr = 50.0
        "#;
        let config = parse_config(text, Path::new("line.toml")).unwrap();

        assert_eq!(config.seed, 7);
        assert_eq!(config.horizon, 1000);
        assert_eq!(config.machine_c.mean_process_time, 100.0);
        assert_eq!(config.machine_c.handling_in, 1);
        assert_eq!(config.machine_a, LineConfig::default().machine_a);
        assert_eq!(config.raw_a, LineConfig::default().raw_a);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = parse_config("sede = 1", Path::new("line.toml")).unwrap_err();
        assert!(matches!(err, RunnerError::ParseConfig { .. }));
        assert!(err.to_string().contains("line.toml"));
    }

    #[test]
    fn incomplete_table_is_rejected() {
        let text = r#"
            [raw_c]
            capacity = 10
        "#;
        assert!(parse_config(text, Path::new("line.toml")).is_err());
    }

    #[test]
    fn overrides_win_and_are_validated() {
        let config = load_config(None, Overrides { seed: Some(3), horizon: Some(500) }).unwrap();
        assert_eq!((config.seed, config.horizon), (3, 500));

        let err = load_config(None, Overrides { seed: None, horizon: Some(0) }).unwrap_err();
        assert!(matches!(
            err,
            RunnerError::Sim(linesim_core::SimError::Config(ConfigError::ZeroHorizon))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = load_config(Some(Path::new("/nonexistent/line.toml")), Overrides::default())
            .unwrap_err();
        assert!(matches!(err, RunnerError::ReadConfig { .. }));
    }
}
