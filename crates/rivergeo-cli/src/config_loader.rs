//! Configuration loading utilities for CLI commands

use anyhow::{Context, Result};
use rivergeo_core::config::{CliConfigOverrides, LayeredConfig, DEFAULT_CONFIG_FILE};
use std::path::Path;

/// Load layered configuration: defaults, file, environment
///
/// The file is `config_path` when given (it must exist), otherwise
/// `rivergeo.toml` in the current directory if present.
pub fn load_config(config_path: Option<&Path>) -> Result<LayeredConfig> {
    let config = LayeredConfig::with_defaults();

    let config = match config_path {
        Some(path) => {
            if !path.exists() {
                return Err(crate::errors::config_not_found(path).into());
            }
            config
                .load_from_file(path)
                .context(format!("Failed to load configuration file {}", path.display()))?
        }
        None if Path::new(DEFAULT_CONFIG_FILE).is_file() => config
            .load_from_file(DEFAULT_CONFIG_FILE)
            .context(format!("Failed to load configuration file {}", DEFAULT_CONFIG_FILE))?,
        None => config,
    };

    Ok(config.load_from_env())
}

/// Load layered configuration with CLI overrides
pub fn load_config_with_overrides(config_path: Option<&Path>, overrides: CliConfigOverrides) -> Result<LayeredConfig> {
    let mut config = load_config(config_path)?;
    config.update_from_cli(overrides);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivergeo_core::config::ConfigSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_explicit_file_and_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "proximity_threshold = 4.0\nsample_count = 500").unwrap();

        let config = load_config_with_overrides(
            Some(file.path()),
            CliConfigOverrides {
                sample_count: Some(50),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(config.proximity_threshold.value, 4.0);
        assert_eq!(config.proximity_threshold.source, ConfigSource::File);
        assert_eq!(config.sample_count.value, 50);
        assert_eq!(config.sample_count.source, ConfigSource::Cli);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/rivergeo.toml"))).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }
}
