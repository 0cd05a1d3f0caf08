use crate::error::{Result, RiverGeoError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Prefix of all environment variables read by [`LayeredConfig::load_from_env`]
pub const ENV_PREFIX: &str = "RIVERGEO_";

/// File name looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "rivergeo.toml";

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered configuration for rivergeo
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    pub target_epsg: ConfigValue<u32>,
    pub proximity_threshold: ConfigValue<f64>,
    pub sample_count: ConfigValue<usize>,
    pub raster_resolution: ConfigValue<f64>,
    pub easting_prefix_len: ConfigValue<usize>,
    pub name_field: ConfigValue<String>,
    pub merge_fields: ConfigValue<Vec<String>>,
    pub centerline_suffix: ConfigValue<String>,
    pub bankline_suffix: ConfigValue<String>,
    pub xyz_extension: ConfigValue<String>,
}

impl LayeredConfig {
    /// Create a new configuration with default values
    pub fn with_defaults() -> Self {
        Self {
            target_epsg: ConfigValue::new(25832, ConfigSource::Default),
            proximity_threshold: ConfigValue::new(2.0, ConfigSource::Default),
            sample_count: ConfigValue::new(100_000, ConfigSource::Default),
            raster_resolution: ConfigValue::new(1.0, ConfigSource::Default),
            easting_prefix_len: ConfigValue::new(2, ConfigSource::Default),
            name_field: ConfigValue::new("GEWAESSER".to_string(), ConfigSource::Default),
            merge_fields: ConfigValue::new(
                vec!["GEWAESSER".to_string(), "GEWAESSERN".to_string()],
                ConfigSource::Default,
            ),
            centerline_suffix: ConfigValue::new("_korr".to_string(), ConfigSource::Default),
            bankline_suffix: ConfigValue::new("_lines".to_string(), ConfigSource::Default),
            xyz_extension: ConfigValue::new("asc".to_string(), ConfigSource::Default),
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| RiverGeoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read config file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| RiverGeoError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(epsg) = file_config.target_epsg {
            self.target_epsg.update(epsg, ConfigSource::File);
        }

        if let Some(threshold) = file_config.proximity_threshold {
            validate_positive("proximity_threshold", threshold)?;
            self.proximity_threshold.update(threshold, ConfigSource::File);
        }

        if let Some(samples) = file_config.sample_count {
            validate_sample_count(samples)?;
            self.sample_count.update(samples, ConfigSource::File);
        }

        if let Some(resolution) = file_config.raster_resolution {
            validate_positive("raster_resolution", resolution)?;
            self.raster_resolution.update(resolution, ConfigSource::File);
        }

        if let Some(len) = file_config.easting_prefix_len {
            self.easting_prefix_len.update(len, ConfigSource::File);
        }

        if let Some(field) = file_config.name_field {
            self.name_field.update(field, ConfigSource::File);
        }

        if let Some(fields) = file_config.merge_fields {
            self.merge_fields.update(fields, ConfigSource::File);
        }

        if let Some(suffix) = file_config.centerline_suffix {
            self.centerline_suffix.update(suffix, ConfigSource::File);
        }

        if let Some(suffix) = file_config.bankline_suffix {
            self.bankline_suffix.update(suffix, ConfigSource::File);
        }

        if let Some(ext) = file_config.xyz_extension {
            self.xyz_extension.update(normalize_extension(&ext), ConfigSource::File);
        }

        Ok(self)
    }

    /// Load configuration from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Some(raw) = env_var("TARGET_EPSG") {
            match raw.parse::<u32>() {
                Ok(epsg) => self.target_epsg.update(epsg, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid RIVERGEO_TARGET_EPSG value '{}': expected integer EPSG code",
                    raw
                ),
            }
        }

        if let Some(raw) = env_var("PROXIMITY_THRESHOLD") {
            match parse_positive_f64("proximity_threshold", &raw) {
                Ok(v) => self.proximity_threshold.update(v, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid RIVERGEO_PROXIMITY_THRESHOLD value '{}': expected positive number",
                    raw
                ),
            }
        }

        if let Some(raw) = env_var("SAMPLE_COUNT") {
            match raw.parse::<usize>().ok().filter(|n| *n >= 2) {
                Some(n) => self.sample_count.update(n, ConfigSource::Environment),
                None => tracing::warn!(
                    "Invalid RIVERGEO_SAMPLE_COUNT value '{}': expected integer >= 2",
                    raw
                ),
            }
        }

        if let Some(raw) = env_var("RASTER_RESOLUTION") {
            match parse_positive_f64("raster_resolution", &raw) {
                Ok(v) => self.raster_resolution.update(v, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid RIVERGEO_RASTER_RESOLUTION value '{}': expected positive number",
                    raw
                ),
            }
        }

        if let Some(raw) = env_var("EASTING_PREFIX_LEN") {
            match raw.parse::<usize>() {
                Ok(n) => self.easting_prefix_len.update(n, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid RIVERGEO_EASTING_PREFIX_LEN value '{}': expected integer",
                    raw
                ),
            }
        }

        if let Some(field) = env_var("NAME_FIELD") {
            self.name_field.update(field, ConfigSource::Environment);
        }

        if let Some(raw) = env_var("MERGE_FIELDS") {
            let fields = parse_field_list(&raw);
            if fields.is_empty() {
                tracing::warn!(
                    "Invalid RIVERGEO_MERGE_FIELDS value '{}': expected comma-separated field names",
                    raw
                );
            } else {
                self.merge_fields.update(fields, ConfigSource::Environment);
            }
        }

        if let Some(suffix) = env_var("CENTERLINE_SUFFIX") {
            self.centerline_suffix.update(suffix, ConfigSource::Environment);
        }

        if let Some(suffix) = env_var("BANKLINE_SUFFIX") {
            self.bankline_suffix.update(suffix, ConfigSource::Environment);
        }

        if let Some(ext) = env_var("XYZ_EXTENSION") {
            self.xyz_extension.update(normalize_extension(&ext), ConfigSource::Environment);
        }

        self
    }

    /// Update configuration from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliConfigOverrides) {
        if let Some(epsg) = overrides.target_epsg {
            self.target_epsg.update(epsg, ConfigSource::Cli);
        }

        if let Some(threshold) = overrides.proximity_threshold {
            self.proximity_threshold.update(threshold, ConfigSource::Cli);
        }

        if let Some(samples) = overrides.sample_count {
            self.sample_count.update(samples, ConfigSource::Cli);
        }

        if let Some(resolution) = overrides.raster_resolution {
            self.raster_resolution.update(resolution, ConfigSource::Cli);
        }

        if let Some(fields) = overrides.merge_fields {
            self.merge_fields.update(fields, ConfigSource::Cli);
        }

        if let Some(field) = overrides.name_field {
            self.name_field.update(field, ConfigSource::Cli);
        }

        if let Some(ext) = overrides.xyz_extension {
            self.xyz_extension.update(normalize_extension(&ext), ConfigSource::Cli);
        }
    }

    /// Get all configuration values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "target_epsg".to_string(),
            (format!("EPSG:{}", self.target_epsg.value), self.target_epsg.source),
        );
        map.insert(
            "proximity_threshold".to_string(),
            (self.proximity_threshold.value.to_string(), self.proximity_threshold.source),
        );
        map.insert(
            "sample_count".to_string(),
            (self.sample_count.value.to_string(), self.sample_count.source),
        );
        map.insert(
            "raster_resolution".to_string(),
            (self.raster_resolution.value.to_string(), self.raster_resolution.source),
        );
        map.insert(
            "easting_prefix_len".to_string(),
            (self.easting_prefix_len.value.to_string(), self.easting_prefix_len.source),
        );
        map.insert(
            "name_field".to_string(),
            (self.name_field.value.clone(), self.name_field.source),
        );
        map.insert(
            "merge_fields".to_string(),
            (self.merge_fields.value.join(","), self.merge_fields.source),
        );
        map.insert(
            "centerline_suffix".to_string(),
            (self.centerline_suffix.value.clone(), self.centerline_suffix.source),
        );
        map.insert(
            "bankline_suffix".to_string(),
            (self.bankline_suffix.value.clone(), self.bankline_suffix.source),
        );
        map.insert(
            "xyz_extension".to_string(),
            (self.xyz_extension.value.clone(), self.xyz_extension.source),
        );

        map
    }
}

impl Default for LayeredConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Configuration loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    target_epsg: Option<u32>,
    proximity_threshold: Option<f64>,
    sample_count: Option<usize>,
    raster_resolution: Option<f64>,
    easting_prefix_len: Option<usize>,
    name_field: Option<String>,
    merge_fields: Option<Vec<String>>,
    centerline_suffix: Option<String>,
    bankline_suffix: Option<String>,
    xyz_extension: Option<String>,
}

/// CLI configuration overrides
#[derive(Debug, Default)]
pub struct CliConfigOverrides {
    pub target_epsg: Option<u32>,
    pub proximity_threshold: Option<f64>,
    pub sample_count: Option<usize>,
    pub raster_resolution: Option<f64>,
    pub merge_fields: Option<Vec<String>>,
    pub name_field: Option<String>,
    pub xyz_extension: Option<String>,
}

fn env_var(key: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, key)).ok()
}

/// Parse a comma-separated field list, dropping empty entries
pub fn parse_field_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(String::from)
        .collect()
}

/// Parse a strictly positive, finite number
pub fn parse_positive_f64(key: &str, s: &str) -> Result<f64> {
    let value = s.trim().parse::<f64>().map_err(|_| RiverGeoError::ConfigInvalid {
        key: key.to_string(),
        reason: format!("'{}' is not a number", s),
    })?;
    validate_positive(key, value)?;
    Ok(value)
}

fn validate_positive(key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RiverGeoError::ConfigInvalid {
            key: key.to_string(),
            reason: format!("{} must be a positive number", value),
        })
    }
}

fn validate_sample_count(samples: usize) -> Result<()> {
    if samples >= 2 {
        Ok(())
    } else {
        Err(RiverGeoError::ConfigInvalid {
            key: "sample_count".to_string(),
            reason: format!("{} samples cannot include both line ends", samples),
        })
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_lowercase()
}
