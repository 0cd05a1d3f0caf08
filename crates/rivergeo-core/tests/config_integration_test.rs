//! Integration tests for layered configuration
//!
//! These tests verify that configuration loading follows the correct precedence:
//! CLI arguments > Environment variables > Config file > Defaults

use rivergeo_core::config::{CliConfigOverrides, ConfigSource, LayeredConfig};
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

const ENV_KEYS: &[&str] = &[
    "RIVERGEO_TARGET_EPSG",
    "RIVERGEO_PROXIMITY_THRESHOLD",
    "RIVERGEO_SAMPLE_COUNT",
    "RIVERGEO_MERGE_FIELDS",
    "RIVERGEO_XYZ_EXTENSION",
];

fn clear_env() {
    for key in ENV_KEYS {
        env::remove_var(key);
    }
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", content).unwrap();
    file
}

#[test]
fn test_default_configuration() {
    let config = LayeredConfig::with_defaults();

    assert_eq!(config.target_epsg.value, 25832);
    assert_eq!(config.target_epsg.source, ConfigSource::Default);
    assert_eq!(config.proximity_threshold.value, 2.0);
    assert_eq!(config.sample_count.value, 100_000);
    assert_eq!(config.raster_resolution.value, 1.0);
    assert_eq!(config.easting_prefix_len.value, 2);
    assert_eq!(config.name_field.value, "GEWAESSER");
    assert_eq!(config.merge_fields.value, vec!["GEWAESSER", "GEWAESSERN"]);
    assert_eq!(config.centerline_suffix.value, "_korr");
    assert_eq!(config.bankline_suffix.value, "_lines");
    assert_eq!(config.xyz_extension.value, "asc");
}

#[test]
fn test_partial_file_configuration() {
    let file = config_file(
        r#"
target_epsg = 25833
# only the threshold and EPSG change
proximity_threshold = 5.5
"#,
    );

    let config = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap();

    assert_eq!(config.target_epsg.value, 25833);
    assert_eq!(config.target_epsg.source, ConfigSource::File);
    assert_eq!(config.proximity_threshold.value, 5.5);
    assert_eq!(config.proximity_threshold.source, ConfigSource::File);
    assert_eq!(config.sample_count.source, ConfigSource::Default);
    assert_eq!(config.merge_fields.source, ConfigSource::Default);
}

#[test]
fn test_unknown_key_in_file_is_rejected() {
    let file = config_file("target_crs = 4326\n");
    let err = LayeredConfig::with_defaults().load_from_file(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML"));
}

#[test]
fn test_non_positive_threshold_in_file_is_rejected() {
    let file = config_file("proximity_threshold = 0.0\n");
    assert!(LayeredConfig::with_defaults().load_from_file(file.path()).is_err());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    clear_env();
    env::set_var("RIVERGEO_TARGET_EPSG", "4326");
    env::set_var("RIVERGEO_MERGE_FIELDS", "NAME, CODE");
    env::set_var("RIVERGEO_XYZ_EXTENSION", ".XYZ");

    let file = config_file(
        r#"
target_epsg = 25833
merge_fields = ["GEWAESSER"]
"#,
    );

    let config = LayeredConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();

    assert_eq!(config.target_epsg.value, 4326);
    assert_eq!(config.target_epsg.source, ConfigSource::Environment);
    assert_eq!(config.merge_fields.value, vec!["NAME", "CODE"]);
    assert_eq!(config.xyz_extension.value, "xyz");

    clear_env();
}

#[test]
#[serial]
fn test_invalid_environment_values_are_ignored() {
    clear_env();
    env::set_var("RIVERGEO_SAMPLE_COUNT", "1");
    env::set_var("RIVERGEO_PROXIMITY_THRESHOLD", "-3");

    let config = LayeredConfig::with_defaults().load_from_env();

    assert_eq!(config.sample_count.value, 100_000);
    assert_eq!(config.sample_count.source, ConfigSource::Default);
    assert_eq!(config.proximity_threshold.value, 2.0);

    clear_env();
}

#[test]
#[serial]
fn test_cli_overrides_all() {
    clear_env();
    env::set_var("RIVERGEO_TARGET_EPSG", "4326");

    let file = config_file("target_epsg = 25833\nsample_count = 500\n");

    let mut config = LayeredConfig::with_defaults()
        .load_from_file(file.path())
        .unwrap()
        .load_from_env();

    config.update_from_cli(CliConfigOverrides {
        target_epsg: Some(3857),
        ..Default::default()
    });

    assert_eq!(config.target_epsg.value, 3857);
    assert_eq!(config.target_epsg.source, ConfigSource::Cli);
    assert_eq!(config.sample_count.value, 500);
    assert_eq!(config.sample_count.source, ConfigSource::File);

    clear_env();
}

#[test]
fn test_inspection_map_reports_sources() {
    let mut config = LayeredConfig::with_defaults();
    config.update_from_cli(CliConfigOverrides {
        raster_resolution: Some(0.5),
        ..Default::default()
    });

    let map = config.to_inspection_map();
    let (value, source) = &map["raster_resolution"];
    assert_eq!(value, "0.5");
    assert_eq!(*source, ConfigSource::Cli);
    assert_eq!(map["target_epsg"].1, ConfigSource::Default);
}
