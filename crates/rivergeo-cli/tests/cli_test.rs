//! Integration tests for the rivergeo binary
//!
//! Each test builds its fixtures in a temporary directory, runs the binary
//! there and checks the JSON output and the files on disk.

use geo::{line_string, MultiLineString};
use rivergeo_core::formats::geotiff::read_geotiff;
use rivergeo_core::formats::{ShapefileFormat, VectorFormat};
use rivergeo_core::models::{AttributeValue, Crs, Feature, FieldDef, Geometry, Layer};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const CONFIG_ENV: [&str; 10] = [
    "RIVERGEO_TARGET_EPSG",
    "RIVERGEO_PROXIMITY_THRESHOLD",
    "RIVERGEO_SAMPLE_COUNT",
    "RIVERGEO_RASTER_RESOLUTION",
    "RIVERGEO_EASTING_PREFIX_LEN",
    "RIVERGEO_NAME_FIELD",
    "RIVERGEO_MERGE_FIELDS",
    "RIVERGEO_CENTERLINE_SUFFIX",
    "RIVERGEO_BANKLINE_SUFFIX",
    "RIVERGEO_XYZ_EXTENSION",
];

fn rivergeo(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_rivergeo"));
    command.current_dir(dir).args(args).env_remove("RUST_LOG");
    for key in CONFIG_ENV {
        command.env_remove(key);
    }
    command.output().expect("Failed to execute rivergeo")
}

fn stdout_json(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).unwrap_or_else(|e| panic!("stdout is not JSON ({}): {}", e, stdout))
}

fn write_layer(path: &Path, layer: &Layer) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    ShapefileFormat.write(layer, path).unwrap();
}

fn named(geometry: impl Into<Geometry>, name: &str) -> Feature {
    Feature::new(geometry).with_attribute("GEWAESSER", AttributeValue::Text(name.into()))
}

fn river_layer(name: &str, features: Vec<Feature>) -> Layer {
    Layer::new(name, Some(Crs::etrs89_utm32n()))
        .with_fields(vec![FieldDef::character("GEWAESSER", 40)])
        .with_features(features)
}

/// Centerline `Elz_korr` running east, banklines `Elz_lines` with the
/// second bank drawn westwards, and a centerline without banklines
fn align_fixture(root: &Path) {
    write_layer(
        &root.join("korr/Elz_korr.shp"),
        &river_layer("Elz_korr", vec![named(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], "Elz")]),
    );
    write_layer(
        &root.join("korr/Dreisam_korr.shp"),
        &river_layer("Dreisam_korr", vec![named(line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 5.0)], "Dreisam")]),
    );
    write_layer(
        &root.join("lines/Elz_lines.shp"),
        &river_layer(
            "Elz_lines",
            vec![
                named(line_string![(x: 0.0, y: 1.0), (x: 10.0, y: 1.0)], "Elz"),
                named(line_string![(x: 10.0, y: -1.0), (x: 0.0, y: -1.0)], "Elz"),
            ],
        ),
    );
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    let output = rivergeo(dir.path(), &["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["align", "intersect", "reproject", "mosaic", "merge", "proximity", "rasterize", "split", "run"] {
        assert!(stdout.contains(command), "help should mention {}", command);
    }
}

#[test]
fn test_config_json_reports_sources() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("rivergeo.toml"), "proximity_threshold = 3.5\n").unwrap();

    let output = rivergeo(dir.path(), &["config", "--json"]);
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["status"], "success");
    let rows = json["data"].as_array().unwrap();
    let row = |key: &str| rows.iter().find(|r| r["key"] == key).cloned().unwrap();

    assert_eq!(row("target_epsg")["value"], "EPSG:25832");
    assert_eq!(row("target_epsg")["source"], "Default");
    assert_eq!(row("proximity_threshold")["value"], "3.5");
    assert_eq!(row("proximity_threshold")["source"], "File");
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let output = rivergeo(dir.path(), &["--config", "missing.toml", "config"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Configuration file not found"));
}

#[test]
fn test_align_reverses_opposing_bankline() {
    let dir = TempDir::new().unwrap();
    align_fixture(dir.path());

    let output = rivergeo(
        dir.path(),
        &["align", "--centerlines", "korr", "--banklines", "lines", "--output", "aligned", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["data"]["total_files"], 2);
    assert_eq!(json["data"]["successful"][0]["message"], "1 of 2 bankline(s) reversed");
    assert_eq!(json["data"]["skipped"].as_array().unwrap().len(), 1);

    let aligned = ShapefileFormat.read(&dir.path().join("aligned/Elz_lines.shp")).unwrap();
    assert_eq!(aligned.crs.as_ref().and_then(|c| c.epsg), Some(25832));
    assert_eq!(aligned.features[1].attribute("GEWAESSER"), Some(&AttributeValue::Text("Elz".into())));
    match aligned.geometry(1) {
        Some(Geometry::LineString(line)) => {
            assert_eq!(line.0[0].x, 0.0);
            assert_eq!(line.0[1].x, 10.0);
        }
        other => panic!("unexpected geometry {:?}", other),
    }
}

#[test]
fn test_dry_run_writes_nothing() {
    let dir = TempDir::new().unwrap();
    align_fixture(dir.path());

    let output = rivergeo(
        dir.path(),
        &["align", "--centerlines", "korr", "--banklines", "lines", "--output", "aligned", "--dry-run", "--json"],
    );
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["data"]["dry_run"], true);
    let actions = json["data"]["planned_actions"].as_array().unwrap();
    assert_eq!(actions[0]["action_type"], "create_directory");
    assert_eq!(actions[1]["action_type"], "write_file");
    assert!(actions[1]["description"].as_str().unwrap().ends_with("Elz_lines.shp"));

    assert!(!dir.path().join("aligned").exists(), "dry run must not create the output directory");
}

#[test]
fn test_intersect_writes_crossing_points() {
    let dir = TempDir::new().unwrap();
    write_layer(
        &dir.path().join("korr/Elz_korr.shp"),
        &river_layer("Elz_korr", vec![named(line_string![(x: 5.0, y: -5.0), (x: 5.0, y: 5.0)], "Elz")]),
    );
    write_layer(
        &dir.path().join("lines/Elz_lines.shp"),
        &river_layer(
            "Elz_lines",
            vec![
                named(line_string![(x: 0.0, y: 1.0), (x: 10.0, y: 1.0)], "Elz"),
                named(line_string![(x: 0.0, y: -1.0), (x: 10.0, y: -1.0)], "Elz"),
            ],
        ),
    );

    let output = rivergeo(
        dir.path(),
        &["intersect", "--banklines", "lines", "--centerlines", "korr", "--output", "points", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let points = ShapefileFormat.read(&dir.path().join("points/Elz_korr.shp")).unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points.crs.as_ref().and_then(|c| c.epsg), Some(25832));
    match points.geometry(0) {
        Some(Geometry::Point(p)) => assert_eq!((p.x(), p.y()), (5.0, 1.0)),
        other => panic!("unexpected geometry {:?}", other),
    }
}

#[test]
fn test_split_writes_one_file_per_part() {
    let dir = TempDir::new().unwrap();
    let two_parts = || {
        MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 0.0, y: 1.0), (x: 1.0, y: 1.0)],
        ])
    };
    write_layer(
        &dir.path().join("banks.shp"),
        &river_layer(
            "banks",
            vec![
                named(two_parts(), "Elz"),
                named(line_string![(x: 0.0, y: 0.0), (x: 2.0, y: 2.0)], "Rhein"),
                named(two_parts(), "Elz"),
            ],
        ),
    );

    let output = rivergeo(dir.path(), &["split", "--input", "banks.shp", "--output", "parts", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    for name in ["Elz_line_1.shp", "Elz_line_2.shp", "Elz_line_1_bank.shp", "Elz_line_2_bank.shp"] {
        assert!(dir.path().join("parts").join(name).exists(), "{} should exist", name);
    }

    let part = ShapefileFormat.read(&dir.path().join("parts/Elz_line_2.shp")).unwrap();
    assert_eq!(part.len(), 1);
    assert_eq!(part.crs.as_ref().and_then(|c| c.epsg), Some(25832));
    assert!(matches!(part.geometry(0), Some(Geometry::LineString(_))));
}

#[test]
fn test_proximity_failure_is_reported_and_exit_is_non_zero() {
    let dir = TempDir::new().unwrap();
    write_layer(
        &dir.path().join("pairs/close.shp"),
        &river_layer(
            "close",
            vec![
                named(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)], "a"),
                named(line_string![(x: 0.0, y: 1.0), (x: 10.0, y: 1.0)], "b"),
            ],
        ),
    );
    write_layer(
        &dir.path().join("pairs/three.shp"),
        &river_layer(
            "three",
            vec![
                named(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)], "a"),
                named(line_string![(x: 0.0, y: 1.0), (x: 1.0, y: 1.0)], "b"),
                named(line_string![(x: 0.0, y: 2.0), (x: 1.0, y: 2.0)], "c"),
            ],
        ),
    );

    let output = rivergeo(
        dir.path(),
        &["proximity", "--input", "pairs", "--output", "near", "--samples", "50", "--json"],
    );
    assert!(!output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["data"]["failed"][0]["path"].as_str().unwrap(), "pairs/three.shp");
    assert_eq!(json["data"]["successful"].as_array().unwrap().len(), 1);

    let segments = ShapefileFormat.read(&dir.path().join("near/close_segments.shp")).unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments.features[1].attribute("SOURCE"), Some(&AttributeValue::Integer(2)));
}

#[test]
fn test_rasterize_then_skip_existing() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("xyz")).unwrap();
    fs::write(
        dir.path().join("xyz/tile.asc"),
        "32000001.0\t5000001.0\t10.0\n\n32000003.5\t5000001.5\t12.0\n32000002.0\tbad\t1.0\n",
    )
    .unwrap();

    let output = rivergeo(dir.path(), &["rasterize", "--input", "xyz", "--output", "dem", "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let raster = read_geotiff(dir.path().join("dem/tile_elevation_raster.tif")).unwrap();
    assert_eq!(raster.epsg(), Some(25832));
    assert_eq!((raster.rows(), raster.cols()), (2, 3));
    assert_eq!(raster.valid_count(), 2);

    let again = rivergeo(dir.path(), &["rasterize", "--input", "xyz", "--output", "dem", "--json"]);
    assert!(again.status.success());
    let json = stdout_json(&again);
    assert!(json["data"]["skipped"][0]["message"].as_str().unwrap().starts_with("Skipping"));
}

#[test]
fn test_run_manifest_resolves_paths_against_manifest() {
    let dir = TempDir::new().unwrap();
    align_fixture(&dir.path().join("project"));
    fs::write(
        dir.path().join("project/tasks.toml"),
        r#"
[[task]]
kind = "align"
centerlines = "korr"
banklines = "lines"
output = "aligned"

[[task]]
kind = "split"
input = "missing.shp"
output = "parts"
"#,
    )
    .unwrap();

    let output = rivergeo(dir.path(), &["run", "project/tasks.toml", "--json"]);
    assert!(!output.status.success(), "the split task has no input");

    let json = stdout_json(&output);
    let tasks = json["data"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["kind"], "align");
    assert_eq!(tasks[0]["succeeded"], true);
    assert_eq!(tasks[1]["succeeded"], false);

    assert!(dir.path().join("project/aligned/Elz_lines.shp").exists());
}

#[test]
fn test_reproject_skips_files_without_crs() {
    let dir = TempDir::new().unwrap();
    write_layer(
        &dir.path().join("shp/elz.shp"),
        &river_layer(
            "elz",
            vec![named(line_string![(x: 500000.0, y: 5300000.0), (x: 500100.0, y: 5300000.0)], "Elz")],
        ),
    );
    let mut bare = river_layer("bare", vec![named(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)], "Bare")]);
    bare.crs = None;
    write_layer(&dir.path().join("shp/bare.shp"), &bare);

    let output = rivergeo(
        dir.path(),
        &["reproject", "--input", "shp", "--epsg", "4326", "--output", "wgs84", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json = stdout_json(&output);
    assert_eq!(json["data"]["skipped"][0]["message"], "CRS not defined");
    assert_eq!(json["data"]["successful"][0]["message"], "EPSG:25832 -> EPSG:4326");

    let reprojected = ShapefileFormat.read(&dir.path().join("wgs84/reprojected_elz.shp")).unwrap();
    assert_eq!(reprojected.crs.as_ref().and_then(|c| c.epsg), Some(4326));
    match reprojected.geometry(0) {
        Some(Geometry::LineString(line)) => assert!((line.0[0].x - 9.0).abs() < 1e-6),
        other => panic!("unexpected geometry {:?}", other),
    }
    assert!(!dir.path().join("wgs84/reprojected_bare.shp").exists());
}

#[test]
fn test_merge_keeps_selected_fields() {
    let dir = TempDir::new().unwrap();
    for (name, y) in [("a", 0.0), ("b", 5.0)] {
        let layer = Layer::new(name, Some(Crs::etrs89_utm32n()))
            .with_fields(vec![FieldDef::character("GEWAESSER", 40), FieldDef::integer("LENGTH")])
            .with_features(vec![Feature::new(line_string![(x: 0.0, y: y), (x: 1.0, y: y)])
                .with_attribute("GEWAESSER", AttributeValue::Text(name.to_uppercase()))
                .with_attribute("LENGTH", AttributeValue::Integer(1))]);
        write_layer(&dir.path().join(format!("parts/{}.shp", name)), &layer);
    }

    let output = rivergeo(
        dir.path(),
        &["merge", "--input", "parts", "--output", "merged/all.shp", "--fields", "GEWAESSER", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let merged = ShapefileFormat.read(&dir.path().join("merged/all.shp")).unwrap();
    assert_eq!(merged.len(), 2);
    assert!(merged.has_field("GEWAESSER"));
    assert!(!merged.has_field("LENGTH"));
    assert_eq!(merged.features[1].attribute("GEWAESSER"), Some(&AttributeValue::Text("B".into())));
}

#[test]
fn test_reproject_warns_when_crs_has_no_prj_definition() {
    let dir = TempDir::new().unwrap();
    write_layer(
        &dir.path().join("shp/elz.shp"),
        &river_layer(
            "elz",
            vec![named(line_string![(x: 500000.0, y: 5300000.0), (x: 500100.0, y: 5300000.0)], "Elz")],
        ),
    );

    let output = rivergeo(
        dir.path(),
        &["reproject", "--input", "shp", "--epsg", "2056", "--output", "lv95", "--json"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No .prj definition for EPSG:2056"), "{}", stderr);
    assert!(dir.path().join("lv95/reprojected_elz.shp").exists());
    assert!(!dir.path().join("lv95/reprojected_elz.prj").exists());
}
