//! Write-then-read tests for the vector, raster and point-text formats

use geo::{line_string, Geometry, LineString, MultiLineString};
use rivergeo_core::formats::shapefile::read_dbf_fields;
use rivergeo_core::formats::xyz::{read_xyz, XyzReadOptions};
use rivergeo_core::formats::{FormatRegistry, GeoJsonFormat, ShapefileFormat, VectorFormat};
use rivergeo_core::models::{AttributeValue, Crs, Feature, FieldDef, FieldKind, Layer, XyzPoint};
use rivergeo_core::RiverGeoError;
use std::fs;
use tempfile::TempDir;

fn river_layer() -> Layer {
    let bank: LineString<f64> = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 5.0), (x: 20.0, y: 5.0)];
    let split = MultiLineString::new(vec![
        line_string![(x: 0.0, y: 10.0), (x: 5.0, y: 10.0)],
        line_string![(x: 6.0, y: 10.0), (x: 9.0, y: 12.0)],
    ]);

    Layer::new("rivers", Some(Crs::etrs89_utm32n()))
        .with_fields(vec![
            FieldDef::character("GEWAESSER", 50),
            FieldDef::character("GEWAESSERN", 20),
            FieldDef::numeric("LAENGE", 12, 3),
        ])
        .with_features(vec![
            Feature::new(bank)
                .with_attribute("GEWAESSER", AttributeValue::Text("Rhein".into()))
                .with_attribute("GEWAESSERN", AttributeValue::Text("2".into()))
                .with_attribute("LAENGE", AttributeValue::Number(21.18)),
            Feature::new(split)
                .with_attribute("GEWAESSER", AttributeValue::Text("Neckar".into()))
                .with_attribute("GEWAESSERN", AttributeValue::Null)
                .with_attribute("LAENGE", AttributeValue::Number(8.6)),
        ])
}

#[test]
fn test_shapefile_preserves_geometry_attributes_and_schema_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rivers.shp");
    let layer = river_layer();

    ShapefileFormat.write(&layer, &path).unwrap();
    let read = ShapefileFormat.read(&path).unwrap();

    assert_eq!(read.len(), 2);
    assert_eq!(read.crs.as_ref().and_then(|c| c.epsg), Some(25832));
    assert_eq!(read.geometry(0), layer.geometry(0));
    assert!(matches!(read.geometry(1), Some(Geometry::MultiLineString(m)) if m.0.len() == 2));

    let names: Vec<&str> = read.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["GEWAESSER", "GEWAESSERN", "LAENGE"]);

    let first = &read.features[0];
    assert_eq!(first.attribute("GEWAESSER"), Some(&AttributeValue::Text("Rhein".into())));
    match first.attribute("LAENGE") {
        Some(AttributeValue::Number(v)) => assert!((v - 21.18).abs() < 1e-9),
        other => panic!("unexpected LAENGE value: {:?}", other),
    }
}

#[test]
fn test_dbf_header_field_definitions() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rivers.shp");
    ShapefileFormat.write(&river_layer(), &path).unwrap();

    let fields = read_dbf_fields(&dir.path().join("rivers.dbf")).unwrap();
    assert_eq!(fields[0].kind, FieldKind::Character);
    assert_eq!(fields[0].length, 50);
    assert_eq!(fields[2].kind, FieldKind::Numeric);
    assert_eq!(fields[2].decimals, 3);
}

#[test]
fn test_geojson_preserves_geometry_attributes_and_crs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rivers.geojson");
    let layer = river_layer();

    GeoJsonFormat.write(&layer, &path).unwrap();
    let read = GeoJsonFormat.read(&path).unwrap();

    assert_eq!(read.len(), 2);
    assert_eq!(read.crs.as_ref().and_then(|c| c.epsg), Some(25832));
    assert_eq!(read.geometry(0), layer.geometry(0));
    assert_eq!(read.geometry(1), layer.geometry(1));
    assert_eq!(
        read.features[0].attribute("GEWAESSER"),
        Some(&AttributeValue::Text("Rhein".into()))
    );
}

#[test]
fn test_registry_rejects_unsupported_extension() {
    let registry = FormatRegistry::with_defaults();
    let err = registry.read(std::path::Path::new("rivers.gpkg")).unwrap_err();
    assert!(matches!(err, RiverGeoError::UnsupportedFormat { .. }));
}

#[test]
fn test_missing_shapefile_reports_file_not_found() {
    let dir = TempDir::new().unwrap();
    let err = ShapefileFormat.read(&dir.path().join("absent.shp")).unwrap_err();
    assert!(matches!(err, RiverGeoError::FileNotFound { .. }));
}

#[test]
fn test_xyz_file_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("survey.asc");
    fs::write(&path, "32500000.0\t5400000.0\t101.5\n32500001.0\t5400000.0\t-\n").unwrap();

    let result = read_xyz(&path, &XyzReadOptions::default()).unwrap();
    assert_eq!(result.points, vec![XyzPoint::new(500000.0, 5400000.0, 101.5)]);
    assert_eq!(result.dropped, 1);
}
