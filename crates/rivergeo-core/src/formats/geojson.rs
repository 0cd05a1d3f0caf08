//! GeoJSON format implementation
//!
//! FeatureCollections are read and written with the legacy `crs` member so
//! projected coordinates survive a round trip. Files without a `crs` member
//! are WGS 84 per RFC 7946.

use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use std::fs;
use std::path::Path;

use crate::error::{Result, RiverGeoError};
use crate::formats::validation::FormatValidator;
use crate::formats::{FormatValidation, VectorFormat};
use crate::models::{AttributeValue, Attributes, Crs, Feature, FieldDef, Geometry, Layer};

const FORMAT: &str = "GeoJSON";

/// GeoJSON format
pub struct GeoJsonFormat;

impl VectorFormat for GeoJsonFormat {
    fn read(&self, path: &Path) -> Result<Layer> {
        if !path.exists() {
            return Err(RiverGeoError::FileNotFound { path: path.to_path_buf() });
        }

        let content = fs::read_to_string(path)?;
        let geojson: geojson::GeoJson = content
            .parse()
            .map_err(|e| RiverGeoError::format(FORMAT, format!("Failed to parse GeoJSON: {}", e)))?;

        let (features, crs) = match geojson {
            geojson::GeoJson::FeatureCollection(fc) => {
                let crs = fc
                    .foreign_members
                    .as_ref()
                    .and_then(|fm| fm.get("crs"))
                    .and_then(extract_epsg_from_crs)
                    .unwrap_or(4326);
                (fc.features, crs)
            }
            geojson::GeoJson::Feature(feature) => (vec![feature], 4326),
            geojson::GeoJson::Geometry(geometry) => (
                vec![geojson::Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: None,
                    properties: None,
                    foreign_members: None,
                }],
                4326,
            ),
        };

        let mut fields: Vec<FieldDef> = Vec::new();
        let mut layer_features = Vec::with_capacity(features.len());
        for (index, feature) in features.into_iter().enumerate() {
            let geometry = feature
                .geometry
                .map(|g| convert_geometry(&g.value, index))
                .transpose()?;

            let mut attributes = Attributes::new();
            if let Some(properties) = feature.properties {
                for (key, value) in properties {
                    let value = AttributeValue::from_json(&value);
                    if !fields.iter().any(|f| f.name == key) {
                        fields.push(FieldDef::infer(key.clone(), &value));
                    }
                    attributes.insert(key, value);
                }
            }

            layer_features.push(Feature { geometry, attributes });
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        Ok(Layer {
            name,
            crs: Some(Crs::from_epsg(crs)),
            fields,
            features: layer_features,
        })
    }

    fn write(&self, layer: &Layer, path: &Path) -> Result<()> {
        let fields = layer.effective_fields();

        let mut features = Vec::with_capacity(layer.len());
        for feature in &layer.features {
            let geometry = feature.geometry.as_ref().map(|g| geojson::Geometry::new(to_geojson_value(g)));

            let mut properties = serde_json::Map::new();
            for field in &fields {
                let value = feature
                    .attribute(&field.name)
                    .map(AttributeValue::to_json)
                    .unwrap_or(serde_json::Value::Null);
                properties.insert(field.name.clone(), value);
            }

            features.push(geojson::Feature {
                bbox: None,
                geometry,
                id: None,
                properties: Some(properties),
                foreign_members: None,
            });
        }

        let foreign_members = match &layer.crs {
            Some(Crs { epsg: Some(code), .. }) if *code != 4326 => {
                let mut members = serde_json::Map::new();
                members.insert("name".to_string(), serde_json::Value::String(layer.name.clone()));
                members.insert(
                    "crs".to_string(),
                    serde_json::json!({
                        "type": "name",
                        "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", code) }
                    }),
                );
                Some(members)
            }
            Some(Crs { epsg: None, .. }) => {
                tracing::warn!(
                    "{} has a CRS without EPSG code; GeoJSON output carries no crs member",
                    layer.name
                );
                None
            }
            _ => None,
        };

        let collection = geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members,
        };

        let content = serde_json::to_string_pretty(&collection)
            .map_err(|e| RiverGeoError::Serialization(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    fn supported_extensions(&self) -> &[&str] {
        &["geojson", "json"]
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        Ok(FormatValidator::merge_validations(vec![
            FormatValidator::validate_extension(path, self.supported_extensions()),
            FormatValidator::validate_not_empty(path),
        ]))
    }
}

/// Extract EPSG code from a legacy `crs` member
/// (`EPSG:4326` or `urn:ogc:def:crs:EPSG::4326`)
fn extract_epsg_from_crs(crs: &serde_json::Value) -> Option<u32> {
    let name = crs.get("properties")?.get("name")?.as_str()?;
    if name.ends_with("CRS84") {
        return Some(4326);
    }
    name.rsplit(':').next()?.parse().ok()
}

fn position(pos: &[f64], index: usize) -> Result<Coord> {
    match pos {
        [x, y, ..] => Ok(Coord { x: *x, y: *y }),
        _ => Err(RiverGeoError::InvalidGeometry {
            feature_id: index.to_string(),
            reason: format!("position needs at least 2 values, found {}", pos.len()),
        }),
    }
}

fn line(positions: &[Vec<f64>], index: usize) -> Result<LineString> {
    positions
        .iter()
        .map(|p| position(p, index))
        .collect::<Result<Vec<_>>>()
        .map(LineString::new)
}

fn polygon(rings: &[Vec<Vec<f64>>], index: usize) -> Result<Polygon> {
    let mut rings = rings.iter().map(|r| line(r, index)).collect::<Result<Vec<_>>>()?;
    if rings.is_empty() {
        return Ok(Polygon::new(LineString::new(vec![]), vec![]));
    }
    let exterior = rings.remove(0);
    Ok(Polygon::new(exterior, rings))
}

fn convert_geometry(value: &geojson::Value, index: usize) -> Result<Geometry> {
    let geometry = match value {
        geojson::Value::Point(p) => Geometry::Point(Point(position(p, index)?)),
        geojson::Value::MultiPoint(points) => Geometry::MultiPoint(MultiPoint::new(
            points
                .iter()
                .map(|p| position(p, index).map(Point))
                .collect::<Result<Vec<_>>>()?,
        )),
        geojson::Value::LineString(positions) => Geometry::LineString(line(positions, index)?),
        geojson::Value::MultiLineString(lines) => Geometry::MultiLineString(MultiLineString::new(
            lines.iter().map(|l| line(l, index)).collect::<Result<Vec<_>>>()?,
        )),
        geojson::Value::Polygon(rings) => Geometry::Polygon(polygon(rings, index)?),
        geojson::Value::MultiPolygon(polygons) => Geometry::MultiPolygon(MultiPolygon::new(
            polygons.iter().map(|p| polygon(p, index)).collect::<Result<Vec<_>>>()?,
        )),
        geojson::Value::GeometryCollection(geometries) => {
            Geometry::GeometryCollection(geo::GeometryCollection::from(
                geometries
                    .iter()
                    .map(|g| convert_geometry(&g.value, index))
                    .collect::<Result<Vec<_>>>()?,
            ))
        }
    };
    Ok(geometry)
}

fn line_positions(line: &LineString) -> Vec<Vec<f64>> {
    line.coords().map(|c| vec![c.x, c.y]).collect()
}

fn polygon_positions(polygon: &Polygon) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(line_positions)
        .collect()
}

fn to_geojson_value(geometry: &Geometry) -> geojson::Value {
    match geometry {
        Geometry::Point(p) => geojson::Value::Point(vec![p.x(), p.y()]),
        Geometry::Line(l) => {
            geojson::Value::LineString(vec![vec![l.start.x, l.start.y], vec![l.end.x, l.end.y]])
        }
        Geometry::LineString(l) => geojson::Value::LineString(line_positions(l)),
        Geometry::Polygon(p) => geojson::Value::Polygon(polygon_positions(p)),
        Geometry::MultiPoint(mp) => {
            geojson::Value::MultiPoint(mp.iter().map(|p| vec![p.x(), p.y()]).collect())
        }
        Geometry::MultiLineString(ml) => {
            geojson::Value::MultiLineString(ml.iter().map(line_positions).collect())
        }
        Geometry::MultiPolygon(mp) => {
            geojson::Value::MultiPolygon(mp.iter().map(polygon_positions).collect())
        }
        Geometry::GeometryCollection(gc) => geojson::Value::GeometryCollection(
            gc.iter().map(|g| geojson::Geometry::new(to_geojson_value(g))).collect(),
        ),
        Geometry::Rect(r) => geojson::Value::Polygon(polygon_positions(&r.to_polygon())),
        Geometry::Triangle(t) => geojson::Value::Polygon(polygon_positions(&t.to_polygon())),
    }
}
