//! Shapefile format implementation
//!
//! This module provides support for reading and writing ESRI Shapefiles using
//! pure Rust. Shapefiles consist of multiple component files (.shp, .shx,
//! .dbf, .prj) that must all be present for proper reading; the `.prj` is
//! optional and a layer without one carries no CRS.

use geo::{Coord, LineString, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon};
use shapefile::dbase::{self, FieldName, FieldType, FieldValue as DbaseFieldValue, TableWriterBuilder};
use shapefile::{PolygonRing, Polyline, Reader as ShapefileReader, Shape, ShapeWriter};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{Result, RiverGeoError};
use crate::formats::prj;
use crate::formats::validation::FormatValidator;
use crate::formats::{FormatValidation, VectorFormat};
use crate::models::{geometry_kind, AttributeValue, Attributes, Feature, FieldDef, FieldKind, Geometry, Layer};

const FORMAT: &str = "Shapefile";

/// Field added when a layer without attributes is written
const FALLBACK_FIELD: &str = "FID";

/// Shapefile format
pub struct ShapefileFormat;

impl VectorFormat for ShapefileFormat {
    fn read(&self, path: &Path) -> Result<Layer> {
        if !path.exists() {
            return Err(RiverGeoError::FileNotFound { path: path.to_path_buf() });
        }

        let fields = read_dbf_fields(&path.with_extension("dbf"))?;
        let crs = read_crs(path)?;

        let mut reader = ShapefileReader::from_path(path)
            .map_err(|e| RiverGeoError::format(FORMAT, format!("Failed to open Shapefile: {}", e)))?;

        let mut features = Vec::new();
        for (index, result) in reader.iter_shapes_and_records().enumerate() {
            let (shape, record) = result.map_err(|e| {
                RiverGeoError::format(FORMAT, format!("Failed to read feature {}: {}", index, e))
            })?;

            let geometry = shape_to_geometry(&shape)?;

            let mut attributes = Attributes::new();
            for field in &fields {
                let value = record
                    .get(&field.name)
                    .map(|v| convert_dbase_value(v, field))
                    .unwrap_or(AttributeValue::Null);
                attributes.insert(field.name.clone(), value);
            }

            features.push(Feature { geometry, attributes });
        }

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();

        tracing::debug!(
            "Read {} feature(s) from {} (CRS {})",
            features.len(),
            path.display(),
            crs.as_ref().map(|c| c.to_string()).unwrap_or_else(|| "undefined".to_string())
        );

        Ok(Layer { name, crs, fields, features })
    }

    fn write(&self, layer: &Layer, path: &Path) -> Result<()> {
        if !has_extension(path, "shp") {
            return Err(RiverGeoError::InvalidPath {
                path: path.to_path_buf(),
                reason: "Not a Shapefile (.shp)".to_string(),
            });
        }

        let mut fields = layer.effective_fields();
        let add_fallback = fields.is_empty();
        if add_fallback {
            fields.push(FieldDef::numeric(FALLBACK_FIELD, 10, 0));
        }

        let kind = ShapeKind::of_layer(layer)?;
        let mut shapes = ShapeWriter::from_path(path).map_err(|e| {
            RiverGeoError::format(FORMAT, format!("Failed to create {}: {}", path.display(), e))
        })?;
        let dbf_path = path.with_extension("dbf");
        let mut table = table_builder(&fields)?.build_with_file_dest(&dbf_path).map_err(|e| {
            RiverGeoError::format(FORMAT, format!("Failed to create {}: {}", dbf_path.display(), e))
        })?;

        let mut written = 0usize;
        for (index, feature) in layer.features.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                tracing::warn!("Skipping feature {} without geometry", index);
                continue;
            };

            let mut record = build_record(feature, &fields);
            if add_fallback {
                record.insert(
                    FALLBACK_FIELD.to_string(),
                    DbaseFieldValue::Numeric(Some(index as f64)),
                );
            }

            let result = match kind {
                ShapeKind::Point => shapes.write_shape(&to_shp_point(geometry, index)?),
                ShapeKind::Polyline => shapes.write_shape(&to_shp_polyline(geometry, index)?),
            };
            result.map_err(|e| {
                RiverGeoError::format(FORMAT, format!("Failed to write feature {}: {}", index, e))
            })?;
            table.write_record(&record).map_err(|e| {
                RiverGeoError::format(FORMAT, format!("Failed to write record {}: {}", index, e))
            })?;
            written += 1;
        }

        // Header sizes are only known once every record is written
        shapes.finalize().map_err(|e| {
            RiverGeoError::format(FORMAT, format!("Failed to finalize {}: {}", path.display(), e))
        })?;
        table.finalize().map_err(|e| {
            RiverGeoError::format(FORMAT, format!("Failed to finalize {}: {}", dbf_path.display(), e))
        })?;

        write_prj(layer, path)?;

        tracing::debug!("Wrote {} shape(s) to {}", written, path.display());
        Ok(())
    }

    fn supported_extensions(&self) -> &[&str] {
        &["shp"]
    }

    fn format_name(&self) -> &str {
        FORMAT
    }

    fn validate(&self, path: &Path) -> Result<FormatValidation> {
        let extension = FormatValidator::validate_extension(path, &["shp"]);
        if !extension.is_valid() {
            return Ok(extension);
        }
        Ok(FormatValidator::validate_component_files(path, &["shp", "shx", "dbf"], &["prj"]))
    }
}

/// Geometry family of an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShapeKind {
    Point,
    Polyline,
}

impl ShapeKind {
    fn of_geometry(geometry: &Geometry) -> Option<Self> {
        match geometry {
            Geometry::Point(_) => Some(ShapeKind::Point),
            Geometry::LineString(_) | Geometry::MultiLineString(_) | Geometry::Line(_) => {
                Some(ShapeKind::Polyline)
            }
            _ => None,
        }
    }

    /// Chosen from the first geometry; every other geometry must agree
    fn of_layer(layer: &Layer) -> Result<Self> {
        let mut kind = None;
        for (index, feature) in layer.features.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                continue;
            };
            let this = ShapeKind::of_geometry(geometry).ok_or_else(|| {
                RiverGeoError::format(
                    FORMAT,
                    format!(
                        "Feature {}: only point and line geometries can be written, found {}",
                        index,
                        geometry_kind(geometry)
                    ),
                )
            })?;
            match kind {
                None => kind = Some(this),
                Some(k) if k != this => {
                    return Err(RiverGeoError::format(
                        FORMAT,
                        format!("Feature {}: mixed point and line geometries in one layer", index),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(kind.unwrap_or(ShapeKind::Polyline))
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case(ext))
        .unwrap_or(false)
}

/// Read the CRS from the `.prj` sidecar, `None` when absent
fn read_crs(path: &Path) -> Result<Option<crate::models::Crs>> {
    let prj_path = path.with_extension("prj");
    if !prj_path.exists() {
        tracing::debug!("No .prj next to {}", path.display());
        return Ok(None);
    }

    let content = fs::read(&prj_path)?;
    let content = String::from_utf8_lossy(&content);
    let crs = prj::parse_prj(&content);

    if let Some(crs) = &crs {
        if crs.epsg.is_none() {
            tracing::warn!(
                "Could not identify an EPSG code in {}; keeping the WKT definition",
                prj_path.display()
            );
        }
    }

    Ok(crs)
}

fn write_prj(layer: &Layer, path: &Path) -> Result<()> {
    let prj_path = path.with_extension("prj");
    match layer.crs.as_ref().and_then(prj::prj_content) {
        Some(content) => fs::write(&prj_path, content)?,
        None => {
            if let Some(crs) = &layer.crs {
                tracing::warn!("No WKT known for {}; {} written without .prj", crs, path.display());
            }
            if prj_path.exists() {
                fs::remove_file(&prj_path)?;
            }
        }
    }
    Ok(())
}

/// Read the ordered field definitions of a `.dbf` table
pub fn read_dbf_fields(path: &Path) -> Result<Vec<FieldDef>> {
    let reader = dbase::Reader::from_path(path)
        .map_err(|e| RiverGeoError::format(FORMAT, format!("Failed to open {}: {}", path.display(), e)))?;
    let decimals = read_decimal_counts(path, reader.fields().len())?;

    Ok(reader
        .fields()
        .iter()
        .zip(decimals)
        .map(|(info, decimals)| {
            FieldDef::new(info.name(), field_kind(info.field_type(), info.name()), info.length(), decimals)
        })
        .collect())
}

fn field_kind(field_type: FieldType, name: &str) -> FieldKind {
    match field_type {
        FieldType::Character => FieldKind::Character,
        FieldType::Numeric => FieldKind::Numeric,
        FieldType::Float => FieldKind::Float,
        FieldType::Integer => FieldKind::Integer,
        FieldType::Double | FieldType::Currency => FieldKind::Double,
        FieldType::Logical => FieldKind::Logical,
        FieldType::Date => FieldKind::Date,
        other => {
            tracing::debug!("Field {} has type {:?}, read as text", name, other);
            FieldKind::Character
        }
    }
}

/// Decimal counts of the first `count` field descriptors
///
/// dbase does not expose them; each 32-byte descriptor after the 32-byte
/// table header stores the count at offset 17.
fn read_decimal_counts(path: &Path, count: usize) -> Result<Vec<u8>> {
    let mut header = vec![0u8; 32 * (count + 1)];
    fs::File::open(path)?
        .read_exact(&mut header)
        .map_err(|e| RiverGeoError::format(FORMAT, format!("Truncated .dbf header: {}", e)))?;
    Ok((1..=count).map(|i| header[32 * i + 17]).collect())
}

fn table_builder(fields: &[FieldDef]) -> Result<TableWriterBuilder> {
    let mut builder = TableWriterBuilder::new();
    for field in fields {
        let name = FieldName::try_from(field.name.as_str()).map_err(|_| {
            RiverGeoError::format(
                FORMAT,
                format!("Field name '{}' is not a valid dBase name (max 10 characters)", field.name),
            )
        })?;

        builder = match field.kind {
            FieldKind::Character => builder.add_character_field(name, field.length.max(1)),
            FieldKind::Numeric | FieldKind::Float | FieldKind::Double => {
                let length = field.length.clamp(1, 32);
                builder.add_numeric_field(name, length, field.decimals.min(length.saturating_sub(2)))
            }
            FieldKind::Integer => builder.add_numeric_field(name, 11, 0),
            FieldKind::Logical => builder.add_logical_field(name),
            FieldKind::Date => builder.add_date_field(name),
        };
    }
    Ok(builder)
}

fn build_record(feature: &Feature, fields: &[FieldDef]) -> dbase::Record {
    let mut record = dbase::Record::default();
    for field in fields {
        let value = feature.attribute(&field.name).unwrap_or(&AttributeValue::Null);
        record.insert(field.name.clone(), to_dbase_value(value, field));
    }
    record
}

/// Coerce an attribute to the field's dBase type; values that cannot be
/// represented become null
fn to_dbase_value(value: &AttributeValue, field: &FieldDef) -> DbaseFieldValue {
    match field.kind {
        FieldKind::Character => {
            let text = match value {
                AttributeValue::Null => None,
                other => Some(truncate_bytes(&other.to_string(), field.length as usize)),
            };
            DbaseFieldValue::Character(text)
        }
        FieldKind::Numeric | FieldKind::Float | FieldKind::Double | FieldKind::Integer => {
            let number = match value {
                AttributeValue::Integer(i) => Some(*i as f64),
                AttributeValue::Number(n) if n.is_finite() => Some(*n),
                AttributeValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
                AttributeValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
                _ => None,
            };
            DbaseFieldValue::Numeric(number)
        }
        FieldKind::Logical => {
            let flag = match value {
                AttributeValue::Boolean(b) => Some(*b),
                AttributeValue::Integer(i) => Some(*i != 0),
                AttributeValue::Text(s) => match s.trim().to_ascii_uppercase().as_str() {
                    "T" | "Y" | "TRUE" | "YES" => Some(true),
                    "F" | "N" | "FALSE" | "NO" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            DbaseFieldValue::Logical(flag)
        }
        FieldKind::Date => {
            let date = match value {
                AttributeValue::Date(s) | AttributeValue::Text(s) => parse_iso_date(s),
                _ => None,
            };
            DbaseFieldValue::Date(date)
        }
    }
}

fn parse_iso_date(s: &str) -> Option<dbase::Date> {
    let mut parts = s.trim().splitn(3, '-');
    let year = parts.next()?.parse::<u32>().ok()?;
    let month = parts.next()?.parse::<u32>().ok()?;
    let day = parts.next()?.get(..2)?.parse::<u32>().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some(dbase::Date::new(day, month, year))
}

fn truncate_bytes(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

/// Convert dBase field value to an attribute value
fn convert_dbase_value(value: &DbaseFieldValue, field: &FieldDef) -> AttributeValue {
    match value {
        DbaseFieldValue::Character(Some(s)) => AttributeValue::Text(s.trim_end().to_string()),
        DbaseFieldValue::Character(None) => AttributeValue::Null,
        DbaseFieldValue::Numeric(Some(n)) => {
            if field.decimals == 0 && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                AttributeValue::Integer(*n as i64)
            } else {
                AttributeValue::Number(*n)
            }
        }
        DbaseFieldValue::Numeric(None) => AttributeValue::Null,
        DbaseFieldValue::Logical(Some(b)) => AttributeValue::Boolean(*b),
        DbaseFieldValue::Logical(None) => AttributeValue::Null,
        DbaseFieldValue::Date(Some(date)) => AttributeValue::Date(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        DbaseFieldValue::Date(None) => AttributeValue::Null,
        DbaseFieldValue::Float(Some(f)) => AttributeValue::Number(*f as f64),
        DbaseFieldValue::Float(None) => AttributeValue::Null,
        DbaseFieldValue::Integer(i) => AttributeValue::Integer(*i as i64),
        DbaseFieldValue::Currency(c) => AttributeValue::Number(*c),
        DbaseFieldValue::DateTime(dt) => AttributeValue::Date(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
        DbaseFieldValue::Double(d) => AttributeValue::Number(*d),
        DbaseFieldValue::Memo(s) => AttributeValue::Text(s.clone()),
    }
}

fn parts_to_lines<T>(parts: &[Vec<T>], xy: impl Fn(&T) -> Coord) -> Geometry {
    let mut lines: Vec<LineString> = parts
        .iter()
        .map(|part| LineString::new(part.iter().map(&xy).collect()))
        .collect();

    if lines.len() == 1 {
        Geometry::LineString(lines.remove(0))
    } else {
        Geometry::MultiLineString(MultiLineString::new(lines))
    }
}

/// Outer rings start a new polygon, inner rings become holes of the last one
fn rings_to_polygons<T>(rings: &[PolygonRing<T>], xy: impl Fn(&T) -> Coord) -> Geometry {
    let mut polygons: Vec<(LineString, Vec<LineString>)> = Vec::new();
    for ring in rings {
        let line = LineString::new(ring.points().iter().map(&xy).collect());
        match ring {
            PolygonRing::Outer(_) => polygons.push((line, Vec::new())),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some((_, holes)) => holes.push(line),
                None => polygons.push((line, Vec::new())),
            },
        }
    }

    let mut polygons: Vec<Polygon> = polygons
        .into_iter()
        .map(|(exterior, holes)| Polygon::new(exterior, holes))
        .collect();

    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(MultiPolygon::new(polygons))
    }
}

/// Convert a shapefile shape into a 2D geometry; Z and M are dropped
fn shape_to_geometry(shape: &Shape) -> Result<Option<Geometry>> {
    let geometry = match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::PointM(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::PointZ(p) => Geometry::Point(Point::new(p.x, p.y)),
        Shape::Polyline(line) => parts_to_lines(line.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolylineM(line) => parts_to_lines(line.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolylineZ(line) => parts_to_lines(line.parts(), |p| Coord { x: p.x, y: p.y }),
        Shape::Polygon(polygon) => rings_to_polygons(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
        Shape::PolygonM(polygon) => {
            rings_to_polygons(polygon.rings(), |p| Coord { x: p.x, y: p.y })
        }
        Shape::PolygonZ(polygon) => {
            rings_to_polygons(polygon.rings(), |p| Coord { x: p.x, y: p.y })
        }
        Shape::Multipoint(mp) => Geometry::MultiPoint(MultiPoint::new(
            mp.points().iter().map(|p| Point::new(p.x, p.y)).collect(),
        )),
        Shape::MultipointM(mp) => Geometry::MultiPoint(MultiPoint::new(
            mp.points().iter().map(|p| Point::new(p.x, p.y)).collect(),
        )),
        Shape::MultipointZ(mp) => Geometry::MultiPoint(MultiPoint::new(
            mp.points().iter().map(|p| Point::new(p.x, p.y)).collect(),
        )),
        Shape::Multipatch(_) => {
            return Err(RiverGeoError::format(
                FORMAT,
                "Multipatch geometry type is not supported",
            ))
        }
    };
    Ok(Some(geometry))
}

fn to_shp_point(geometry: &Geometry, index: usize) -> Result<shapefile::Point> {
    match geometry {
        Geometry::Point(p) if p.x().is_finite() && p.y().is_finite() => {
            Ok(shapefile::Point::new(p.x(), p.y()))
        }
        _ => Err(RiverGeoError::InvalidGeometry {
            feature_id: index.to_string(),
            reason: "expected a point with finite coordinates".to_string(),
        }),
    }
}

fn to_shp_polyline(geometry: &Geometry, index: usize) -> Result<Polyline> {
    let lines: Vec<LineString> = match geometry {
        Geometry::LineString(line) => vec![line.clone()],
        Geometry::MultiLineString(multi) => multi.0.clone(),
        Geometry::Line(line) => vec![LineString::from(vec![line.start, line.end])],
        _ => Vec::new(),
    };

    if lines.is_empty() {
        return Err(RiverGeoError::InvalidGeometry {
            feature_id: index.to_string(),
            reason: "expected a line geometry with at least one part".to_string(),
        });
    }

    let mut parts = Vec::with_capacity(lines.len());
    for line in lines {
        if line.0.len() < 2 {
            return Err(RiverGeoError::InvalidGeometry {
                feature_id: index.to_string(),
                reason: format!("line part has {} vertex, at least 2 required", line.0.len()),
            });
        }
        parts.push(
            line.coords()
                .map(|c| shapefile::Point::new(c.x, c.y))
                .collect::<Vec<_>>(),
        );
    }

    Ok(Polyline::with_parts(parts))
}
