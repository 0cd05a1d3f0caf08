use rivergeo_core::models::{geometry_kind, Geometry};
use rivergeo_core::{Result, RiverGeoError};
use serde::Serialize;

/// Validation result with details
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Validation error with location details
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub location: String,
    pub reason: String,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        Self { is_valid: true, errors: Vec::new() }
    }

    /// Add an error to the result
    pub fn add_error(&mut self, location: String, reason: String) {
        self.is_valid = false;
        self.errors.push(ValidationError { location, reason });
    }

    fn absorb(&mut self, prefix: &str, other: ValidationResult) {
        for error in other.errors {
            self.add_error(format!("{}.{}", prefix, error.location), error.reason);
        }
    }
}

/// Validate a geometry
///
/// Lines need at least 2 vertices, polygon rings must be closed with at
/// least 4 vertices, and every coordinate must be finite.
pub fn validate_geometry(geometry: &Geometry) -> ValidationResult {
    match geometry {
        Geometry::Point(p) => validate_coords("Point", std::iter::once(p.0)),
        Geometry::Line(line) => validate_coords("Line", [line.start, line.end].into_iter()),
        Geometry::LineString(ls) => validate_linestring("LineString", ls),
        Geometry::Polygon(poly) => validate_polygon(poly),
        Geometry::MultiPoint(mp) => validate_coords("MultiPoint", mp.0.iter().map(|p| p.0)),
        Geometry::MultiLineString(mls) => {
            let mut result = ValidationResult::valid();
            for (i, ls) in mls.0.iter().enumerate() {
                result.absorb(&format!("MultiLineString[{}]", i), validate_linestring("LineString", ls));
            }
            result
        }
        Geometry::MultiPolygon(mp) => {
            let mut result = ValidationResult::valid();
            for (i, poly) in mp.0.iter().enumerate() {
                result.absorb(&format!("MultiPolygon[{}]", i), validate_polygon(poly));
            }
            result
        }
        Geometry::GeometryCollection(gc) => {
            let mut result = ValidationResult::valid();
            for (i, member) in gc.0.iter().enumerate() {
                result.absorb(&format!("GeometryCollection[{}]", i), validate_geometry(member));
            }
            result
        }
        Geometry::Rect(rect) => validate_coords("Rect", [rect.min(), rect.max()].into_iter()),
        Geometry::Triangle(tri) => validate_coords("Triangle", tri.to_array().into_iter()),
    }
}

/// Error out on the first validation problem
pub fn ensure_valid(geometry: &Geometry, feature_id: impl Into<String>) -> Result<()> {
    let validation = validate_geometry(geometry);
    match validation.errors.into_iter().next() {
        None => Ok(()),
        Some(error) => Err(RiverGeoError::InvalidGeometry {
            feature_id: feature_id.into(),
            reason: format!("{} ({}): {}", geometry_kind(geometry), error.location, error.reason),
        }),
    }
}

fn validate_coords(location: &str, coords: impl Iterator<Item = geo::Coord<f64>>) -> ValidationResult {
    let mut result = ValidationResult::valid();
    for (i, coord) in coords.enumerate() {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            result.add_error(format!("{}[{}]", location, i), "Coordinates must be finite".to_string());
        }
    }
    result
}

fn validate_linestring(location: &str, linestring: &geo::LineString<f64>) -> ValidationResult {
    // LineString must have at least 2 points
    if linestring.0.len() < 2 {
        let mut result = ValidationResult::valid();
        result.add_error(
            location.to_string(),
            format!("LineString must have at least 2 points, found {}", linestring.0.len()),
        );
        return result;
    }

    validate_coords(location, linestring.0.iter().copied())
}

fn validate_ring(location: &str, ring: &geo::LineString<f64>) -> ValidationResult {
    let mut result = validate_coords(location, ring.0.iter().copied());

    if ring.0.len() < 4 {
        result.add_error(
            location.to_string(),
            format!("Polygon ring must have at least 4 points, found {}", ring.0.len()),
        );
    }

    if let (Some(first), Some(last)) = (ring.0.first(), ring.0.last()) {
        if first != last {
            result.add_error(
                location.to_string(),
                "Polygon ring must be closed (first point == last point)".to_string(),
            );
        }
    }

    result
}

fn validate_polygon(polygon: &geo::Polygon<f64>) -> ValidationResult {
    let mut result = validate_ring("Polygon exterior", polygon.exterior());
    for (i, interior) in polygon.interiors().iter().enumerate() {
        let ring = validate_ring(&format!("Polygon interior[{}]", i), interior);
        result.errors.extend(ring.errors);
    }
    result.is_valid = result.errors.is_empty();
    result
}
