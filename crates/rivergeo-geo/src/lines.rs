//! Line helpers shared by the line algorithms: part extraction and
//! measure (distance-along-line) addressing.

use geo::{Coord, LineString, MultiLineString};
use rivergeo_core::models::{geometry_kind, Geometry};
use rivergeo_core::{Result, RiverGeoError};

/// Line parts of a (multi)line geometry
///
/// A LineString or Line becomes a single part; any other geometry is an
/// `InvalidGeometry` error.
pub fn line_parts(geometry: &Geometry) -> Result<MultiLineString<f64>> {
    match geometry {
        Geometry::LineString(line) => Ok(MultiLineString::new(vec![line.clone()])),
        Geometry::MultiLineString(lines) => Ok(lines.clone()),
        Geometry::Line(line) => Ok(MultiLineString::new(vec![LineString::from(vec![
            line.start, line.end,
        ])])),
        other => Err(RiverGeoError::InvalidGeometry {
            feature_id: "unknown".to_string(),
            reason: format!("expected a line geometry, found {}", geometry_kind(other)),
        }),
    }
}

/// A line string with cumulative vertex measures
#[derive(Debug, Clone)]
pub struct MeasuredLine<'a> {
    line: &'a LineString<f64>,
    measures: Vec<f64>,
}

impl<'a> MeasuredLine<'a> {
    pub fn new(line: &'a LineString<f64>) -> Self {
        let mut measures = Vec::with_capacity(line.0.len());
        let mut total = 0.0;
        for (i, coord) in line.0.iter().enumerate() {
            if i > 0 {
                total += distance(line.0[i - 1], *coord);
            }
            measures.push(total);
        }
        Self { line, measures }
    }

    pub fn line(&self) -> &LineString<f64> {
        self.line
    }

    pub fn length(&self) -> f64 {
        self.measures.last().copied().unwrap_or(0.0)
    }

    /// Measure at the start vertex of segment `index`
    pub fn segment_start(&self, index: usize) -> f64 {
        self.measures.get(index).copied().unwrap_or(0.0)
    }

    /// Point at the given measure, clamped to the line
    pub fn point_at(&self, measure: f64) -> Option<Coord<f64>> {
        let coords = &self.line.0;
        let first = *coords.first()?;
        if coords.len() == 1 || measure <= 0.0 {
            return Some(first);
        }

        let segment = self.segment_at(measure);
        let start = coords[segment];
        let end = coords[segment + 1];
        let span = self.measures[segment + 1] - self.measures[segment];
        if span <= 0.0 {
            return Some(start);
        }
        let t = ((measure - self.measures[segment]) / span).clamp(0.0, 1.0);
        Some(lerp(start, end, t))
    }

    /// The portion of the line between two measures
    pub fn substring(&self, from: f64, to: f64) -> LineString<f64> {
        let (from, to) = (from.max(0.0), to.min(self.length()));
        let mut coords = Vec::new();

        if let Some(start) = self.point_at(from) {
            coords.push(start);
        }
        for (coord, measure) in self.line.0.iter().zip(&self.measures) {
            if *measure > from && *measure < to {
                coords.push(*coord);
            }
        }
        if let Some(end) = self.point_at(to) {
            coords.push(end);
        }

        coords.dedup();
        LineString::new(coords)
    }

    // Index of the segment containing `measure`
    fn segment_at(&self, measure: f64) -> usize {
        let last_segment = self.measures.len().saturating_sub(2);
        let upper = self.measures.partition_point(|m| *m <= measure);
        upper.saturating_sub(1).min(last_segment)
    }
}

pub(crate) fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}

pub(crate) fn lerp(a: Coord<f64>, b: Coord<f64>, t: f64) -> Coord<f64> {
    Coord {
        x: a.x + (b.x - a.x) * t,
        y: a.y + (b.y - a.y) * t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point};

    #[test]
    fn test_line_parts_accepts_lines_only() {
        let single: Geometry = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)].into();
        assert_eq!(line_parts(&single).unwrap().0.len(), 1);

        let err = line_parts(&point!(x: 1.0, y: 2.0).into()).unwrap_err();
        assert!(err.to_string().contains("found Point"));
    }

    #[test]
    fn test_point_at_and_length() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 4.0)];
        let measured = MeasuredLine::new(&line);

        assert_eq!(measured.length(), 7.0);
        assert_eq!(measured.point_at(0.0), Some(Coord { x: 0.0, y: 0.0 }));
        assert_eq!(measured.point_at(3.0), Some(Coord { x: 3.0, y: 0.0 }));
        assert_eq!(measured.point_at(5.0), Some(Coord { x: 3.0, y: 2.0 }));
        assert_eq!(measured.point_at(99.0), Some(Coord { x: 3.0, y: 4.0 }));
    }

    #[test]
    fn test_substring_keeps_interior_vertices() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 4.0)];
        let measured = MeasuredLine::new(&line);

        let part = measured.substring(1.0, 5.0);
        assert_eq!(part, line_string![(x: 1.0, y: 0.0), (x: 3.0, y: 0.0), (x: 3.0, y: 2.0)]);
    }
}
