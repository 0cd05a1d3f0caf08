//! Centerline / bankline crossing points

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Coord, Line, MultiLineString, Point};

use crate::index::SegmentIndex;
use crate::lines::distance;

const DEDUP_TOLERANCE: f64 = 1e-9;

/// Single-point intersections between two (multi)lines
///
/// Proper crossings and touches are both reported. Collinear overlaps are
/// not points and are dropped. Points are ordered along `a`, and points
/// closer than 1e-9 to an earlier one (shared vertices) are removed.
pub fn line_intersection_points(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> Vec<Point<f64>> {
    let indexes: Vec<(SegmentIndex, Vec<Line<f64>>)> = b
        .0
        .iter()
        .map(|part| (SegmentIndex::from_line_string(part), part.lines().collect()))
        .collect();

    let mut points: Vec<Coord<f64>> = Vec::new();

    for segment in a.0.iter().flat_map(|part| part.lines()) {
        let mut hits: Vec<Coord<f64>> = Vec::new();

        for (index, lines) in &indexes {
            for candidate in index.envelope_candidates(&segment) {
                if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                    line_intersection(segment, lines[candidate])
                {
                    hits.push(intersection);
                }
            }
        }

        hits.sort_by(|p, q| {
            distance(segment.start, *p).total_cmp(&distance(segment.start, *q))
        });
        for hit in hits {
            push_unique(&mut points, hit);
        }
    }

    points.into_iter().map(Point::from).collect()
}

/// Intersections of the centerline with bank 1 followed by those with bank 2
pub fn centerline_bank_intersections(
    centerline: &MultiLineString<f64>,
    bank1: &MultiLineString<f64>,
    bank2: &MultiLineString<f64>,
) -> Vec<Point<f64>> {
    let mut points = line_intersection_points(centerline, bank1);
    points.extend(line_intersection_points(centerline, bank2));
    tracing::debug!("Found {} centerline/bankline intersection(s)", points.len());
    points
}

fn push_unique(points: &mut Vec<Coord<f64>>, candidate: Coord<f64>) {
    let duplicate = points.iter().any(|p| {
        (p.x - candidate.x).abs() <= DEDUP_TOLERANCE && (p.y - candidate.y).abs() <= DEDUP_TOLERANCE
    });
    if !duplicate {
        points.push(candidate);
    }
}
