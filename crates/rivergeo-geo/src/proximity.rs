//! Segments where two lines come closer than a distance threshold
//!
//! Line 1 is sampled at evenly spaced normalized positions. Whenever the
//! nearest point on line 2 is closer than the threshold, the portions of
//! both lines inside a disc of radius `threshold` (around the sample, and
//! around its nearest point on line 2) are recorded as measure intervals.
//! Intervals are unioned per part, so every output segment is distinct.

use geo::{Coord, Distance, Euclidean, LineString, MultiLineString};
use serde::Serialize;

use crate::index::SegmentIndex;
use crate::lines::{distance, MeasuredLine};

/// Default number of samples along each part of line 1
pub const DEFAULT_SAMPLES: usize = 100_000;

const MERGE_TOLERANCE: f64 = 1e-9;

/// Which input line a segment was cut from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSource {
    First,
    Second,
}

impl LineSource {
    /// Numeric code written to the `SOURCE` attribute
    pub fn code(&self) -> i64 {
        match self {
            LineSource::First => 1,
            LineSource::Second => 2,
        }
    }
}

/// A piece of one input line lying close to the other line
#[derive(Debug, Clone, PartialEq)]
pub struct NearbySegment {
    pub source: LineSource,
    pub geometry: LineString<f64>,
}

/// Minimum Euclidean distance between two (multi)lines
///
/// Zero when they touch or cross; infinite when either has no parts.
pub fn min_distance(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> f64 {
    let mut best = f64::INFINITY;
    for part_a in a.0.iter().filter(|p| !p.0.is_empty()) {
        for part_b in b.0.iter().filter(|p| !p.0.is_empty()) {
            best = best.min(Euclidean.distance(part_a, part_b));
        }
    }
    best
}

/// Find the portions of both lines that lie within `threshold` of each other
///
/// First-line segments come before second-line segments, each in part and
/// measure order. `samples` below 2 is raised to 2.
pub fn find_nearby_segments(
    line1: &MultiLineString<f64>,
    line2: &MultiLineString<f64>,
    threshold: f64,
    samples: usize,
) -> Vec<NearbySegment> {
    let samples = samples.max(2);
    let measured1: Vec<MeasuredLine> = line1.0.iter().map(MeasuredLine::new).collect();
    let measured2: Vec<MeasuredLine> = line2.0.iter().map(MeasuredLine::new).collect();
    let index1: Vec<SegmentIndex> = line1.0.iter().map(SegmentIndex::from_line_string).collect();
    let index2: Vec<SegmentIndex> = line2.0.iter().map(SegmentIndex::from_line_string).collect();

    let mut intervals1: Vec<Vec<(f64, f64)>> = vec![Vec::new(); measured1.len()];
    let mut intervals2: Vec<Vec<(f64, f64)>> = vec![Vec::new(); measured2.len()];

    for (i, part1) in measured1.iter().enumerate() {
        let length = part1.length();

        for (j, part2) in measured2.iter().enumerate() {
            let mut hits = 0usize;

            for k in 0..samples {
                let t = k as f64 / (samples - 1) as f64;
                let Some(sample) = part1.point_at(t * length) else {
                    break;
                };
                let Some((_, nearest)) = index2[j].nearest(sample) else {
                    break;
                };

                if distance(sample, nearest) < threshold {
                    hits += 1;
                    clip_to_disc(part1, &index1[i], sample, threshold, &mut intervals1[i]);
                    clip_to_disc(part2, &index2[j], nearest, threshold, &mut intervals2[j]);
                }
            }

            tracing::debug!("Part pair ({}, {}): {} of {} samples within {}", i, j, hits, samples, threshold);
        }
    }

    let mut segments = Vec::new();
    collect_segments(&measured1, intervals1, LineSource::First, &mut segments);
    collect_segments(&measured2, intervals2, LineSource::Second, &mut segments);
    segments
}

// Records the measure intervals of `part` that lie inside the disc
fn clip_to_disc(
    part: &MeasuredLine,
    index: &SegmentIndex,
    center: Coord<f64>,
    radius: f64,
    out: &mut Vec<(f64, f64)>,
) {
    let coords = &part.line().0;
    for segment in index.within_distance(center, radius) {
        let (start, end) = (coords[segment], coords[segment + 1]);
        if let Some((t0, t1)) = segment_disc_overlap(start, end, center, radius) {
            let offset = part.segment_start(segment);
            let length = distance(start, end);
            out.push((offset + t0 * length, offset + t1 * length));
        }
    }
}

/// Parameter range `[t0, t1]` of segment `start -> end` inside the disc
fn segment_disc_overlap(start: Coord<f64>, end: Coord<f64>, center: Coord<f64>, radius: f64) -> Option<(f64, f64)> {
    let d = end - start;
    let f = start - center;

    let a = d.x * d.x + d.y * d.y;
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * (f.x * d.x + f.y * d.y);
    let c = f.x * f.x + f.y * f.y - radius * radius;

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return None;
    }

    let root = discriminant.sqrt();
    let t0 = ((-b - root) / (2.0 * a)).max(0.0);
    let t1 = ((-b + root) / (2.0 * a)).min(1.0);
    (t1 > t0).then_some((t0, t1))
}

fn union_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 + MERGE_TOLERANCE => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn collect_segments(
    parts: &[MeasuredLine],
    intervals: Vec<Vec<(f64, f64)>>,
    source: LineSource,
    out: &mut Vec<NearbySegment>,
) {
    for (part, part_intervals) in parts.iter().zip(intervals) {
        for (from, to) in union_intervals(part_intervals) {
            let geometry = part.substring(from, to);
            if geometry.0.len() >= 2 {
                out.push(NearbySegment { source, geometry });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::line_string;
    use proptest::prelude::*;

    fn multi(line: LineString<f64>) -> MultiLineString<f64> {
        MultiLineString::new(vec![line])
    }

    fn assert_line_close(actual: &LineString<f64>, expected: &LineString<f64>) {
        assert_eq!(actual.0.len(), expected.0.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.0.iter().zip(&expected.0) {
            assert!(distance(*a, *e) < 1e-9, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_min_distance() {
        let a = multi(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let b = multi(line_string![(x: 0.0, y: 3.0), (x: 10.0, y: 1.5)]);
        assert!((min_distance(&a, &b) - 1.5).abs() < 1e-12);

        let crossing = multi(line_string![(x: 5.0, y: -1.0), (x: 5.0, y: 1.0)]);
        assert_eq!(min_distance(&a, &crossing), 0.0);

        assert_eq!(min_distance(&a, &MultiLineString::new(vec![])), f64::INFINITY);
    }

    #[test]
    fn test_parallel_lines_are_fully_covered() {
        let a = multi(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let b = multi(line_string![(x: 0.0, y: 1.0), (x: 10.0, y: 1.0)]);

        let segments = find_nearby_segments(&a, &b, 2.0, 11);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].source, LineSource::First);
        assert_line_close(&segments[0].geometry, &a.0[0]);
        assert_eq!(segments[1].source, LineSource::Second);
        assert_line_close(&segments[1].geometry, &b.0[0]);
    }

    #[test]
    fn test_diverging_lines_are_cut_at_the_disc_edge() {
        let a = multi(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let b = multi(line_string![(x: 0.0, y: 1.0), (x: 4.0, y: 1.0), (x: 4.0, y: 10.0)]);

        let segments = find_nearby_segments(&a, &b, 2.0, 11);

        assert_eq!(segments.len(), 2);
        assert_line_close(&segments[0].geometry, &line_string![(x: 0.0, y: 0.0), (x: 7.0, y: 0.0)]);
        assert_line_close(
            &segments[1].geometry,
            &line_string![(x: 0.0, y: 1.0), (x: 4.0, y: 1.0), (x: 4.0, y: 3.0)],
        );
    }

    #[test]
    fn test_distant_lines_yield_nothing() {
        let a = multi(line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)]);
        let b = multi(line_string![(x: 0.0, y: 5.0), (x: 10.0, y: 5.0)]);

        assert!(find_nearby_segments(&a, &b, 2.0, 100).is_empty());
    }

    #[test]
    fn test_union_intervals() {
        let merged = union_intervals(vec![(4.0, 6.0), (0.0, 2.0), (1.0, 3.0), (6.0, 7.0)]);
        assert_eq!(merged, vec![(0.0, 3.0), (4.0, 7.0)]);
    }

    #[test]
    fn test_segment_disc_overlap() {
        let start = Coord { x: 0.0, y: 0.0 };
        let end = Coord { x: 10.0, y: 0.0 };

        assert_eq!(segment_disc_overlap(start, end, Coord { x: 5.0, y: 0.0 }, 1.0), Some((0.4, 0.6)));
        assert_eq!(segment_disc_overlap(start, end, Coord { x: 5.0, y: 3.0 }, 1.0), None);
        assert_eq!(segment_disc_overlap(start, end, Coord { x: 5.0, y: 1.0 }, 1.0), None);
    }

    fn line() -> impl Strategy<Value = LineString<f64>> {
        prop::collection::vec((0.0..50.0f64, 0.0..50.0f64), 2..8).prop_map(LineString::from)
    }

    fn distance_to(line: &LineString<f64>, point: Coord<f64>) -> f64 {
        SegmentIndex::from_line_string(line)
            .nearest(point)
            .map(|(_, nearest)| distance(point, nearest))
            .unwrap_or(f64::INFINITY)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_segments_stay_near_the_other_line(a in line(), b in line(), threshold in 0.5..5.0f64) {
            let segments = find_nearby_segments(&multi(a.clone()), &multi(b.clone()), threshold, 200);

            for segment in &segments {
                let (own, other) = match segment.source {
                    LineSource::First => (&a, &b),
                    LineSource::Second => (&b, &a),
                };
                for coord in &segment.geometry.0 {
                    prop_assert!(distance_to(own, *coord) < 1e-6);
                    prop_assert!(distance_to(other, *coord) < 2.0 * threshold + 1e-6);
                }
            }
        }

        #[test]
        fn prop_far_apart_lines_yield_nothing(a in line(), b in line(), threshold in 0.5..5.0f64) {
            let shifted = LineString::from(b.0.iter().map(|c| (c.x + 200.0, c.y)).collect::<Vec<_>>());
            prop_assert!(find_nearby_segments(&multi(a), &multi(shifted), threshold, 50).is_empty());
        }
    }
}
