//! R-tree of line segments for nearest and within-distance queries

use geo::{Coord, Line, LineString};
use rstar::primitives::{GeomWithData, Line as IndexLine};
use rstar::{RTree, AABB};

/// Segment of a line string tagged with its segment number
pub type IndexedSegment = GeomWithData<IndexLine<[f64; 2]>, usize>;

/// R-tree over the segments of one line string
///
/// Segment numbers match `LineString::lines()` order, so segment `i` runs
/// from vertex `i` to vertex `i + 1`.
pub struct SegmentIndex {
    tree: RTree<IndexedSegment>,
}

impl SegmentIndex {
    /// Index every segment of the line
    pub fn from_line_string(line: &LineString<f64>) -> Self {
        let segments: Vec<IndexedSegment> = line
            .lines()
            .enumerate()
            .map(|(i, segment)| {
                GeomWithData::new(
                    IndexLine::new(to_point(segment.start), to_point(segment.end)),
                    i,
                )
            })
            .collect();

        Self { tree: RTree::bulk_load(segments) }
    }

    /// Nearest segment to a point, with the closest point on it
    pub fn nearest(&self, point: Coord<f64>) -> Option<(usize, Coord<f64>)> {
        let query = to_point(point);
        self.tree.nearest_neighbor(&query).map(|segment| {
            let closest = segment.geom().nearest_point(&query);
            (segment.data, Coord { x: closest[0], y: closest[1] })
        })
    }

    /// Segments with any point within `radius` of `point`
    pub fn within_distance(&self, point: Coord<f64>, radius: f64) -> impl Iterator<Item = usize> + '_ {
        self.tree
            .locate_within_distance(to_point(point), radius * radius)
            .map(|segment| segment.data)
    }

    /// Segments whose bounding box intersects the bounding box of `line`
    pub fn envelope_candidates(&self, line: &Line<f64>) -> impl Iterator<Item = usize> + '_ {
        let envelope = AABB::from_corners(to_point(line.start), to_point(line.end));
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|segment| segment.data)
    }

    /// Get the number of indexed segments
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

fn to_point(coord: Coord<f64>) -> [f64; 2] {
    [coord.x, coord.y]
}
