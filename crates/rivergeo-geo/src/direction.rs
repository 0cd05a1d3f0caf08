//! Bankline direction alignment
//!
//! A bankline is considered to run with the centerline when the dot product
//! of their endpoint-to-endpoint direction vectors is strictly positive.
//! Banklines running the other way get their vertex order reversed.

use geo::LineString;
use rivergeo_core::models::{geometry_kind, Geometry, Layer};
use rivergeo_core::{Result, RiverGeoError};
use serde::Serialize;

/// What alignment did to a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionChange {
    Kept,
    Reversed,
}

/// Normalized vector from the first to the last vertex
///
/// Returns `(0, 0)` for an empty line or coinciding endpoints.
pub fn direction_vector(line: &LineString<f64>) -> (f64, f64) {
    let (Some(first), Some(last)) = (line.0.first(), line.0.last()) else {
        return (0.0, 0.0);
    };

    let (dx, dy) = (last.x - first.x, last.y - first.y);
    let norm = dx.hypot(dy);
    if norm == 0.0 || !norm.is_finite() {
        return (0.0, 0.0);
    }
    (dx / norm, dy / norm)
}

/// Check if `line` runs in the same general direction as `reference`
pub fn is_same_direction(reference: &LineString<f64>, line: &LineString<f64>) -> bool {
    let (rx, ry) = direction_vector(reference);
    let (lx, ly) = direction_vector(line);
    rx * lx + ry * ly > 0.0
}

/// Merge a (multi)line geometry into one line string
///
/// MultiLineString parts are concatenated in order without joining segments.
pub fn merge_to_linestring(geometry: &Geometry) -> Result<LineString<f64>> {
    match geometry {
        Geometry::LineString(line) => Ok(line.clone()),
        Geometry::MultiLineString(lines) => Ok(LineString::new(
            lines.0.iter().flat_map(|part| part.0.iter().copied()).collect(),
        )),
        other => Err(RiverGeoError::InvalidGeometry {
            feature_id: "unknown".to_string(),
            reason: format!("cannot merge {} into a LineString", geometry_kind(other)),
        }),
    }
}

/// Orient `line` to run with `reference`
pub fn align_direction(reference: &LineString<f64>, line: &LineString<f64>) -> (LineString<f64>, DirectionChange) {
    if is_same_direction(reference, line) {
        (line.clone(), DirectionChange::Kept)
    } else {
        let mut reversed = line.clone();
        reversed.0.reverse();
        (reversed, DirectionChange::Reversed)
    }
}

/// Align every bankline in the layer to the centerline
///
/// Bankline geometries are replaced by their merged, oriented line string;
/// attributes, schema and CRS are kept. Features without geometry pass
/// through unchanged. The returned changes are in feature order.
pub fn align_banklines(centerline: &Geometry, banklines: &Layer) -> Result<(Layer, Vec<DirectionChange>)> {
    let reference = merge_to_linestring(centerline)?;
    let mut aligned = banklines.clone();
    let mut changes = Vec::with_capacity(banklines.len());

    for (index, feature) in aligned.features.iter_mut().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };

        let line = merge_to_linestring(geometry).map_err(|e| match e {
            RiverGeoError::InvalidGeometry { reason, .. } => RiverGeoError::InvalidGeometry {
                feature_id: index.to_string(),
                reason,
            },
            other => other,
        })?;

        let (oriented, change) = align_direction(&reference, &line);
        tracing::debug!("Bankline {} in {}: {:?}", index, banklines.name, change);

        feature.geometry = Some(Geometry::LineString(oriented));
        changes.push(change);
    }

    Ok((aligned, changes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, MultiLineString};
    use proptest::prelude::*;
    use rivergeo_core::models::{AttributeValue, Feature};

    #[test]
    fn test_direction_vector_is_normalized() {
        let line = line_string![(x: 0.0, y: 0.0), (x: 5.0, y: 9.0), (x: 3.0, y: 4.0)];
        let (x, y) = direction_vector(&line);
        assert!((x - 0.6).abs() < 1e-12);
        assert!((y - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_closed_line_has_zero_direction() {
        let ring = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        assert_eq!(direction_vector(&ring), (0.0, 0.0));
        assert_eq!(direction_vector(&LineString::new(vec![])), (0.0, 0.0));
    }

    #[test]
    fn test_opposite_line_is_reversed() {
        let centerline = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let bank = line_string![(x: 10.0, y: 2.0), (x: 5.0, y: 2.5), (x: 0.0, y: 2.0)];

        let (aligned, change) = align_direction(&centerline, &bank);
        assert_eq!(change, DirectionChange::Reversed);
        assert_eq!(aligned.0.first(), bank.0.last());
        assert!(is_same_direction(&centerline, &aligned));
    }

    #[test]
    fn test_perpendicular_or_degenerate_line_is_reversed() {
        let centerline = line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)];
        let across = line_string![(x: 5.0, y: -1.0), (x: 5.0, y: 1.0)];
        assert_eq!(align_direction(&centerline, &across).1, DirectionChange::Reversed);

        let point_like = line_string![(x: 1.0, y: 1.0), (x: 1.0, y: 1.0)];
        assert_eq!(align_direction(&centerline, &point_like).1, DirectionChange::Reversed);
    }

    #[test]
    fn test_merge_concatenates_parts() {
        let multi = MultiLineString::new(vec![
            line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)],
            line_string![(x: 2.0, y: 0.0), (x: 3.0, y: 0.0)],
        ]);
        let merged = merge_to_linestring(&multi.into()).unwrap();
        assert_eq!(merged.0.len(), 4);

        assert!(merge_to_linestring(&point!(x: 0.0, y: 0.0).into()).is_err());
    }

    #[test]
    fn test_align_banklines_keeps_attributes() {
        let centerline: Geometry = line_string![(x: 0.0, y: 0.0), (x: 100.0, y: 0.0)].into();
        let layer = Layer::new("banks", None).with_features(vec![
            Feature::new(line_string![(x: 0.0, y: 5.0), (x: 100.0, y: 5.0)])
                .with_attribute("SIDE", AttributeValue::Text("left".into())),
            Feature::new(line_string![(x: 100.0, y: -5.0), (x: 0.0, y: -5.0)])
                .with_attribute("SIDE", AttributeValue::Text("right".into())),
        ]);

        let (aligned, changes) = align_banklines(&centerline, &layer).unwrap();

        assert_eq!(changes, vec![DirectionChange::Kept, DirectionChange::Reversed]);
        assert_eq!(aligned.features[1].attribute("SIDE"), Some(&AttributeValue::Text("right".into())));
        match aligned.geometry(1) {
            Some(Geometry::LineString(line)) => assert_eq!(line.0[0].x, 0.0),
            other => panic!("unexpected geometry: {:?}", other),
        }
    }

    #[test]
    fn test_align_banklines_rejects_polygon_bank() {
        let centerline: Geometry = line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)].into();
        let polygon = geo::polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0)];
        let layer = Layer::new("banks", None).with_features(vec![Feature::new(polygon)]);

        let err = align_banklines(&centerline, &layer).unwrap_err();
        assert!(matches!(err, RiverGeoError::InvalidGeometry { ref feature_id, .. } if feature_id == "0"));
    }

    fn coords() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((-1000.0..1000.0f64, -1000.0..1000.0f64), 2..20)
    }

    proptest! {
        #[test]
        fn prop_alignment_only_reorders_vertices(reference in coords(), bank in coords()) {
            let reference = LineString::from(reference);
            let bank = LineString::from(bank);

            let (aligned, change) = align_direction(&reference, &bank);

            let mut expected = bank.0.clone();
            if change == DirectionChange::Reversed {
                expected.reverse();
            }
            prop_assert_eq!(aligned.0, expected);
        }

        #[test]
        fn prop_aligned_line_runs_with_reference(reference in coords(), bank in coords()) {
            let reference = LineString::from(reference);
            let bank = LineString::from(bank);
            let (rx, ry) = direction_vector(&reference);
            let (bx, by) = direction_vector(&bank);
            prop_assume!(rx.abs() + ry.abs() > 0.0 && (rx * bx + ry * by).abs() > 1e-9);

            let (aligned, _) = align_direction(&reference, &bank);
            prop_assert!(is_same_direction(&reference, &aligned));
        }
    }
}
