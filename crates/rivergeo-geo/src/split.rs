//! Splitting multi-part line features into one layer per part

use geo::LineString;
use rivergeo_core::models::{Feature, Geometry, Layer};

/// One part of a multi-part feature, ready to be written on its own
#[derive(Debug, Clone)]
pub struct SplitPart {
    /// Index of the source feature (0-based)
    pub feature_index: usize,
    /// File-safe base name derived from the name field
    pub base_name: String,
    /// Part number within the feature (1-based)
    pub part_number: usize,
    /// Single-feature layer holding the part and all source attributes
    pub layer: Layer,
}

/// Parts produced from a layer plus the indexes of skipped features
#[derive(Debug, Clone, Default)]
pub struct SplitPlan {
    pub parts: Vec<SplitPart>,
    pub skipped: Vec<usize>,
}

/// The parts of a MultiLineString; `None` for any other geometry
pub fn split_parts(geometry: &Geometry) -> Option<Vec<LineString<f64>>> {
    match geometry {
        Geometry::MultiLineString(lines) => Some(lines.0.clone()),
        _ => None,
    }
}

/// Output file name for a part
///
/// `<base>_line_<n>.shp`, or `<base>_line_<n>_bank.shp` when the plain name
/// is already taken.
pub fn part_file_name(base: &str, part_number: usize, taken: bool) -> String {
    if taken {
        format!("{}_line_{}_bank.shp", base, part_number)
    } else {
        format!("{}_line_{}.shp", base, part_number)
    }
}

/// Replace path separators, reserved and control characters with `_`
pub fn sanitize_base_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Base name for a feature: its name attribute, else `feature_<index>`
pub fn feature_base_name(feature: &Feature, index: usize, name_field: &str) -> String {
    feature
        .attribute(name_field)
        .filter(|value| !value.is_null())
        .map(|value| sanitize_base_name(&value.to_string()))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("feature_{}", index))
}

/// Split every MultiLineString feature of a layer into single-part layers
pub fn split_layer(layer: &Layer, name_field: &str) -> SplitPlan {
    let mut plan = SplitPlan::default();

    for (index, feature) in layer.features.iter().enumerate() {
        let Some(parts) = feature.geometry.as_ref().and_then(split_parts) else {
            tracing::debug!("Feature {} of {} is not a MultiLineString", index, layer.name);
            plan.skipped.push(index);
            continue;
        };

        let base_name = feature_base_name(feature, index, name_field);
        for (i, part) in parts.into_iter().enumerate() {
            let part_feature = Feature {
                geometry: Some(Geometry::LineString(part)),
                attributes: feature.attributes.clone(),
            };
            let part_layer = Layer::new(format!("{}_line_{}", base_name, i + 1), layer.crs.clone())
                .with_fields(layer.fields.clone())
                .with_features(vec![part_feature]);

            plan.parts.push(SplitPart {
                feature_index: index,
                base_name: base_name.clone(),
                part_number: i + 1,
                layer: part_layer,
            });
        }
    }

    plan
}
