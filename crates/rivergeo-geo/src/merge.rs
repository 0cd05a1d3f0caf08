//! Concatenating layers with a selected attribute subset

use rivergeo_core::models::{AttributeValue, Attributes, Feature, FieldDef, Layer};
use rivergeo_core::{Result, RiverGeoError};

use crate::transform::check_crs_mismatch;

/// Merge layers into one, keeping only the listed attribute columns
///
/// Each field's definition is taken from the first layer declaring it. Every
/// layer must declare every listed field. The result carries the first
/// layer's CRS; layers with a different CRS are rejected.
pub fn merge_layers(layers: &[Layer], fields: &[String]) -> Result<Layer> {
    let first = layers.first().ok_or_else(|| RiverGeoError::EmptyInput {
        reason: "no layers to merge".to_string(),
    })?;

    for layer in layers {
        for field in fields {
            if !layer.has_field(field) {
                return Err(RiverGeoError::MissingField {
                    dataset: layer.name.clone(),
                    field: field.clone(),
                });
            }
        }

        match (&first.crs, &layer.crs) {
            (Some(expected), Some(crs)) => check_crs_mismatch(crs, expected)?,
            (None, None) => {}
            _ => tracing::warn!("{} has a CRS only on one side of the merge with {}", layer.name, first.name),
        }
    }

    let schema: Vec<FieldDef> = fields
        .iter()
        .filter_map(|name| layers.iter().find_map(|layer| layer.field(name)).cloned())
        .collect();

    let mut merged = Layer::new("merged", first.crs.clone()).with_fields(schema);
    for layer in layers {
        for feature in &layer.features {
            let attributes: Attributes = fields
                .iter()
                .map(|name| {
                    let value = feature.attribute(name).cloned().unwrap_or(AttributeValue::Null);
                    (name.clone(), value)
                })
                .collect();
            merged.push(Feature { geometry: feature.geometry.clone(), attributes });
        }
        tracing::debug!("Merged {} feature(s) from {}", layer.len(), layer.name);
    }

    Ok(merged)
}
