use crate::batch::{display_name, process_files, scan_directory, BatchSummary, FileOutcome};
use crate::cli::ProximityArgs;
use crate::commands::{feature_lines, CommandContext};
use anyhow::Result;
use rivergeo_core::config::LayeredConfig;
use rivergeo_core::models::{AttributeValue, Feature, FieldDef, Layer};
use rivergeo_core::RiverGeoError;
use rivergeo_geo::proximity::{find_nearby_segments, min_distance, NearbySegment};
use std::path::Path;

/// Attribute naming the input line a segment was cut from (1 or 2)
const SOURCE_FIELD: &str = "SOURCE";

pub fn execute(args: &ProximityArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let threshold = config.proximity_threshold.value;
    let samples = config.sample_count.value;
    anyhow::ensure!(
        threshold.is_finite() && threshold > 0.0,
        "proximity threshold must be a positive number, got {}",
        threshold
    );

    let files = scan_directory(&args.input, &["shp"])?;
    ctx.ensure_dir(&args.output)?;

    Ok(process_files(ctx.output, &files, "Scanning", |path| {
        let layer = ctx.read_layer(path)?;
        if layer.len() != 2 {
            return Err(RiverGeoError::FeatureCount {
                path: path.to_path_buf(),
                expected: 2,
                found: layer.len(),
            }
            .into());
        }

        let line1 = feature_lines(&layer, 0)?;
        let line2 = feature_lines(&layer, 1)?;

        let distance = min_distance(&line1, &line2);
        if distance >= threshold {
            return Ok(FileOutcome::skipped(format!(
                "minimum distance {:.3} is not below the threshold {}",
                distance, threshold
            )));
        }

        let segments = find_nearby_segments(&line1, &line2, threshold, samples);
        if segments.is_empty() {
            return Ok(FileOutcome::skipped(format!(
                "no sample of {} came within {} of the second line",
                samples, threshold
            )));
        }

        let output_path = output_path(path, &args.output);
        let count = segments.len();
        ctx.write_layer(&segment_layer(&layer, segments), &output_path)?;

        Ok(FileOutcome::written_with(
            vec![output_path],
            format!("{} segment(s), minimum distance {:.3}", count, distance),
        ))
    }))
}

fn output_path(input: &Path, output_dir: &Path) -> std::path::PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_name(input));
    output_dir.join(format!("{}_segments.shp", stem))
}

/// Segments as a line layer in the input CRS, tagged with their source line
fn segment_layer(input: &Layer, segments: Vec<NearbySegment>) -> Layer {
    let features = segments
        .into_iter()
        .map(|segment| {
            Feature::new(segment.geometry)
                .with_attribute(SOURCE_FIELD, AttributeValue::Integer(segment.source.code()))
        })
        .collect();

    Layer::new(format!("{}_segments", input.name), input.crs.clone())
        .with_fields(vec![FieldDef::integer(SOURCE_FIELD)])
        .with_features(features)
}
