use crate::batch::{companion_path, display_name, process_files, scan_directory, BatchSummary, FileOutcome};
use crate::cli::IntersectArgs;
use crate::commands::{feature_lines, CommandContext};
use anyhow::{Context, Result};
use rivergeo_core::config::LayeredConfig;
use rivergeo_core::models::{Feature, Layer};
use rivergeo_geo::intersection::centerline_bank_intersections;
use rivergeo_geo::transform::check_crs_mismatch;
use std::path::Path;

pub fn execute(args: &IntersectArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let banklines = scan_directory(&args.banklines, &["shp"])?;
    ctx.ensure_dir(&args.output)?;

    let from = config.bankline_suffix.value.as_str();
    let to = config.centerline_suffix.value.as_str();

    Ok(process_files(ctx.output, &banklines, "Intersecting", |bankline_path| {
        let Some(centerline_path) = companion_path(bankline_path, &args.centerlines, from, to) else {
            return Ok(FileOutcome::skipped(format!("file name does not end with '{}'", from)));
        };
        if !centerline_path.exists() {
            ctx.output.warning(format!(
                "No corresponding centerline file found for {}",
                display_name(bankline_path)
            ));
            return Ok(FileOutcome::skipped(format!("no centerline file {}", centerline_path.display())));
        }

        intersect_file(bankline_path, &centerline_path, &args.output, ctx)
    }))
}

fn intersect_file(bankline_path: &Path, centerline_path: &Path, output_dir: &Path, ctx: &CommandContext) -> Result<FileOutcome> {
    let banks = ctx.read_layer(bankline_path)?;
    if banks.len() != 2 {
        return Ok(FileOutcome::skipped(format!(
            "{} must contain exactly two bank lines, found {}",
            display_name(bankline_path),
            banks.len()
        )));
    }

    let centerlines = ctx.read_layer(centerline_path)?;
    if centerlines.len() != 1 {
        return Ok(FileOutcome::skipped(format!(
            "{} must contain exactly one centerline, found {}",
            display_name(centerline_path),
            centerlines.len()
        )));
    }

    if let (Some(bank_crs), Some(centerline_crs)) = (&banks.crs, &centerlines.crs) {
        check_crs_mismatch(bank_crs, centerline_crs)
            .with_context(|| format!("{} and {}", display_name(bankline_path), display_name(centerline_path)))?;
    }

    let centerline = feature_lines(&centerlines, 0)?;
    let bank1 = feature_lines(&banks, 0)?;
    let bank2 = feature_lines(&banks, 1)?;

    let points = centerline_bank_intersections(&centerline, &bank1, &bank2);
    if points.is_empty() {
        return Ok(FileOutcome::skipped(format!(
            "No intersections found between {} and {}",
            display_name(centerline_path),
            display_name(bankline_path)
        )));
    }

    let count = points.len();
    let layer = Layer::new(centerlines.name.clone(), centerlines.crs.clone())
        .with_features(points.into_iter().map(Feature::new).collect());

    let file_name = centerline_path
        .file_name()
        .with_context(|| format!("Invalid centerline path {}", centerline_path.display()))?;
    let output_path = output_dir.join(file_name);
    ctx.write_layer(&layer, &output_path)?;

    Ok(FileOutcome::written_with(vec![output_path], format!("{} intersection point(s)", count)))
}
