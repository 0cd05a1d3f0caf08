use crate::batch::{display_name, process_files, scan_directory, BatchSummary, FileOutcome};
use crate::cli::RasterizeArgs;
use crate::commands::CommandContext;
use anyhow::{Context, Result};
use rivergeo_core::config::LayeredConfig;
use rivergeo_core::formats::xyz::{read_xyz, XyzReadOptions};
use rivergeo_geo::raster::rasterize_points;
use std::path::{Path, PathBuf};

pub fn execute(args: &RasterizeArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let extension = config.xyz_extension.value.as_str();
    let resolution = config.raster_resolution.value;
    let epsg = config.target_epsg.value;
    let options = XyzReadOptions {
        easting_prefix_len: config.easting_prefix_len.value,
        ..Default::default()
    };

    let files = scan_directory(&args.input, &[extension])?;
    ctx.ensure_dir(&args.output)?;

    Ok(process_files(ctx.output, &files, "Rasterizing", |path| {
        let output_path = output_path(path, &args.output);
        if output_path.exists() && !args.overwrite {
            return Ok(FileOutcome::skipped(format!(
                "Skipping, {} already exists",
                display_name(&output_path)
            )));
        }

        let read = read_xyz(path, &options)?;
        if read.points.is_empty() {
            ctx.output.warning(format!("{} has no valid points after cleaning", display_name(path)));
            return Ok(FileOutcome::skipped(format!(
                "no valid points ({} row(s) dropped)",
                read.dropped
            )));
        }

        let raster = rasterize_points(&read.points, resolution, Some(epsg))
            .with_context(|| format!("Failed to rasterize {}", display_name(path)))?;
        ctx.write_raster(&raster, &output_path)?;

        Ok(FileOutcome::written_with(
            vec![output_path],
            format!(
                "{} point(s), {} dropped, {} x {} cells at {}",
                read.points.len(),
                read.dropped,
                raster.cols(),
                raster.rows(),
                resolution
            ),
        ))
    }))
}

fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| display_name(input));
    output_dir.join(format!("{}_elevation_raster.tif", stem))
}
