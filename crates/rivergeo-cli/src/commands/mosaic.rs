use crate::batch::{display_name, scan_directory, BatchSummary, FileProcessingResult};
use crate::cli::MosaicArgs;
use crate::commands::CommandContext;
use crate::progress::{create_spinner, finish_success};
use anyhow::{Context, Result};
use rivergeo_core::config::LayeredConfig;
use rivergeo_core::formats::geotiff::read_geotiff;
use rivergeo_geo::raster::mosaic;
use std::path::{Path, PathBuf};

/// Output file name used when no `--output` is given
const DEFAULT_OUTPUT: &str = "merged_output.tif";

/// Mosaic every GeoTIFF of a directory; any unreadable tile aborts the run
pub fn execute(args: &MosaicArgs, _config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.join(DEFAULT_OUTPUT));

    let tiles: Vec<PathBuf> = scan_directory(&args.input, &["tif", "tiff"])?
        .into_iter()
        .filter(|path| !same_file(path, &output_path))
        .collect();
    if tiles.is_empty() {
        anyhow::bail!("No GeoTIFF files found in {}", args.input.display());
    }

    let spinner = (!ctx.output.is_json()).then(|| create_spinner("Reading tiles..."));
    let mut rasters = Vec::with_capacity(tiles.len());
    for path in &tiles {
        if let Some(spinner) = &spinner {
            spinner.set_message(format!("Reading {}", display_name(path)));
        }
        rasters.push(read_geotiff(path).with_context(|| format!("Failed to read {}", path.display()))?);
    }

    if let Some(spinner) = &spinner {
        spinner.set_message(format!("Mosaicking {} tile(s)...", rasters.len()));
    }
    let merged = mosaic(&rasters)?;

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ctx.ensure_dir(parent)?;
    }
    ctx.write_raster(&merged, &output_path)?;

    let message = format!(
        "{} tile(s) into {} x {} cells",
        tiles.len(),
        merged.cols(),
        merged.rows()
    );
    if let Some(spinner) = &spinner {
        finish_success(spinner, &format!("Merged {}", message));
    }

    let mut summary = BatchSummary::new();
    summary.total_files = tiles.len();
    let mut result = FileProcessingResult::new(&args.input);
    result.outputs = vec![output_path];
    result.message = Some(message);
    summary.add_success(result);
    Ok(summary)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
