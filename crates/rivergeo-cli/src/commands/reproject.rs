use crate::batch::{display_name, process_files, scan_directory, BatchSummary, FileOutcome};
use crate::cli::ReprojectArgs;
use crate::commands::CommandContext;
use anyhow::{Context, Result};
use rivergeo_core::config::LayeredConfig;
use rivergeo_core::models::Crs;
use rivergeo_geo::transform::reproject_layer;

/// Prefix of reprojected output files
const OUTPUT_PREFIX: &str = "reprojected_";

pub fn execute(args: &ReprojectArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let files = scan_directory(&args.input, &["shp"])?;
    let output_dir = args.output.as_deref().unwrap_or(&args.input);
    ctx.ensure_dir(output_dir)?;

    let target_epsg = config.target_epsg.value;
    let target = Crs::from_epsg(target_epsg);

    Ok(process_files(ctx.output, &files, "Reprojecting", |path| {
        let layer = ctx.read_layer(path)?;
        let name = display_name(path);

        let Some(crs) = &layer.crs else {
            ctx.output.info(format!("Shapefile: {} | CRS: Not defined", name));
            return Ok(FileOutcome::skipped("CRS not defined"));
        };

        let current = crs
            .epsg
            .map(|code| code.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        ctx.output.info(format!("Shapefile: {} | Current EPSG: {}", name, current));

        if crs.epsg == Some(target_epsg) {
            return Ok(FileOutcome::skipped(format!("already in EPSG:{}", target_epsg)));
        }

        let reprojected = reproject_layer(&layer, &target).with_context(|| format!("Failed to reproject {}", name))?;
        let output_path = output_dir.join(format!("{}{}", OUTPUT_PREFIX, name));
        ctx.write_layer(&reprojected, &output_path)?;

        Ok(FileOutcome::written_with(
            vec![output_path],
            format!("EPSG:{} -> EPSG:{}", current, target_epsg),
        ))
    }))
}
