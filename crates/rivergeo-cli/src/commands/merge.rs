use crate::batch::{display_name, scan_directory, BatchSummary, FileProcessingResult};
use crate::cli::MergeArgs;
use crate::commands::CommandContext;
use anyhow::Result;
use rivergeo_core::config::LayeredConfig;
use rivergeo_geo::merge::merge_layers;

/// Merge every shapefile of a directory; any failing file aborts the run
pub fn execute(args: &MergeArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let files = scan_directory(&args.input, &["shp"])?;
    if files.is_empty() {
        anyhow::bail!("No shapefiles found in {}", args.input.display());
    }

    let fields = &config.merge_fields.value;
    ctx.output.info(format!("Merging {} file(s) keeping {}", files.len(), fields.join(", ")));

    let layers = files
        .iter()
        .map(|path| ctx.read_layer(path))
        .collect::<Result<Vec<_>>>()?;

    let mut merged = merge_layers(&layers, fields)?;
    if let Some(stem) = args.output.file_stem() {
        merged.name = stem.to_string_lossy().into_owned();
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        ctx.ensure_dir(parent)?;
    }
    ctx.write_layer(&merged, &args.output)?;

    let mut summary = BatchSummary::new();
    summary.total_files = files.len();
    let mut result = FileProcessingResult::new(&args.input);
    result.outputs = vec![args.output.clone()];
    result.message = Some(format!(
        "{} feature(s) from {} file(s) into {}",
        merged.len(),
        files.len(),
        display_name(&args.output)
    ));
    summary.add_success(result);
    Ok(summary)
}
