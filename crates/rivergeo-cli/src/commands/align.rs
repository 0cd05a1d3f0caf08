use crate::batch::{companion_path, display_name, process_files, scan_directory, BatchSummary, FileOutcome};
use crate::cli::AlignArgs;
use crate::commands::CommandContext;
use anyhow::{Context, Result};
use rivergeo_core::config::LayeredConfig;
use rivergeo_geo::direction::{align_banklines, DirectionChange};
use std::path::Path;

pub fn execute(args: &AlignArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let centerlines = scan_directory(&args.centerlines, &["shp"])?;
    ctx.ensure_dir(&args.output)?;

    let from = config.centerline_suffix.value.as_str();
    let to = config.bankline_suffix.value.as_str();

    Ok(process_files(ctx.output, &centerlines, "Aligning", |centerline_path| {
        let Some(bankline_path) = companion_path(centerline_path, &args.banklines, from, to) else {
            return Ok(FileOutcome::skipped(format!("file name does not end with '{}'", from)));
        };
        if !bankline_path.exists() {
            ctx.output.warning(format!(
                "No corresponding bankline file found for {}",
                display_name(centerline_path)
            ));
            return Ok(FileOutcome::skipped(format!("no bankline file {}", bankline_path.display())));
        }

        align_file(centerline_path, &bankline_path, &args.output, ctx)
    }))
}

fn align_file(centerline_path: &Path, bankline_path: &Path, output_dir: &Path, ctx: &CommandContext) -> Result<FileOutcome> {
    let centerlines = ctx.read_layer(centerline_path)?;
    let banklines = ctx.read_layer(bankline_path)?;

    if banklines.len() < 2 {
        anyhow::bail!(
            "{} holds {} feature(s), expected at least two banklines",
            display_name(bankline_path),
            banklines.len()
        );
    }

    let centerline = centerlines
        .features
        .iter()
        .find_map(|f| f.geometry.as_ref())
        .with_context(|| format!("{} has no centerline geometry", display_name(centerline_path)))?;

    let (aligned, changes) = align_banklines(centerline, &banklines)
        .with_context(|| format!("Failed to align {}", display_name(bankline_path)))?;

    let file_name = bankline_path
        .file_name()
        .with_context(|| format!("Invalid bankline path {}", bankline_path.display()))?;
    let output_path = output_dir.join(file_name);
    ctx.write_layer(&aligned, &output_path)?;

    let reversed = changes.iter().filter(|c| **c == DirectionChange::Reversed).count();
    Ok(FileOutcome::written_with(
        vec![output_path],
        format!("{} of {} bankline(s) reversed", reversed, changes.len()),
    ))
}
