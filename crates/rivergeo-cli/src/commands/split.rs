use crate::batch::{process_files, BatchSummary, FileOutcome};
use crate::cli::SplitArgs;
use crate::commands::CommandContext;
use anyhow::Result;
use rivergeo_core::config::LayeredConfig;
use rivergeo_geo::split::{part_file_name, split_layer};

pub fn execute(args: &SplitArgs, config: &LayeredConfig, ctx: &CommandContext) -> Result<BatchSummary> {
    let name_field = config.name_field.value.as_str();
    ctx.ensure_dir(&args.output)?;

    Ok(process_files(ctx.output, std::slice::from_ref(&args.input), "Splitting", |path| {
        let layer = ctx.read_layer(path)?;
        let plan = split_layer(&layer, name_field);

        for index in &plan.skipped {
            ctx.output.info(format!("Feature {} is not a MultiLineString, skipping", index));
        }
        if plan.parts.is_empty() {
            return Ok(FileOutcome::skipped("no multi-part line features"));
        }

        let mut outputs = Vec::with_capacity(plan.parts.len());
        for part in &plan.parts {
            let plain = args.output.join(part_file_name(&part.base_name, part.part_number, false));
            let output_path = if ctx.is_taken(&plain) {
                args.output.join(part_file_name(&part.base_name, part.part_number, true))
            } else {
                plain
            };

            ctx.write_layer(&part.layer, &output_path)?;
            outputs.push(output_path);
        }

        Ok(FileOutcome::written_with(
            outputs,
            format!("{} part(s), {} feature(s) skipped", plan.parts.len(), plan.skipped.len()),
        ))
    }))
}
