use crate::batch::BatchSummary;
use crate::cli::{
    AlignArgs, Commands, IntersectArgs, MergeArgs, MosaicArgs, ProximityArgs, RasterizeArgs, ReprojectArgs, RunArgs,
    SplitArgs,
};
use crate::commands::{dispatch, CommandContext};
use crate::errors;
use crate::output_types::TaskReport;
use anyhow::{Context, Result};
use rivergeo_core::manifest::{Manifest, TaskSpec};

/// Run manifest tasks in order; a failing task does not stop the next one
pub fn execute(args: &RunArgs, ctx: &CommandContext) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("Failed to load manifest {}", args.manifest.display()))?;
    if manifest.tasks.is_empty() {
        ctx.output.warning(format!("{} declares no tasks", args.manifest.display()));
    }

    let total = manifest.tasks.len();
    let mut reports: Vec<TaskReport<BatchSummary>> = Vec::with_capacity(total);

    for (index, task) in manifest.tasks.into_iter().enumerate() {
        let kind = task.kind().to_string();
        if !ctx.output.is_json() {
            ctx.output.section(format!("Task {}/{}: {}", index + 1, total, kind));
        }
        tracing::info!("Running task {} ({})", index + 1, kind);

        let report = match dispatch(&task_command(task), ctx) {
            Ok(summary) => TaskReport {
                index: index + 1,
                kind,
                succeeded: summary.all_succeeded(),
                summary: Some(summary),
                error: None,
            },
            Err(error) => TaskReport {
                index: index + 1,
                kind,
                succeeded: false,
                summary: None,
                error: Some(format!("{:#}", error)),
            },
        };

        if !ctx.output.is_json() && !ctx.dry_run {
            match (&report.summary, &report.error) {
                (Some(summary), _) => summary.display(ctx.output),
                (None, Some(error)) => ctx.output.error(error),
                (None, None) => {}
            }
        }
        reports.push(report);
    }

    if ctx.dry_run {
        ctx.report_planned();
    } else if ctx.output.is_json() {
        ctx.output.result(&reports)?;
    }

    let failed = reports.iter().filter(|r| !r.succeeded).count();
    if failed > 0 {
        return Err(errors::tasks_failed(failed, total).into());
    }

    if !ctx.output.is_json() && !ctx.dry_run {
        ctx.output.success(format!("{} task(s) completed", total));
    }
    Ok(())
}

/// The command a manifest task stands for
fn task_command(task: TaskSpec) -> Commands {
    match task {
        TaskSpec::Align { centerlines, banklines, output } => Commands::Align(AlignArgs {
            centerlines,
            banklines,
            output,
        }),
        TaskSpec::Intersect { banklines, centerlines, output } => Commands::Intersect(IntersectArgs {
            banklines,
            centerlines,
            output,
        }),
        TaskSpec::Reproject { input, epsg, output } => Commands::Reproject(ReprojectArgs { input, epsg, output }),
        TaskSpec::Mosaic { input, output } => Commands::Mosaic(MosaicArgs { input, output }),
        TaskSpec::Merge { input, output, fields } => Commands::Merge(MergeArgs {
            input,
            output,
            fields: fields.map(|fields| fields.join(",")),
        }),
        TaskSpec::Proximity { input, output, threshold, samples } => Commands::Proximity(ProximityArgs {
            input,
            output,
            threshold,
            samples,
        }),
        TaskSpec::Rasterize { input, output, epsg, resolution, overwrite } => Commands::Rasterize(RasterizeArgs {
            input,
            output,
            epsg,
            resolution,
            extension: None,
            overwrite,
        }),
        TaskSpec::Split { input, output } => Commands::Split(SplitArgs {
            input,
            output,
            name_field: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_task_overrides_reach_the_configuration() {
        let manifest = Manifest::parse(
            r#"
[[task]]
kind = "proximity"
input = "banks"
output = "out"
threshold = 5.0

[[task]]
kind = "merge"
input = "shp"
output = "merged.shp"
fields = ["NAME", "CODE"]
"#,
        )
        .unwrap();

        let commands: Vec<Commands> = manifest.tasks.into_iter().map(task_command).collect();

        match &commands[0] {
            Commands::Proximity(args) => assert_eq!(args.input, PathBuf::from("banks")),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(commands[0].config_overrides().proximity_threshold, Some(5.0));
        assert_eq!(
            commands[1].config_overrides().merge_fields,
            Some(vec!["NAME".to_string(), "CODE".to_string()])
        );
    }
}
