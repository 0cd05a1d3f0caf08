//! Command implementations

mod align;
mod config;
mod intersect;
mod merge;
mod mosaic;
mod proximity;
mod rasterize;
mod reproject;
mod run;
mod split;

use crate::batch::BatchSummary;
use crate::cli::{Cli, Commands};
use crate::config_loader::load_config;
use crate::dry_run::{display_planned_actions, ActionType, PlannedAction};
use crate::errors;
use crate::output::OutputWriter;
use anyhow::{Context, Result};
use geo::MultiLineString;
use rivergeo_core::config::LayeredConfig;
use rivergeo_core::formats::geotiff::write_geotiff;
use rivergeo_core::formats::prj;
use rivergeo_core::formats::FormatRegistry;
use rivergeo_core::models::{Layer, Raster};
use rivergeo_core::RiverGeoError;
use rivergeo_geo::lines::line_parts;
use rivergeo_geo::validation::ensure_valid;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Execute a CLI command
pub fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let base_config = load_config(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        return config::execute(&base_config, &output);
    }

    let ctx = CommandContext::new(&output, &base_config, cli.dry_run);
    if let Commands::Run(args) = &cli.command {
        return run::execute(args, &ctx);
    }

    let summary = dispatch(&cli.command, &ctx)?;
    ctx.report(&summary)?;
    ensure_success(cli.command.name(), &summary)
}

/// Run one file command with its flags applied over the base configuration
fn dispatch(command: &Commands, ctx: &CommandContext) -> Result<BatchSummary> {
    let mut config = ctx.base_config.clone();
    config.update_from_cli(command.config_overrides());

    match command {
        Commands::Align(args) => align::execute(args, &config, ctx),
        Commands::Intersect(args) => intersect::execute(args, &config, ctx),
        Commands::Reproject(args) => reproject::execute(args, &config, ctx),
        Commands::Mosaic(args) => mosaic::execute(args, &config, ctx),
        Commands::Merge(args) => merge::execute(args, &config, ctx),
        Commands::Proximity(args) => proximity::execute(args, &config, ctx),
        Commands::Rasterize(args) => rasterize::execute(args, &config, ctx),
        Commands::Split(args) => split::execute(args, &config, ctx),
        Commands::Run(_) | Commands::Config => {
            anyhow::bail!("'{}' cannot be used as a task", command.name())
        }
    }
}

fn ensure_success(command: &str, summary: &BatchSummary) -> Result<()> {
    if summary.all_succeeded() {
        Ok(())
    } else {
        Err(errors::batch_failed(command, summary.failure_count(), summary.total_files).into())
    }
}

fn has_shp_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("shp"))
}

/// Line parts of the feature at `index`, with the feature named in errors
fn feature_lines(layer: &Layer, index: usize) -> Result<MultiLineString<f64>> {
    let geometry = layer
        .geometry(index)
        .with_context(|| format!("Feature {} of {} has no geometry", index, layer.name))?;

    let parts = line_parts(geometry).map_err(|e| match e {
        RiverGeoError::InvalidGeometry { reason, .. } => RiverGeoError::InvalidGeometry {
            feature_id: format!("{}:{}", layer.name, index),
            reason,
        },
        other => other,
    })?;
    Ok(parts)
}

/// Shared state for file commands: output, base configuration, and the
/// writes performed or planned so far
pub struct CommandContext<'a> {
    pub output: &'a OutputWriter,
    pub base_config: &'a LayeredConfig,
    pub dry_run: bool,
    registry: FormatRegistry,
    planned: RefCell<Vec<PlannedAction>>,
    written: RefCell<HashSet<PathBuf>>,
}

impl<'a> CommandContext<'a> {
    pub fn new(output: &'a OutputWriter, base_config: &'a LayeredConfig, dry_run: bool) -> Self {
        Self {
            output,
            base_config,
            dry_run,
            registry: FormatRegistry::with_defaults(),
            planned: RefCell::new(Vec::new()),
            written: RefCell::new(HashSet::new()),
        }
    }

    /// Read a vector file with the registered formats
    pub fn read_layer(&self, path: &Path) -> Result<Layer> {
        self.registry
            .read(path)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Create an output directory (planned only in dry-run mode)
    pub fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if dir.is_dir() {
            return Ok(());
        }

        if self.dry_run {
            let mut planned = self.planned.borrow_mut();
            let description = format!("Create {}", dir.display());
            if !planned.iter().any(|a| a.description == description) {
                planned.push(PlannedAction::new(ActionType::CreateDirectory, description));
            }
            return Ok(());
        }

        fs::create_dir_all(dir).with_context(|| format!("Failed to create directory {}", dir.display()))
    }

    /// Validate and write a layer (planned only in dry-run mode)
    pub fn write_layer(&self, layer: &Layer, path: &Path) -> Result<()> {
        for (index, feature) in layer.features.iter().enumerate() {
            if let Some(geometry) = &feature.geometry {
                ensure_valid(geometry, index.to_string())
                    .with_context(|| format!("Refusing to write {}", path.display()))?;
            }
        }

        if let Some(crs) = layer.crs.as_ref().filter(|crs| prj::prj_content(crs).is_none()) {
            if has_shp_extension(path) {
                self.output
                    .warning(format!("No .prj definition for {}; {} will carry no CRS", crs, path.display()));
            }
        }

        if self.dry_run {
            let mut action = PlannedAction::new(self.write_action(path), format!("Write {}", path.display()))
                .with_detail(format!("{} feature(s)", layer.len()));
            if let Some(crs) = &layer.crs {
                action = action.with_detail(crs.to_string());
            }
            self.planned.borrow_mut().push(action);
        } else {
            self.registry
                .write(layer, path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        self.written.borrow_mut().insert(path.to_path_buf());
        Ok(())
    }

    /// Write a raster as GeoTIFF (planned only in dry-run mode)
    pub fn write_raster(&self, raster: &Raster, path: &Path) -> Result<()> {
        if self.dry_run {
            let mut action = PlannedAction::new(self.write_action(path), format!("Write {}", path.display()))
                .with_detail(format!("{} x {} cells", raster.cols(), raster.rows()));
            if let Some(epsg) = raster.epsg() {
                action = action.with_detail(format!("EPSG:{}", epsg));
            }
            self.planned.borrow_mut().push(action);
        } else {
            write_geotiff(raster, path).with_context(|| format!("Failed to write {}", path.display()))?;
        }

        self.written.borrow_mut().insert(path.to_path_buf());
        Ok(())
    }

    /// Whether `path` exists on disk or was written earlier in this run
    pub fn is_taken(&self, path: &Path) -> bool {
        path.exists() || self.written.borrow().contains(path)
    }

    /// Print a batch summary, or the planned actions in dry-run mode
    pub fn report(&self, summary: &BatchSummary) -> Result<()> {
        if self.dry_run {
            self.report_planned();
            Ok(())
        } else if self.output.is_json() {
            self.output.result(summary)
        } else {
            summary.display(self.output);
            Ok(())
        }
    }

    /// Print the actions planned so far
    pub fn report_planned(&self) {
        display_planned_actions(self.output, &self.planned.borrow());
    }

    fn write_action(&self, path: &Path) -> ActionType {
        if self.is_taken(path) {
            ActionType::ReplaceFile
        } else {
            ActionType::WriteFile
        }
    }
}
