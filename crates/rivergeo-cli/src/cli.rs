use clap::{ArgAction, Parser, Subcommand};
use rivergeo_core::config::{parse_field_list, parse_positive_f64, CliConfigOverrides};
use std::path::PathBuf;

/// rivergeo - batch tools for river geometry and elevation data
#[derive(Parser, Debug)]
#[command(name = "rivergeo")]
#[command(about = "Batch tools for river geometry and elevation data", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Show planned output files without writing them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Configuration file (defaults to ./rivergeo.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Reverse banklines drawn against their centerline's direction
    Align(AlignArgs),

    /// Find where centerlines cross their two banklines
    Intersect(IntersectArgs),

    /// Report each shapefile's CRS and reproject those not in the target
    Reproject(ReprojectArgs),

    /// Merge GeoTIFF tiles into one raster
    Mosaic(MosaicArgs),

    /// Concatenate vector files keeping selected attribute columns
    Merge(MergeArgs),

    /// Extract the segments where two lines come closer than a threshold
    Proximity(ProximityArgs),

    /// Grid XYZ point text files into GeoTIFF elevation rasters
    Rasterize(RasterizeArgs),

    /// Write one file per part of every multi-line feature
    Split(SplitArgs),

    /// Run the tasks declared in a manifest
    Run(RunArgs),

    /// Show the effective configuration and where each value comes from
    Config,
}

#[derive(Parser, Debug, Clone)]
pub struct AlignArgs {
    /// Directory of centerline shapefiles
    #[arg(long)]
    pub centerlines: PathBuf,

    /// Directory of bankline shapefiles
    #[arg(long)]
    pub banklines: PathBuf,

    /// Directory for the aligned banklines
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct IntersectArgs {
    /// Directory of bankline shapefiles
    #[arg(long)]
    pub banklines: PathBuf,

    /// Directory of centerline shapefiles
    #[arg(long)]
    pub centerlines: PathBuf,

    /// Directory for the intersection point files
    #[arg(long)]
    pub output: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct ReprojectArgs {
    /// Directory of shapefiles to check
    #[arg(long)]
    pub input: PathBuf,

    /// Target EPSG code (defaults to target_epsg from the configuration)
    #[arg(long)]
    pub epsg: Option<u32>,

    /// Directory for reprojected files (defaults to the input directory)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct MosaicArgs {
    /// Directory of GeoTIFF tiles
    #[arg(long)]
    pub input: PathBuf,

    /// Output raster (defaults to <input>/merged_output.tif)
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Parser, Debug, Clone)]
pub struct MergeArgs {
    /// Directory of shapefiles to merge
    #[arg(long)]
    pub input: PathBuf,

    /// Output vector file (.shp or .geojson)
    #[arg(long)]
    pub output: PathBuf,

    /// Comma-separated attribute columns to keep
    #[arg(long, value_name = "A,B")]
    pub fields: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ProximityArgs {
    /// Directory of shapefiles holding two lines each
    #[arg(long)]
    pub input: PathBuf,

    /// Directory for the segment files
    #[arg(long)]
    pub output: PathBuf,

    /// Distance below which lines count as close
    #[arg(long, value_parser = positive_f64)]
    pub threshold: Option<f64>,

    /// Samples taken along each part of the first line
    #[arg(long)]
    pub samples: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
pub struct RasterizeArgs {
    /// Directory of XYZ text files
    #[arg(long)]
    pub input: PathBuf,

    /// Directory for the elevation rasters
    #[arg(long)]
    pub output: PathBuf,

    /// EPSG code tagged on the rasters
    #[arg(long)]
    pub epsg: Option<u32>,

    /// Cell size in map units
    #[arg(long, value_parser = positive_f64)]
    pub resolution: Option<f64>,

    /// Extension of the XYZ files (without dot)
    #[arg(long)]
    pub extension: Option<String>,

    /// Replace rasters that already exist
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SplitArgs {
    /// Vector file with multi-part line features
    #[arg(long)]
    pub input: PathBuf,

    /// Directory for the part files
    #[arg(long)]
    pub output: PathBuf,

    /// Attribute used to name the part files
    #[arg(long)]
    pub name_field: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Manifest file with [[task]] entries
    pub manifest: PathBuf,
}

impl Commands {
    /// Name of the subcommand as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Align(_) => "align",
            Commands::Intersect(_) => "intersect",
            Commands::Reproject(_) => "reproject",
            Commands::Mosaic(_) => "mosaic",
            Commands::Merge(_) => "merge",
            Commands::Proximity(_) => "proximity",
            Commands::Rasterize(_) => "rasterize",
            Commands::Split(_) => "split",
            Commands::Run(_) => "run",
            Commands::Config => "config",
        }
    }

    /// Configuration values given as flags of this command
    pub fn config_overrides(&self) -> CliConfigOverrides {
        match self {
            Commands::Reproject(args) => CliConfigOverrides {
                target_epsg: args.epsg,
                ..Default::default()
            },
            Commands::Merge(args) => CliConfigOverrides {
                merge_fields: args
                    .fields
                    .as_deref()
                    .map(parse_field_list)
                    .filter(|fields| !fields.is_empty()),
                ..Default::default()
            },
            Commands::Proximity(args) => CliConfigOverrides {
                proximity_threshold: args.threshold,
                sample_count: args.samples,
                ..Default::default()
            },
            Commands::Rasterize(args) => CliConfigOverrides {
                target_epsg: args.epsg,
                raster_resolution: args.resolution,
                xyz_extension: args.extension.clone(),
                ..Default::default()
            },
            Commands::Split(args) => CliConfigOverrides {
                name_field: args.name_field.clone(),
                ..Default::default()
            },
            _ => CliConfigOverrides::default(),
        }
    }
}

fn positive_f64(s: &str) -> Result<f64, String> {
    parse_positive_f64("value", s).map_err(|e| e.to_string())
}
