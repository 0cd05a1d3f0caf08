use console::style;
use rivergeo_core::RiverGeoError;
use std::fmt;
use std::path::Path;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for an input directory that does not exist
pub fn directory_not_found(path: &Path) -> CliError {
    CliError::new("Input directory not found")
        .with_context(format!("The directory to scan does not exist.\n\nPath: {}", path.display()))
        .with_suggestion("Check the path and try again")
        .with_suggestion("Relative paths are resolved against the current directory (or the manifest's directory for `run`)")
}

/// Create error for a `--config` file that does not exist
pub fn config_not_found(path: &Path) -> CliError {
    CliError::new("Configuration file not found")
        .with_context(format!("Path: {}", path.display()))
        .with_suggestion("Check the --config path")
        .with_suggestion("Or drop --config to use ./rivergeo.toml and the built-in defaults")
        .with_help("Run: rivergeo config")
}

/// Create error for a batch with failed files
pub fn batch_failed(command: &str, failed: usize, total: usize) -> CliError {
    CliError::new(format!("{} of {} file(s) failed", failed, total))
        .with_context("The failures are listed in the summary above; the other files were processed.")
        .with_suggestion("Fix the listed files and run the command again")
        .with_suggestion("Use -v or RUST_LOG=debug for per-file details")
        .with_help(format!("Run: rivergeo {} --help", command))
}

/// Create error for a manifest run with failed tasks
pub fn tasks_failed(failed: usize, total: usize) -> CliError {
    CliError::new(format!("{} of {} task(s) failed", failed, total))
        .with_suggestion("Fix the failing tasks and run the manifest again")
        .with_help("Run: rivergeo run --help")
}

fn from_domain(error: &RiverGeoError) -> Option<CliError> {
    let message = error.to_string();
    let cli_error = match error {
        RiverGeoError::FileNotFound { .. } | RiverGeoError::InvalidPath { .. } => CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again"),
        RiverGeoError::CrsUndefined { .. } => CliError::new("CRS not defined")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Add a .prj file next to the shapefile")
            .with_help("Run: rivergeo reproject --help"),
        RiverGeoError::CrsMismatch { .. } => CliError::new("CRS mismatch detected")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Reproject the inputs to a common CRS first: rivergeo reproject --input DIR --epsg CODE")
            .with_help("Run: rivergeo reproject --help"),
        RiverGeoError::MissingField { .. } => CliError::new("Attribute field missing")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Choose fields present in every input with --fields A,B")
            .with_suggestion("Or set merge_fields in rivergeo.toml")
            .with_help("Run: rivergeo merge --help"),
        RiverGeoError::ConfigInvalid { key, reason } => CliError::new(format!("Invalid configuration: {}", key))
            .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
            .with_suggestion("Check rivergeo.toml (or the --config file) for syntax errors")
            .with_suggestion("Check RIVERGEO_* environment variables")
            .with_help("Run: rivergeo config"),
        RiverGeoError::UnsupportedFormat { .. } => CliError::new("Unsupported file format")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Use a .shp or .geojson path"),
        _ => return None,
    };
    Some(cli_error)
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(error) => error,
    };

    if let Some(cli_error) = error.downcast_ref::<RiverGeoError>().and_then(from_domain) {
        return cli_error;
    }

    let message = format!("{:#}", error);
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.to_lowercase().contains("permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
            .with_suggestion("Or run with appropriate privileges")
    } else {
        CliError::new(message)
    }
}
