use crate::output::OutputWriter;
use crate::output_types::FileRow;
use crate::progress::{file_progress, finish_error, finish_success};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened to one input file
#[derive(Debug, Clone)]
pub enum FileOutcome {
    /// Outputs were written (or planned, in dry-run mode)
    Processed {
        outputs: Vec<PathBuf>,
        message: Option<String>,
    },
    /// Nothing to do for this file
    Skipped { reason: String },
}

impl FileOutcome {
    pub fn written(outputs: Vec<PathBuf>) -> Self {
        FileOutcome::Processed { outputs, message: None }
    }

    pub fn written_with(outputs: Vec<PathBuf>, message: impl Into<String>) -> Self {
        FileOutcome::Processed {
            outputs,
            message: Some(message.into()),
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        FileOutcome::Skipped { reason: reason.into() }
    }
}

/// Result of processing a single file in a batch
#[derive(Debug, Clone, Serialize)]
pub struct FileProcessingResult {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileProcessingResult {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            outputs: Vec::new(),
            message: None,
            error: None,
        }
    }
}

/// Summary of batch processing results
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    /// Total files discovered
    pub total_files: usize,

    /// Files that produced output
    pub successful: Vec<FileProcessingResult>,

    /// Files left alone, with the reason
    pub skipped: Vec<FileProcessingResult>,

    /// Failed files
    pub failed: Vec<FileProcessingResult>,
}

impl BatchSummary {
    /// Create a new empty batch summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a successful result
    pub fn add_success(&mut self, result: FileProcessingResult) {
        self.successful.push(result);
    }

    /// Add a skipped result
    pub fn add_skipped(&mut self, result: FileProcessingResult) {
        self.skipped.push(result);
    }

    /// Add a failed result
    pub fn add_failure(&mut self, result: FileProcessingResult) {
        self.failed.push(result);
    }

    /// Record the outcome of one file
    pub fn record(&mut self, path: &Path, outcome: Result<FileOutcome>) {
        let mut result = FileProcessingResult::new(path);
        match outcome {
            Ok(FileOutcome::Processed { outputs, message }) => {
                result.outputs = outputs;
                result.message = message;
                self.add_success(result);
            }
            Ok(FileOutcome::Skipped { reason }) => {
                result.message = Some(reason);
                self.add_skipped(result);
            }
            Err(error) => {
                result.error = Some(format!("{:#}", error));
                self.add_failure(result);
            }
        }
    }

    pub fn success_count(&self) -> usize {
        self.successful.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Check if all files succeeded
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Every output file written by the batch
    pub fn outputs(&self) -> impl Iterator<Item = &PathBuf> {
        self.successful.iter().flat_map(|r| r.outputs.iter())
    }

    /// Display summary to output
    pub fn display(&self, output: &OutputWriter) {
        output.section("Batch Processing Summary");
        output.kv("Total Files", self.total_files);
        output.kv("Successful", self.success_count());
        output.kv("Skipped", self.skipped_count());
        output.kv("Failed", self.failure_count());

        if !self.successful.is_empty() {
            output.section("Written");
            let rows: Vec<FileRow> = self.successful.iter().flat_map(FileRow::from_result).collect();
            output.table(rows);
        }

        if !self.skipped.is_empty() {
            output.section("Skipped");
            for result in &self.skipped {
                output.info(format!(
                    "{} - {}",
                    result.path.display(),
                    result.message.as_deref().unwrap_or("no reason given")
                ));
            }
        }

        if !self.failed.is_empty() {
            output.section("Failed Files");
            for result in &self.failed {
                output.error(format!(
                    "{} - {}",
                    result.path.display(),
                    result.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }
}

/// Run `process` over every file, recording failures and moving on
pub fn process_files<F>(output: &OutputWriter, files: &[PathBuf], message: &str, mut process: F) -> BatchSummary
where
    F: FnMut(&Path) -> Result<FileOutcome>,
{
    let mut summary = BatchSummary::new();
    summary.total_files = files.len();

    let pb = file_progress(files.len(), message, !output.is_json());
    for path in files {
        pb.set_message(format!("{} {}", message, display_name(path)));
        tracing::debug!("Processing {}", path.display());

        let outcome = process(path);
        match &outcome {
            Ok(FileOutcome::Processed { outputs, .. }) => {
                for written in outputs {
                    tracing::info!("Wrote {}", written.display());
                }
            }
            Ok(FileOutcome::Skipped { reason }) => {
                tracing::warn!("Skipping {}: {}", path.display(), reason);
            }
            Err(error) => {
                pb.suspend(|| output.error(format!("{}: {:#}", path.display(), error)));
            }
        }
        summary.record(path, outcome);
        pb.inc(1);
    }

    let done = format!(
        "{}: {} written, {} skipped, {} failed",
        message,
        summary.success_count(),
        summary.skipped_count(),
        summary.failure_count()
    );
    if summary.all_succeeded() {
        finish_success(&pb, &done);
    } else {
        finish_error(&pb, &done);
    }

    summary
}

/// List the files in `dir` with one of `extensions`, sorted by name
///
/// Extensions are matched case-insensitively. Subdirectories are not entered.
pub fn scan_directory(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(crate::errors::directory_not_found(dir).into());
    }

    let entries = fs::read_dir(dir).context(format!("Failed to read directory: {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.context("Failed to read directory entry")?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| extensions.iter().any(|wanted| e.eq_ignore_ascii_case(wanted)))
            .unwrap_or(false);
        if matches {
            files.push(path);
        }
    }

    files.sort();
    tracing::debug!("Found {} file(s) in {}", files.len(), dir.display());
    Ok(files)
}

/// Companion file in `dir` for `path`
///
/// The companion's stem is `path`'s stem with `from_suffix` replaced by
/// `to_suffix`; `None` when the stem does not end with `from_suffix`.
pub fn companion_path(path: &Path, dir: &Path, from_suffix: &str, to_suffix: &str) -> Option<PathBuf> {
    let stem = path.file_stem()?.to_str()?;
    let base = stem.strip_suffix(from_suffix)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("shp");
    Some(dir.join(format!("{}{}.{}", base, to_suffix, extension)))
}

/// File name of a path for messages
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
