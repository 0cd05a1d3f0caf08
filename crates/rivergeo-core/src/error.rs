//! Error types for rivergeo

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RiverGeoError {
    // File errors
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid path {path}: {reason}")]
    InvalidPath { path: PathBuf, reason: String },

    // Format errors
    #[error("{format} error: {message}")]
    FormatError { format: String, message: String },

    #[error("Unsupported format '.{extension}'. Supported: {}", supported.join(", "))]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    // CRS errors
    #[error("CRS mismatch: dataset has {dataset_crs}, expected {expected_crs}")]
    CrsMismatch {
        dataset_crs: String,
        expected_crs: String,
    },

    #[error("CRS not defined for {path}")]
    CrsUndefined { path: PathBuf },

    #[error("Failed to project from {from} to {to}: {reason}")]
    Projection {
        from: String,
        to: String,
        reason: String,
    },

    // Geometry and table errors
    #[error("Invalid geometry at feature {feature_id}: {reason}")]
    InvalidGeometry { feature_id: String, reason: String },

    #[error("{path} must contain exactly {expected} feature(s), found {found}")]
    FeatureCount {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("Field '{field}' not found in {dataset}")]
    MissingField { dataset: String, field: String },

    // Raster errors
    #[error("Raster error: {message}")]
    Raster { message: String },

    #[error("Nothing to process: {reason}")]
    EmptyInput { reason: String },

    // Configuration errors
    #[error("Missing required configuration: {key}")]
    ConfigMissing { key: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RiverGeoError {
    pub(crate) fn format(format: &str, message: impl Into<String>) -> Self {
        RiverGeoError::FormatError {
            format: format.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiverGeoError>;
