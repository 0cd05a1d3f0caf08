//! Format abstraction layer for vector, raster and point-text files
//!
//! Vector formats implement the `VectorFormat` trait, and the `FormatRegistry`
//! manages format detection and dispatching to the matching implementation.
//! Rasters (GeoTIFF) and XYZ point text have one format each and are exposed
//! as plain functions.

use std::path::Path;

use crate::error::{Result, RiverGeoError};
use crate::models::Layer;

pub mod geojson;
pub mod geotiff;
pub mod prj;
pub mod shapefile;
pub mod validation;
pub mod xyz;

pub use self::geojson::GeoJsonFormat;
pub use self::shapefile::ShapefileFormat;
use self::validation::FormatValidator;

/// Vector format trait that all format implementations must implement
pub trait VectorFormat: Send + Sync {
    /// Read a layer from the given path
    fn read(&self, path: &Path) -> Result<Layer>;

    /// Write a layer to the given path, replacing any existing file
    fn write(&self, layer: &Layer, path: &Path) -> Result<()>;

    /// Get supported file extensions (e.g., ["shp"])
    fn supported_extensions(&self) -> &[&str];

    /// Get human-readable format name (e.g., "Shapefile", "GeoJSON")
    fn format_name(&self) -> &str;

    /// Validate file structure without a full read
    fn validate(&self, _path: &Path) -> Result<FormatValidation> {
        Ok(FormatValidation::default())
    }
}

/// Result of format validation
#[derive(Debug, Clone, Default)]
pub struct FormatValidation {
    /// Validation errors that prevent reading
    pub errors: Vec<String>,

    /// Warnings that don't prevent reading but indicate potential issues
    pub warnings: Vec<String>,
}

impl FormatValidation {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Central registry for vector formats
pub struct FormatRegistry {
    formats: Vec<Box<dyn VectorFormat>>,
}

impl FormatRegistry {
    /// Create a new empty format registry
    pub fn new() -> Self {
        Self { formats: Vec::new() }
    }

    /// Registry with Shapefile and GeoJSON support
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(ShapefileFormat));
        registry.register(Box::new(GeoJsonFormat));
        registry
    }

    /// Register a format
    pub fn register(&mut self, format: Box<dyn VectorFormat>) {
        self.formats.push(format);
    }

    /// Detect format by file extension (case-insensitive)
    pub fn detect_format(&self, path: &Path) -> Result<&dyn VectorFormat> {
        let extension = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            RiverGeoError::UnsupportedFormat {
                extension: "none".to_string(),
                supported: self.supported_formats(),
            }
        })?;

        self.formats
            .iter()
            .find(|f| {
                f.supported_extensions()
                    .iter()
                    .any(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .map(|f| f.as_ref())
            .ok_or_else(|| RiverGeoError::UnsupportedFormat {
                extension: extension.to_string(),
                supported: self.supported_formats(),
            })
    }

    /// Validate, then read a layer with the format matching the path
    pub fn read(&self, path: &Path) -> Result<Layer> {
        let format = self.detect_format(path)?;
        if !path.exists() {
            return Err(RiverGeoError::FileNotFound { path: path.to_path_buf() });
        }

        let validation = format.validate(path)?;
        for warning in &validation.warnings {
            tracing::debug!("{}", warning);
        }
        FormatValidator::validation_to_result(&validation, format.format_name())?;

        tracing::debug!("Reading {} as {}", path.display(), format.format_name());
        format.read(path)
    }

    /// Write a layer with the format matching the path
    pub fn write(&self, layer: &Layer, path: &Path) -> Result<()> {
        let format = self.detect_format(path)?;
        format.write(layer, path)?;
        tracing::info!(
            "Wrote {} feature(s) to {} ({})",
            layer.len(),
            path.display(),
            format.format_name()
        );
        Ok(())
    }

    /// Get list of all supported format extensions
    pub fn supported_formats(&self) -> Vec<String> {
        self.formats
            .iter()
            .flat_map(|f| f.supported_extensions())
            .map(|s| s.to_string())
            .collect()
    }

}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
