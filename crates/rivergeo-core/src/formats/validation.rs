//! Cheap pre-read checks run by the registry before a format parses a file

use crate::error::{Result, RiverGeoError};
use crate::formats::FormatValidation;
use std::path::Path;

pub struct FormatValidator;

impl FormatValidator {
    /// Error unless the path has one of the given extensions (case-insensitive)
    pub fn validate_extension(path: &Path, expected: &[&str]) -> FormatValidation {
        let mut validation = FormatValidation::default();
        let listed = expected.iter().map(|e| format!(".{}", e)).collect::<Vec<_>>().join(", ");

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if expected.iter().any(|e| ext.eq_ignore_ascii_case(e)) => {}
            Some(ext) => validation
                .errors
                .push(format!("Unexpected file extension: .{} (expected {})", ext, listed)),
            None => validation.errors.push(format!("File has no extension (expected {})", listed)),
        }

        validation
    }

    /// Sidecar files next to `path`: missing required ones are errors,
    /// missing optional ones warnings
    pub fn validate_component_files(path: &Path, required: &[&str], optional: &[&str]) -> FormatValidation {
        let mut validation = FormatValidation::default();

        let missing: Vec<String> = required
            .iter()
            .filter(|ext| !path.with_extension(ext).exists())
            .map(|ext| format!(".{}", ext))
            .collect();
        if !missing.is_empty() {
            validation
                .errors
                .push(format!("Missing required component files: {}", missing.join(", ")));
        }

        for ext in optional {
            let component = path.with_extension(ext);
            if !component.exists() {
                validation
                    .warnings
                    .push(format!("No {} next to {}; the layer will have no CRS", ext, path.display()));
            }
        }

        validation
    }

    /// Error for a zero-byte file
    pub fn validate_not_empty(path: &Path) -> FormatValidation {
        let mut validation = FormatValidation::default();
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() == 0 => validation.errors.push(format!("{} is empty", path.display())),
            Ok(_) => {}
            Err(e) => validation.errors.push(format!("Cannot access {}: {}", path.display(), e)),
        }
        validation
    }

    pub fn merge_validations(validations: Vec<FormatValidation>) -> FormatValidation {
        validations.into_iter().fold(FormatValidation::default(), |mut merged, v| {
            merged.errors.extend(v.errors);
            merged.warnings.extend(v.warnings);
            merged
        })
    }

    /// Turn validation errors into a format error; warnings pass
    pub fn validation_to_result(validation: &FormatValidation, format_name: &str) -> Result<()> {
        if validation.is_valid() {
            Ok(())
        } else {
            Err(RiverGeoError::format(format_name, validation.errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_extension_check_ignores_case() {
        assert!(FormatValidator::validate_extension(Path::new("banks.GeoJSON"), &["json", "geojson"]).is_valid());
        assert!(!FormatValidator::validate_extension(Path::new("banks.geojson"), &["shp"]).is_valid());
        assert!(!FormatValidator::validate_extension(Path::new("banks"), &["shp"]).is_valid());
    }

    #[test]
    fn test_missing_sidecars() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Elz_korr.shp");
        fs::write(&path, b"x").unwrap();
        fs::write(dir.path().join("Elz_korr.dbf"), b"x").unwrap();

        let validation = FormatValidator::validate_component_files(&path, &["shp", "shx", "dbf"], &["prj"]);

        assert_eq!(validation.errors, vec!["Missing required component files: .shx".to_string()]);
        assert!(validation.has_warnings());
    }

    #[test]
    fn test_empty_file_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.geojson");
        fs::write(&path, b"").unwrap();

        assert!(!FormatValidator::validate_not_empty(&path).is_valid());
    }

    #[test]
    fn test_errors_become_format_error() {
        let merged = FormatValidator::merge_validations(vec![
            FormatValidation { errors: vec!["no .shx".into()], warnings: vec!["no .prj".into()] },
            FormatValidation { errors: vec!["no .dbf".into()], warnings: vec![] },
        ]);

        let err = FormatValidator::validation_to_result(&merged, "Shapefile").unwrap_err();
        assert!(err.to_string().contains("no .shx; no .dbf"));

        let warnings_only = FormatValidation { errors: vec![], warnings: vec!["no .prj".into()] };
        assert!(FormatValidator::validation_to_result(&warnings_only, "Shapefile").is_ok());
    }
}
