//! Delimited XYZ point text (easting, northing, elevation; no header).
//!
//! Survey exports prefix the easting with the UTM zone number, e.g.
//! `32690123.45` for zone 32; that prefix is stripped before parsing.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::{Result, RiverGeoError};
use crate::models::XyzPoint;

const FORMAT: &str = "XYZ";

/// Reader settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XyzReadOptions {
    pub delimiter: u8,
    /// Characters removed from the start of the easting field
    pub easting_prefix_len: usize,
}

impl Default for XyzReadOptions {
    fn default() -> Self {
        Self { delimiter: b'\t', easting_prefix_len: 2 }
    }
}

/// Points read from a file plus the number of rows dropped while cleaning
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XyzReadResult {
    pub points: Vec<XyzPoint>,
    pub dropped: usize,
}

/// Read an XYZ file
///
/// An easting that cannot be parsed fails the whole file. Rows whose
/// northing or elevation is missing, unparsable or non-finite are dropped.
pub fn read_xyz(path: &Path, options: &XyzReadOptions) -> Result<XyzReadResult> {
    if !path.exists() {
        return Err(RiverGeoError::FileNotFound { path: path.to_path_buf() });
    }
    let file = File::open(path)?;
    let result = read_xyz_from(BufReader::new(file), options, &path.display().to_string())?;

    tracing::debug!(
        "Read {} point(s) from {}, dropped {} row(s)",
        result.points.len(),
        path.display(),
        result.dropped
    );
    Ok(result)
}

/// Read XYZ rows from any reader; `source` names the input in errors
pub fn read_xyz_from<R: Read>(reader: R, options: &XyzReadOptions, source: &str) -> Result<XyzReadResult> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut result = XyzReadResult::default();

    for record in csv_reader.records() {
        let record = record
            .map_err(|e| RiverGeoError::format(FORMAT, format!("{}: {}", source, e)))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        // Blank lines only; an empty easting next to other values is invalid
        if record.iter().all(str::is_empty) {
            continue;
        }
        let easting_field = record.get(0).unwrap_or_default();

        let x = parse_easting(easting_field, options.easting_prefix_len).ok_or_else(|| {
            RiverGeoError::format(
                FORMAT,
                format!("{} line {}: invalid easting '{}'", source, line, easting_field),
            )
        })?;

        let y = record.get(1).and_then(parse_finite);
        let z = record.get(2).and_then(parse_finite);

        match (y, z) {
            (Some(y), Some(z)) => result.points.push(XyzPoint::new(x, y, z)),
            _ => {
                tracing::debug!("{} line {}: dropping row with invalid northing/elevation", source, line);
                result.dropped += 1;
            }
        }
    }

    Ok(result)
}

fn parse_easting(field: &str, prefix_len: usize) -> Option<f64> {
    let stripped: String = field.chars().skip(prefix_len).collect();
    stripped.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Result<XyzReadResult> {
        read_xyz_from(text.as_bytes(), &XyzReadOptions::default(), "test.asc")
    }

    #[test]
    fn test_strips_zone_prefix() {
        let result = read("32690001.50\t5340002.25\t512.3\n32690002.50\t5340002.25\t512.9\n").unwrap();

        assert_eq!(result.points.len(), 2);
        assert_eq!(result.points[0], XyzPoint::new(690001.5, 5340002.25, 512.3));
        assert_eq!(result.dropped, 0);
    }

    #[test]
    fn test_drops_bad_rows_and_skips_blank_lines() {
        let text = "32690001\t5340002\t500\n\n32690002\tabc\t501\n32690003\t5340003\tnan\n32690004\t5340004\n";
        let result = read(text).unwrap();

        assert_eq!(result.points.len(), 1);
        assert_eq!(result.dropped, 3);
    }

    #[test]
    fn test_invalid_easting_fails_file() {
        let err = read("32690001\t5340002\t500\nXXabc\t5340002\t500\n").unwrap_err();
        assert!(err.to_string().contains("invalid easting"));
    }

    #[test]
    fn test_empty_easting_fails_file() {
        let err = read("32500000.0\t5000000.0\t10.0\n\t5000001.0\t11.0\n").unwrap_err();
        assert!(err.to_string().contains("invalid easting ''"));
    }

    #[test]
    fn test_custom_delimiter_without_prefix() {
        let options = XyzReadOptions { delimiter: b' ', easting_prefix_len: 0 };
        let result = read_xyz_from("1.0 2.0 3.0\n".as_bytes(), &options, "space.xyz").unwrap();
        assert_eq!(result.points, vec![XyzPoint::new(1.0, 2.0, 3.0)]);
    }
}
