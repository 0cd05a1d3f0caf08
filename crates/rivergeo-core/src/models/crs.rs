//! Coordinate reference system tag carried by layers and rasters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate Reference System identified by EPSG code, WKT text, or both
///
/// Shapefiles exported from ESRI tools often carry a `.prj` without an
/// authority code; such layers keep the WKT so PROJ can still interpret it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crs {
    pub epsg: Option<u32>,
    pub wkt: Option<String>,
}

impl Crs {
    pub fn from_epsg(epsg: u32) -> Self {
        Self { epsg: Some(epsg), wkt: None }
    }

    pub fn from_wkt(wkt: impl Into<String>, epsg: Option<u32>) -> Self {
        Self { epsg, wkt: Some(wkt.into()) }
    }

    /// WGS 84 (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// ETRS89 / UTM zone 32N (EPSG:25832)
    pub fn etrs89_utm32n() -> Self {
        Self::from_epsg(25832)
    }

    /// Definition string understood by PROJ, preferring the authority code
    pub fn definition(&self) -> Option<String> {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => Some(format!("EPSG:{}", code)),
            (None, Some(wkt)) => Some(wkt.clone()),
            (None, None) => None,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => write!(f, "EPSG:{}", code),
            (None, Some(_)) => write!(f, "custom WKT (no EPSG code)"),
            (None, None) => write!(f, "undefined"),
        }
    }
}
