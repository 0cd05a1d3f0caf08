//! Georeferenced single-band raster grid.

use crate::error::{Result, RiverGeoError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Affine transformation for north-up rasters.
///
/// ```text
/// x = origin_x + col * pixel_width
/// y = origin_y + row * pixel_height
/// ```
///
/// `pixel_height` is negative for north-up images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self { origin_x, origin_y, pixel_width, pixel_height }
    }

    /// Geographic coordinates of the pixel center
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Fractional pixel coordinates `(col, row)`; use `.floor()` for indices
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width == 0.0 || self.pixel_height == 0.0 {
            return (f64::NAN, f64::NAN);
        }
        let col = (x - self.origin_x) / self.pixel_width;
        let row = (y - self.origin_y) / self.pixel_height;
        (col, row)
    }

    /// Bounding box of a raster with the given dimensions
    pub fn bounds(&self, cols: usize, rows: usize) -> Bounds {
        let x0 = self.origin_x;
        let x1 = self.origin_x + cols as f64 * self.pixel_width;
        let y0 = self.origin_y;
        let y1 = self.origin_y + rows as f64 * self.pixel_height;
        Bounds {
            min_x: x0.min(x1),
            min_y: y0.min(y1),
            max_x: x0.max(x1),
            max_y: y0.max(y1),
        }
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

/// Axis-aligned extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// A georeferenced 2D grid of `f32` cells stored row-major `(row, col)`
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    data: Array2<f32>,
    transform: GeoTransform,
    nodata: Option<f32>,
    epsg: Option<u32>,
}

impl Raster {
    /// Create a raster filled with a single value
    pub fn filled(rows: usize, cols: usize, value: f32, transform: GeoTransform) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform,
            nodata: None,
            epsg: None,
        }
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<f32>, rows: usize, cols: usize, transform: GeoTransform) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(RiverGeoError::Raster {
                message: format!(
                    "Data length {} does not match {} rows x {} cols",
                    data.len(),
                    rows,
                    cols
                ),
            });
        }

        let data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| RiverGeoError::Raster { message: e.to_string() })?;

        Ok(Self { data, transform, nodata: None, epsg: None })
    }

    pub fn with_nodata(mut self, nodata: Option<f32>) -> Self {
        self.nodata = nodata;
        self
    }

    pub fn with_epsg(mut self, epsg: Option<u32>) -> Self {
        self.epsg = epsg;
        self
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn nodata(&self) -> Option<f32> {
        self.nodata
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.data.get((row, col)).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) -> Result<()> {
        let (rows, cols) = self.data.dim();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(RiverGeoError::Raster {
                message: format!("Cell ({}, {}) outside {}x{} raster", row, col, rows, cols),
            }),
        }
    }

    /// Whether a cell value counts as missing (NaN or the nodata value)
    pub fn is_nodata(&self, value: f32) -> bool {
        value.is_nan() || self.nodata.is_some_and(|nd| value == nd)
    }

    pub fn bounds(&self) -> Bounds {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Count of cells holding data
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !self.is_nodata(**v)).count()
    }
}

/// A scattered elevation sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct XyzPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl XyzPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}
