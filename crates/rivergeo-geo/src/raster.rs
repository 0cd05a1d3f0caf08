//! Raster mosaicking and point gridding

use ndarray::Array2;
use rivergeo_core::models::{GeoTransform, Raster, XyzPoint};
use rivergeo_core::{Result, RiverGeoError};

/// Largest grid either operation will allocate
const MAX_CELLS: usize = 1 << 30;

/// Mosaic rasters into one grid covering the union of their extents
///
/// Resolution, CRS tag and nodata value come from the first raster (nodata
/// defaults to NaN). Each output cell takes the nearest source cell of the
/// first raster, in input order, that has data there.
pub fn mosaic(rasters: &[Raster]) -> Result<Raster> {
    let first = rasters.first().ok_or_else(|| RiverGeoError::EmptyInput {
        reason: "no rasters to mosaic".to_string(),
    })?;

    let pixel_width = first.transform().pixel_width.abs();
    let pixel_height = first.transform().pixel_height.abs();
    if !(pixel_width > 0.0 && pixel_height > 0.0) {
        return Err(RiverGeoError::Raster {
            message: format!("invalid pixel size {} x {}", pixel_width, pixel_height),
        });
    }

    let bounds = rasters
        .iter()
        .skip(1)
        .fold(first.bounds(), |acc, raster| acc.union(&raster.bounds()));

    let cols = cell_count(bounds.width(), pixel_width);
    let rows = cell_count(bounds.height(), pixel_height);
    check_size(rows, cols)?;

    let nodata = first.nodata().unwrap_or(f32::NAN);
    let transform = GeoTransform::new(bounds.min_x, bounds.max_y, pixel_width, -pixel_height);
    let mut output = Raster::filled(rows, cols, nodata, transform)
        .with_nodata(Some(nodata))
        .with_epsg(first.epsg());
    let mut filled = Array2::from_elem((rows, cols), false);

    for (i, raster) in rasters.iter().enumerate() {
        if raster.epsg() != first.epsg() {
            tracing::warn!(
                "Raster {} has EPSG {:?}, mosaic uses {:?}; coordinates are not transformed",
                i,
                raster.epsg(),
                first.epsg()
            );
        }

        let source = raster.bounds();
        let col_start = ((source.min_x - bounds.min_x) / pixel_width).floor().max(0.0) as usize;
        let col_end = (((source.max_x - bounds.min_x) / pixel_width).ceil() as usize).min(cols);
        let row_start = ((bounds.max_y - source.max_y) / pixel_height).floor().max(0.0) as usize;
        let row_end = (((bounds.max_y - source.min_y) / pixel_height).ceil() as usize).min(rows);

        let mut written = 0usize;
        for row in row_start..row_end {
            for col in col_start..col_end {
                if filled[[row, col]] {
                    continue;
                }

                let (x, y) = transform.pixel_to_geo(col, row);
                let (source_col, source_row) = raster.transform().geo_to_pixel(x, y);
                if source_col < 0.0 || source_row < 0.0 {
                    continue;
                }

                let Some(value) = raster.get(source_row.floor() as usize, source_col.floor() as usize) else {
                    continue;
                };
                if raster.is_nodata(value) {
                    continue;
                }

                output.set(row, col, value)?;
                filled[[row, col]] = true;
                written += 1;
            }
        }
        tracing::debug!("Raster {} filled {} cell(s)", i, written);
    }

    Ok(output)
}

/// Grid points into a raster at the given resolution
///
/// The grid is aligned to multiples of `resolution`. When several points
/// fall into one cell the last one wins; empty cells are NaN nodata.
pub fn rasterize_points(points: &[XyzPoint], resolution: f64, epsg: Option<u32>) -> Result<Raster> {
    if points.is_empty() {
        return Err(RiverGeoError::EmptyInput { reason: "no points to rasterize".to_string() });
    }
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(RiverGeoError::Raster {
            message: format!("resolution must be positive, got {}", resolution),
        });
    }

    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for p in points {
        min_x = min_x.min(p.x);
        max_x = max_x.max(p.x);
        min_y = min_y.min(p.y);
        max_y = max_y.max(p.y);
    }

    let origin_x = (min_x / resolution).floor() * resolution;
    let top = (max_y / resolution).ceil() * resolution;
    let cols = ((max_x - origin_x) / resolution).floor() as usize + 1;
    let rows = ((top - min_y) / resolution).floor() as usize + 1;
    check_size(rows, cols)?;

    let transform = GeoTransform::new(origin_x, top, resolution, -resolution);
    let mut raster = Raster::filled(rows, cols, f32::NAN, transform)
        .with_nodata(Some(f32::NAN))
        .with_epsg(epsg);

    for p in points {
        let col = (((p.x - origin_x) / resolution).floor().max(0.0) as usize).min(cols - 1);
        let row = (((top - p.y) / resolution).floor().max(0.0) as usize).min(rows - 1);
        raster.set(row, col, p.z as f32)?;
    }

    tracing::debug!(
        "Gridded {} point(s) into {} x {} cells, {} filled",
        points.len(),
        rows,
        cols,
        raster.valid_count()
    );
    Ok(raster)
}

fn cell_count(extent: f64, pixel: f64) -> usize {
    ((extent / pixel) - 1e-6).ceil().max(1.0) as usize
}

fn check_size(rows: usize, cols: usize) -> Result<()> {
    match rows.checked_mul(cols) {
        Some(cells) if cells <= MAX_CELLS => Ok(()),
        _ => Err(RiverGeoError::Raster {
            message: format!("grid of {} x {} cells is too large", rows, cols),
        }),
    }
}
