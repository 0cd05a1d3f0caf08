//! Native single-band GeoTIFF reading/writing
//!
//! Uses the `tiff` crate for TIFF I/O and handles the GeoTIFF tags directly:
//! ModelPixelScale + ModelTiepoint for the transform, the GeoKey directory
//! for the EPSG code, and GDAL's nodata tag.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

use crate::error::{Result, RiverGeoError};
use crate::models::{GeoTransform, Raster};

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u32 = 1024;
const GT_RASTER_TYPE_KEY: u32 = 1025;
const GEOGRAPHIC_TYPE_KEY: u32 = 2048;
const PROJECTED_CS_TYPE_KEY: u32 = 3072;
const USER_DEFINED: u32 = 32767;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn raster_error(context: &str, e: impl std::fmt::Display) -> RiverGeoError {
    RiverGeoError::Raster { message: format!("{}: {}", context, e) }
}

/// Read a GeoTIFF file into a Raster (first band, converted to f32)
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<Raster> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(RiverGeoError::FileNotFound { path: path.to_path_buf() });
    }
    let file = File::open(path)?;
    let raster = decode_geotiff(BufReader::new(file))
        .map_err(|e| match e {
            RiverGeoError::Raster { message } => RiverGeoError::Raster {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })?;

    tracing::debug!(
        "Read {}x{} raster from {} (EPSG {:?})",
        raster.cols(),
        raster.rows(),
        path.display(),
        raster.epsg()
    );
    Ok(raster)
}

fn decode_geotiff<R: Read + Seek>(reader: R) -> Result<Raster> {
    let mut decoder = Decoder::new(reader).map_err(|e| raster_error("TIFF decode error", e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| raster_error("Cannot read dimensions", e))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| raster_error("Cannot read image data", e))?;

    let data: Vec<f32> = match result {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| v as f32).collect(),
        _ => {
            return Err(RiverGeoError::Raster {
                message: "Unsupported TIFF pixel format".to_string(),
            })
        }
    };

    let cells = rows * cols;
    let data = if data.len() == cells {
        data
    } else if cells > 0 && data.len() % cells == 0 {
        // Interleaved samples; keep the first band
        let samples = data.len() / cells;
        tracing::warn!("Raster has {} samples per pixel; reading band 1 only", samples);
        data.into_iter().step_by(samples).collect()
    } else {
        return Err(RiverGeoError::Raster {
            message: format!("Pixel count {} does not match {}x{}", data.len(), cols, rows),
        });
    };

    let transform = read_geotransform(&mut decoder).unwrap_or_else(|| {
        tracing::warn!("No georeferencing tags found; using a unit pixel grid");
        GeoTransform::default()
    });
    let nodata = decoder
        .get_tag_ascii_string(tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(char::from(0)).trim().parse::<f32>().ok());
    let epsg = decoder
        .get_tag_u32_vec(tag(GEO_KEY_DIRECTORY))
        .ok()
        .and_then(|keys| epsg_from_geokeys(&keys));

    Ok(Raster::from_vec(data, rows, cols, transform)?
        .with_nodata(nodata)
        .with_epsg(epsg))
}

/// GeoTransform from ModelPixelScale and ModelTiepoint
fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(tag(MODEL_PIXEL_SCALE)).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(tag(MODEL_TIEPOINT)).ok()?;

    if scale.len() >= 2 && tiepoint.len() >= 6 {
        // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
        let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
        let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
        return Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]));
    }
    None
}

/// EPSG code from a GeoKey directory (`[version, rev, minor, count, key…]`)
pub fn epsg_from_geokeys(keys: &[u32]) -> Option<u32> {
    let count = *keys.get(3)? as usize;
    let entries = keys.get(4..)?;

    let mut geographic = None;
    for entry in entries.chunks_exact(4).take(count) {
        let (key, location, value) = (entry[0], entry[1], entry[3]);
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key {
            PROJECTED_CS_TYPE_KEY => return Some(value),
            GEOGRAPHIC_TYPE_KEY => geographic = Some(value),
            _ => {}
        }
    }
    geographic
}

/// Whether an EPSG code denotes a geographic (lat/lon) CRS
fn is_geographic(epsg: u32) -> bool {
    matches!(epsg, 4326 | 4258 | 4269 | 4314 | 4283 | 4230 | 4167 | 4612 | 4490)
}

/// GeoKey directory declaring the model type and EPSG code
pub fn geokeys_for_epsg(epsg: Option<u32>) -> Vec<u16> {
    let mut keys: Vec<[u16; 4]> = Vec::new();

    match epsg.and_then(|code| u16::try_from(code).ok()) {
        Some(code) if is_geographic(u32::from(code)) => {
            keys.push([GT_MODEL_TYPE_KEY as u16, 0, 1, MODEL_TYPE_GEOGRAPHIC]);
            keys.push([GT_RASTER_TYPE_KEY as u16, 0, 1, 1]);
            keys.push([GEOGRAPHIC_TYPE_KEY as u16, 0, 1, code]);
        }
        Some(code) => {
            keys.push([GT_MODEL_TYPE_KEY as u16, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([GT_RASTER_TYPE_KEY as u16, 0, 1, 1]);
            keys.push([PROJECTED_CS_TYPE_KEY as u16, 0, 1, code]);
        }
        None => {
            keys.push([GT_MODEL_TYPE_KEY as u16, 0, 1, MODEL_TYPE_PROJECTED]);
            keys.push([GT_RASTER_TYPE_KEY as u16, 0, 1, 1]);
        }
    }

    let mut directory = vec![1, 1, 0, keys.len() as u16];
    directory.extend(keys.into_iter().flatten());
    directory
}

/// Write a Raster to a 32-bit float GeoTIFF
pub fn write_geotiff<P: AsRef<Path>>(raster: &Raster, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer)?;
    writer.flush()?;

    tracing::debug!(
        "Wrote {}x{} raster to {}",
        raster.cols(),
        raster.rows(),
        path.display()
    );
    Ok(())
}

fn encode_geotiff<W: Write + Seek>(raster: &Raster, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer).map_err(|e| raster_error("TIFF encoder error", e))?;

    let (rows, cols) = (raster.rows(), raster.cols());
    if rows == 0 || cols == 0 {
        return Err(RiverGeoError::Raster { message: "Cannot write an empty raster".to_string() });
    }

    let data: Vec<f32> = raster.data().iter().copied().collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| raster_error("Cannot create TIFF image", e))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_PIXEL_SCALE), &scale[..])
        .map_err(|e| raster_error("Cannot write scale tag", e))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(tag(MODEL_TIEPOINT), &tiepoint[..])
        .map_err(|e| raster_error("Cannot write tiepoint tag", e))?;

    let geokeys = geokeys_for_epsg(raster.epsg());
    image
        .encoder()
        .write_tag(tag(GEO_KEY_DIRECTORY), geokeys.as_slice())
        .map_err(|e| raster_error("Cannot write geokey tag", e))?;

    if let Some(nodata) = raster.nodata() {
        let text = if nodata.is_nan() { "nan".to_string() } else { nodata.to_string() };
        image
            .encoder()
            .write_tag(tag(GDAL_NODATA), text.as_str())
            .map_err(|e| raster_error("Cannot write nodata tag", e))?;
    }

    image
        .write_data(&data)
        .map_err(|e| raster_error("Cannot write image data", e))?;

    Ok(())
}
