//! rivergeo core - data model, file formats and configuration
//!
//! This crate holds the vector/raster data model shared by the rivergeo tools,
//! the readers and writers for Shapefile, GeoJSON, GeoTIFF and XYZ text, and the
//! layered configuration and task manifest.

pub mod config;
pub mod error;
pub mod formats;
pub mod manifest;
pub mod models;

pub use error::{Result, RiverGeoError};
