//! rivergeo geo - line geometry, CRS and raster operations
//!
//! This crate holds the algorithms behind the batch commands: bankline
//! direction alignment, centerline/bankline intersections, proximity
//! segments, multi-part splitting, layer merging, reprojection, raster
//! mosaicking and point gridding.

pub mod direction;
pub mod index;
pub mod intersection;
pub mod lines;
pub mod merge;
pub mod proximity;
pub mod raster;
pub mod split;
pub mod transform;
pub mod validation;
