pub mod crs;
pub mod layer;
pub mod raster;

pub use crs::Crs;
pub use layer::{geometry_kind, AttributeValue, Attributes, Feature, FieldDef, FieldKind, Geometry, Layer};
pub use raster::{Bounds, GeoTransform, Raster, XyzPoint};
