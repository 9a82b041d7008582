//! Materialised raster data
//!
//! These types only exist on the evaluation side: index functions build
//! graphs, and a `Raster`/`Image` appears once an evaluator runs one.

mod geotransform;
mod grid;
mod image;

pub use geotransform::{GeoTransform, EARTH_RADIUS_M};
pub use grid::{Raster, RasterStatistics};
pub use image::Image;
