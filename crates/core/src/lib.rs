//! # aridex core
//!
//! Core types and I/O shared by the aridex crates.
//!
//! This crate provides:
//! - `Raster`: materialised single-band grid (masked cells are NaN)
//! - `Image`: ordered set of named bands on one grid
//! - `GeoTransform`: affine transformation for georeferencing
//! - `CRS`: coordinate reference system handling
//! - `Region`: polygon region of interest with geodesic or planar edges
//! - native GeoTIFF read/write

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Image, Raster};
pub use vector::{EdgeMode, Region};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Image, Raster, RasterStatistics};
    pub use crate::vector::{EdgeMode, Region};
}
