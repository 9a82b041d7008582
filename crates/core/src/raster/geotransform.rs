//! Affine geotransformation for north-up rasters

use serde::{Deserialize, Serialize};

/// Mean Earth radius (IUGG) used for spherical cell areas, in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Georeferencing of a north-up grid.
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
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Geographic coordinates of the pixel centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + (col as f64 + 0.5) * self.pixel_width;
        let y = self.origin_y + (row as f64 + 0.5) * self.pixel_height;
        (x, y)
    }

    /// Geographic coordinates of the pixel's top-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        let x = self.origin_x + col as f64 * self.pixel_width;
        let y = self.origin_y + row as f64 * self.pixel_height;
        (x, y)
    }

    /// Fractional pixel coordinates `(col, row)`; floor them for indices.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        if self.pixel_width.abs() < 1e-12 || self.pixel_height.abs() < 1e-12 {
            return (f64::NAN, f64::NAN);
        }
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Area of one cell in squared CRS units.
    pub fn planar_cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    /// Area in m² of a cell in `row` of a longitude/latitude grid.
    ///
    /// Spherical band area between the row's edge latitudes:
    /// `R² · Δλ · |sin φ₁ − sin φ₂|`.
    pub fn geographic_cell_area(&self, row: usize) -> f64 {
        let (_, top) = self.pixel_to_geo_corner(0, row);
        let bottom = top + self.pixel_height;
        let dlon = self.pixel_width.abs().to_radians();
        let band = (top.to_radians().sin() - bottom.to_radians().sin()).abs();
        EARTH_RADIUS_M * EARTH_RADIUS_M * dlon * band
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` for a grid of this size
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.pixel_to_geo_corner(0, 0);
        let (x1, y1) = self.pixel_to_geo_corner(width, height);
        (x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1))
    }

    /// Whether two transforms describe the same sampling grid.
    pub fn aligned_with(&self, other: &GeoTransform) -> bool {
        const TOL: f64 = 1e-9;
        (self.origin_x - other.origin_x).abs() < TOL
            && (self.origin_y - other.origin_y).abs() < TOL
            && (self.pixel_width - other.pixel_width).abs() < TOL
            && (self.pixel_height - other.pixel_height).abs() < TOL
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
