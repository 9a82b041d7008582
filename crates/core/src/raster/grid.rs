//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::{Array2, ArrayView2};

/// A georeferenced single-band grid of `f64` samples.
///
/// Masked (no-data) cells are stored as NaN, which is how the evaluator
/// carries the platform's per-pixel mask: any cell that is NaN is outside
/// the active pixel set.
///
/// # Example
///
/// ```ignore
/// use aridex_core::Raster;
///
/// let mut raster = Raster::filled(100, 100, 1.0);
/// raster.set(10, 20, f64::NAN)?; // mask one cell
/// assert_eq!(raster.valid_count(), 9_999);
/// ```
#[derive(Debug, Clone)]
pub struct Raster {
    /// Row-major samples
    data: Array2<f64>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl Raster {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }
        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<f64>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
        }
    }

    /// Same grid and CRS, new samples.
    pub fn with_data(&self, data: Vec<f64>) -> Result<Self> {
        let (rows, cols) = self.shape();
        let mut out = Self::from_vec(data, rows, cols)?;
        out.transform = self.transform;
        out.crs = self.crs.clone();
        Ok(out)
    }

    /// Same grid and CRS, every cell set to `fill_value`.
    pub fn like(&self, fill_value: f64) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
        }
    }

    /// Builder-style transform setter
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Builder-style CRS setter
    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Value at (row, col), `None` when masked or out of range.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get((row, col)).copied().filter(|v| !v.is_nan())
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    /// Samples in row-major order
    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Whether `other` samples exactly the same cells.
    pub fn same_grid(&self, other: &Raster) -> bool {
        self.shape() == other.shape()
            && self.transform.aligned_with(&other.transform)
            && crate::crs::compatible(self.crs(), other.crs())
    }

    // Mask

    /// Whether cell (row, col) is in the active pixel set
    pub fn is_valid_at(&self, row: usize, col: usize) -> bool {
        self.value(row, col).is_some()
    }

    /// Number of unmasked cells
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Basic statistics over unmasked cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for &v in self.data.iter().filter(|v| !v.is_nan()) {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        let (min, max, mean) = if count > 0 {
            (Some(min), Some(max), Some(sum / count as f64))
        } else {
            (None, None, None)
        };

        RasterStatistics {
            min,
            max,
            mean,
            sum,
            valid_count: count,
            masked_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub sum: f64,
    pub valid_count: usize,
    pub masked_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_masked_cells_excluded_from_statistics() {
        let mut raster = Raster::filled(4, 4, 2.0);
        raster.set(0, 0, f64::NAN).unwrap();
        raster.set(3, 3, f64::NAN).unwrap();

        let stats = raster.statistics();
        assert_eq!(stats.valid_count, 14);
        assert_eq!(stats.masked_count, 2);
        assert_eq!(stats.sum, 28.0);
        assert_eq!(stats.mean, Some(2.0));
        assert!(!raster.is_valid_at(0, 0));
        assert_eq!(raster.value(1, 1), Some(2.0));
    }

    #[test]
    fn test_same_grid() {
        let a = Raster::new(3, 3).with_transform(GeoTransform::new(0.0, 3.0, 1.0, -1.0));
        let b = a.like(7.0);
        let c = Raster::new(3, 3).with_transform(GeoTransform::new(1.0, 3.0, 1.0, -1.0));
        assert!(a.same_grid(&b));
        assert!(!a.same_grid(&c));
    }
}
