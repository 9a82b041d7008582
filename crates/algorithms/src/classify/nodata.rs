//! No-data normalization
//!
//! Raw inputs mark missing pixels with more than one value. Normalizing
//! rewrites the alternates to the canonical sentinel, then masks every
//! pixel carrying it.

use crate::graph::RasterExpr;
use serde::{Deserialize, Serialize};

/// Canonical missing-value marker
pub const CANONICAL_NODATA: f64 = -32768.0;

/// Raw input-side marker seen in the source datasets
pub const RAW_NODATA: f64 = 9999.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoDataNormalizer {
    pub canonical: f64,
    #[serde(default)]
    pub alternates: Vec<f64>,
}

impl Default for NoDataNormalizer {
    fn default() -> Self {
        Self {
            canonical: CANONICAL_NODATA,
            alternates: vec![RAW_NODATA],
        }
    }
}

impl NoDataNormalizer {
    pub fn new(canonical: f64, alternates: Vec<f64>) -> Self {
        Self {
            canonical,
            alternates,
        }
    }

    pub fn apply(&self, raster: &RasterExpr) -> RasterExpr {
        let rewritten = self
            .alternates
            .iter()
            .fold(raster.clone(), |acc, &alt| acc.set_where(&acc.equals(alt), self.canonical));
        rewritten.update_mask(&rewritten.not_equals(self.canonical))
    }

    /// Scalar form: `None` for missing.
    pub fn normalize_value(&self, value: f64) -> Option<f64> {
        let missing = value.is_nan()
            || value == self.canonical
            || self.alternates.iter().any(|&alt| value == alt);
        (!missing).then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers() {
        let n = NoDataNormalizer::default();
        assert_eq!(n.normalize_value(9999.0), None);
        assert_eq!(n.normalize_value(-32768.0), None);
        assert_eq!(n.normalize_value(f64::NAN), None);
        assert_eq!(n.normalize_value(1.4), Some(1.4));
    }

    #[test]
    fn test_graph_shape() {
        let n = NoDataNormalizer::default();
        let out = n.apply(&RasterExpr::image("x"));
        let text = out.to_string();
        assert!(text.contains("Eq 9999"));
        assert!(text.contains("Ne -32768"));
    }
}
