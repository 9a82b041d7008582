//! Weighted-product composition
//!
//! A composite index is `∏ factorᵢ ^ exponentᵢ`, usually with every
//! exponent `1/N` (a geometric mean). [`IndexComposer`] runs the whole
//! pipeline from named factors to a classified, aligned, clipped layer.

use super::{NoDataNormalizer, ThresholdTable};
use crate::graph::{RasterExpr, WeightedTerm};
use aridex_core::{Error, Region, Result};
use std::collections::HashSet;
use tracing::debug;

/// One named factor and its exponent
#[derive(Debug, Clone)]
pub struct FactorTerm {
    pub name: String,
    pub raster: RasterExpr,
    pub exponent: f64,
}

impl FactorTerm {
    pub fn new(name: impl Into<String>, raster: RasterExpr, exponent: f64) -> Self {
        Self {
            name: name.into(),
            raster,
            exponent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompositeFormula {
    terms: Vec<FactorTerm>,
}

impl CompositeFormula {
    pub fn new(terms: Vec<FactorTerm>) -> Result<Self> {
        if terms.is_empty() {
            return Err(Error::config("composite formula", "no factors"));
        }
        let mut names = HashSet::new();
        for term in &terms {
            if !term.exponent.is_finite() {
                return Err(Error::config(
                    "composite formula",
                    format!("exponent of '{}' is {}", term.name, term.exponent),
                ));
            }
            if !names.insert(term.name.as_str()) {
                return Err(Error::config(
                    "composite formula",
                    format!("factor '{}' listed twice", term.name),
                ));
            }
        }
        Ok(Self { terms })
    }

    /// Every factor weighted `1/N`.
    pub fn equal_weights(factors: Vec<(String, RasterExpr)>) -> Result<Self> {
        let exponent = 1.0 / factors.len().max(1) as f64;
        Self::new(
            factors
                .into_iter()
                .map(|(name, raster)| FactorTerm::new(name, raster, exponent))
                .collect(),
        )
    }

    pub fn terms(&self) -> &[FactorTerm] {
        &self.terms
    }

    pub fn names(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.name.as_str()).collect()
    }

    /// Rewrite every factor through `f`, keeping names and exponents.
    pub fn map_factors<F>(&self, f: F) -> Self
    where
        F: Fn(&RasterExpr) -> RasterExpr,
    {
        Self {
            terms: self
                .terms
                .iter()
                .map(|t| FactorTerm::new(t.name.clone(), f(&t.raster), t.exponent))
                .collect(),
        }
    }

    pub fn expression(&self) -> RasterExpr {
        RasterExpr::weighted_product(
            self.terms
                .iter()
                .map(|t| WeightedTerm {
                    raster: t.raster.clone(),
                    exponent: t.exponent,
                })
                .collect(),
        )
    }
}

/// Per-pixel weighted product of `(value, exponent)` pairs.
///
/// Returns `None` (masked) for a missing factor, a negative base under a
/// fractional exponent, a zero base under a negative exponent, or any
/// non-finite product. A zero base under a positive exponent gives zero.
pub fn combine(terms: &[(f64, f64)]) -> Option<f64> {
    let mut product = 1.0;
    let mut zero = false;
    for &(value, exponent) in terms {
        if value.is_nan() {
            return None;
        }
        if value == 0.0 {
            if exponent < 0.0 {
                return None;
            }
            if exponent > 0.0 {
                zero = true;
            }
            continue;
        }
        if value < 0.0 && exponent.fract() != 0.0 {
            return None;
        }
        product *= value.powf(exponent);
    }
    if zero {
        return Some(0.0);
    }
    product.is_finite().then_some(product)
}

/// Runs factors through normalize, compose, normalize, classify, then the
/// optional reproject and clip stages.
#[derive(Debug, Clone)]
pub struct IndexComposer {
    label: String,
    formula: CompositeFormula,
    classes: ThresholdTable,
    normalizer: NoDataNormalizer,
    reference: Option<RasterExpr>,
    clip: Option<Region>,
}

impl IndexComposer {
    pub fn new(label: impl Into<String>, formula: CompositeFormula, classes: ThresholdTable) -> Self {
        Self {
            label: label.into(),
            formula,
            classes,
            normalizer: NoDataNormalizer::default(),
            reference: None,
            clip: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: NoDataNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn reproject_like(mut self, reference: RasterExpr) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn clip_to(mut self, region: Region) -> Self {
        self.clip = Some(region);
        self
    }

    pub fn formula(&self) -> &CompositeFormula {
        &self.formula
    }

    /// The unclassified composite, after both normalization passes.
    pub fn composite(&self) -> RasterExpr {
        debug!(
            "{}: normalizing {} factors ({})",
            self.label,
            self.formula.terms().len(),
            self.formula.names().join(", ")
        );
        let normalized = self.formula.map_factors(|r| self.normalizer.apply(r));

        debug!("{}: composing weighted product", self.label);
        let product = normalized.expression();

        debug!("{}: normalizing composite", self.label);
        self.normalizer.apply(&product)
    }

    pub fn compose(&self) -> Result<RasterExpr> {
        let composite = self.composite();

        debug!(
            "{}: classifying composite into {} rules",
            self.label,
            self.classes.rules().len()
        );
        let mut out = self
            .classes
            .classify(&composite, self.normalizer.canonical)?
            .rename(self.label.as_str());

        if let Some(reference) = &self.reference {
            debug!("{}: reprojecting onto reference grid", self.label);
            out = out.reproject_like(reference);
        }
        if let Some(region) = &self.clip {
            debug!("{}: clipping to region ({:?} edges)", self.label, region.edges());
            out = out.clip(region);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_geometric_mean() {
        let v = combine(&[(2.0, 0.5), (8.0, 0.5)]).unwrap();
        assert_relative_eq!(v, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_factor_order_does_not_change_product() {
        let a = combine(&[(1.2, 1.0 / 3.0), (2.0, 1.0 / 3.0), (1.4, 1.0 / 3.0)]).unwrap();
        let b = combine(&[(1.4, 1.0 / 3.0), (1.2, 1.0 / 3.0), (2.0, 1.0 / 3.0)]).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_factor_short_circuits() {
        assert_eq!(combine(&[(0.0, 0.5), (4.0, 0.5)]), Some(0.0));
        assert_eq!(combine(&[(0.0, -0.5), (4.0, 0.5)]), None);
    }

    #[test]
    fn test_negative_base_fractional_exponent_masked() {
        assert_eq!(combine(&[(-2.0, 0.5)]), None);
        assert_eq!(combine(&[(-2.0, 2.0)]), Some(4.0));
    }

    #[test]
    fn test_missing_factor_masks_pixel() {
        assert_eq!(combine(&[(f64::NAN, 0.5), (2.0, 0.5)]), None);
    }

    #[test]
    fn test_formula_validation() {
        assert!(CompositeFormula::new(vec![]).is_err());

        let r = RasterExpr::image("x");
        let dup = vec![
            FactorTerm::new("a", r.clone(), 0.5),
            FactorTerm::new("a", r.clone(), 0.5),
        ];
        assert!(CompositeFormula::new(dup).is_err());

        let nan = vec![FactorTerm::new("a", r, f64::NAN)];
        assert!(CompositeFormula::new(nan).is_err());
    }

    #[test]
    fn test_equal_weights() {
        let r = RasterExpr::image("x");
        let f = CompositeFormula::equal_weights(vec![
            ("a".into(), r.clone()),
            ("b".into(), r.clone()),
            ("c".into(), r.clone()),
            ("d".into(), r),
        ])
        .unwrap();
        for t in f.terms() {
            assert_relative_eq!(t.exponent, 0.25);
        }
    }
}
