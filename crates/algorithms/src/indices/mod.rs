//! Desertification-risk index functions
//!
//! Each function is a configuration of the same pipeline: fetch factor
//! rasters, reclassify each one, compose them with a weighted product and
//! bucket the composite into three classes. The forest functions take the
//! shorter area path instead (see [`area`]).

pub mod area;
pub mod climate;
pub mod fire;
pub mod forest;
pub mod landcover;
pub mod management;
pub mod soil;
pub mod vegetation;

pub use climate::{climate_quality, ClimateParams, ClimateVariant};
pub use fire::{forest_fire, FireParams, Platform};
pub use forest::{forest_cover, forest_gain, forest_loss, ForestCoverParams};
pub use management::{management_quality, ManagementParams};
pub use soil::{soil_quality, DepthPolicy, SoilParams};
pub use vegetation::{vegetation_quality, VegetationParams};

use crate::classify::{CompositeFormula, FactorTerm, IndexComposer, NoDataNormalizer, RemapTable, ThresholdTable};
use crate::datasets::{Dataset, DatasetRegistry};
use crate::graph::RasterExpr;
use aridex_core::{Error, Region, Result};

/// What every index function needs besides its own parameters
#[derive(Debug, Clone)]
pub struct IndexContext {
    pub region: Region,
    pub registry: DatasetRegistry,
    pub normalizer: NoDataNormalizer,
}

impl IndexContext {
    pub fn new(region: Region) -> Self {
        Self {
            region,
            registry: DatasetRegistry::default(),
            normalizer: NoDataNormalizer::default(),
        }
    }

    pub fn with_registry(mut self, registry: DatasetRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_normalizer(mut self, normalizer: NoDataNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn image(&self, dataset: Dataset) -> RasterExpr {
        RasterExpr::image(self.registry.id(dataset))
    }

    pub fn dataset_id(&self, dataset: Dataset) -> &str {
        self.registry.id(dataset)
    }
}

/// How one factor's raw raster becomes a factor weight
#[derive(Debug, Clone)]
pub enum Reclass {
    /// Already a weight
    Identity,
    Threshold(ThresholdTable),
    /// Remap codes, then divide by `divisor`
    Remap { table: RemapTable, divisor: f64 },
    /// Stages applied in order
    Chain(Vec<Reclass>),
}

impl Reclass {
    pub fn remap(table: RemapTable) -> Self {
        Reclass::Remap { table, divisor: 1.0 }
    }

    pub fn apply(&self, source: &RasterExpr, sentinel: f64) -> Result<RasterExpr> {
        match self {
            Reclass::Identity => Ok(source.clone()),
            Reclass::Threshold(table) => table.classify(source, sentinel),
            Reclass::Remap { table, divisor } => {
                if *divisor == 0.0 || !divisor.is_finite() {
                    return Err(Error::config("remap", format!("divisor {} is unusable", divisor)));
                }
                let remapped = table.apply(source);
                Ok(if *divisor == 1.0 { remapped } else { remapped.divide(*divisor) })
            }
            Reclass::Chain(stages) => stages
                .iter()
                .try_fold(source.clone(), |acc, stage| stage.apply(&acc, sentinel)),
        }
    }
}

/// A named input of a composite index
#[derive(Debug, Clone)]
pub struct Factor {
    pub name: String,
    pub source: RasterExpr,
    pub reclass: Reclass,
    /// Resample onto the index's reference grid before composing
    pub align: bool,
}

impl Factor {
    pub fn new(name: impl Into<String>, source: RasterExpr, reclass: Reclass) -> Self {
        Self {
            name: name.into(),
            source,
            reclass,
            align: false,
        }
    }

    pub fn aligned(mut self) -> Self {
        self.align = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub enum Weights {
    /// `1/N` for each of N factors
    #[default]
    Equal,
    /// One exponent per factor, in factor order
    Explicit(Vec<f64>),
}

/// Full description of one composite index
#[derive(Debug, Clone)]
pub struct CompositeIndexSpec {
    pub label: String,
    pub factors: Vec<Factor>,
    pub weights: Weights,
    pub classes: ThresholdTable,
    pub reference: Option<RasterExpr>,
    /// Also resample the classified output onto the reference grid
    pub reproject_output: bool,
    pub clip: Option<Region>,
}

impl CompositeIndexSpec {
    pub fn new(label: impl Into<String>, factors: Vec<Factor>, classes: ThresholdTable) -> Self {
        Self {
            label: label.into(),
            factors,
            weights: Weights::Equal,
            classes,
            reference: None,
            reproject_output: false,
            clip: None,
        }
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_reference(mut self, reference: RasterExpr) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn clipped_to(mut self, region: &Region) -> Self {
        self.clip = Some(region.clone());
        self
    }

    fn exponents(&self) -> Result<Vec<f64>> {
        let n = self.factors.len();
        match &self.weights {
            Weights::Equal if n == 0 => Err(Error::config(&self.label, "no factors")),
            Weights::Equal => Ok(vec![1.0 / n as f64; n]),
            Weights::Explicit(w) if w.len() != n => Err(Error::config(
                &self.label,
                format!("{} weights for {} factors", w.len(), n),
            )),
            Weights::Explicit(w) => Ok(w.clone()),
        }
    }

    /// Build the classified composite graph.
    pub fn build(&self, normalizer: &NoDataNormalizer) -> Result<RasterExpr> {
        let exponents = self.exponents()?;
        let terms = self
            .factors
            .iter()
            .zip(exponents)
            .map(|(factor, exponent)| {
                let mut raster = factor
                    .reclass
                    .apply(&factor.source, normalizer.canonical)?
                    .rename(factor.name.as_str());
                if factor.align {
                    let reference = self.reference.as_ref().ok_or_else(|| {
                        Error::config(&self.label, format!("factor '{}' needs a reference grid", factor.name))
                    })?;
                    raster = raster.reproject_like(reference);
                }
                Ok(FactorTerm::new(factor.name.clone(), raster, exponent))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut composer = IndexComposer::new(self.label.as_str(), CompositeFormula::new(terms)?, self.classes.clone())
            .with_normalizer(normalizer.clone());
        if self.reproject_output {
            if let Some(reference) = &self.reference {
                composer = composer.reproject_like(reference.clone());
            }
        }
        if let Some(region) = &self.clip {
            composer = composer.clip_to(region.clone());
        }
        composer.compose()
    }
}

/// Index functions and their named variants, for listings.
pub const PRESETS: &[(&str, &str)] = &[
    ("climate", "monthly_era5 (default): rainfall, field orientation, ERA5 aridity; cube root"),
    ("climate", "annual_terra_climate: TerraClimate precipitation and aridity index; square root"),
    ("soil", "shallow_high_index (default): depth <15 cm scores 4"),
    ("soil", "shallow_low_index: depth <15 cm scores 1"),
    ("vegetation", "fire risk, erosion protection, drought resistance, plant cover; fourth root"),
    ("management", "land use intensity, population density; square root"),
    ("forest-loss", "Hansen loss year x pixel area"),
    ("forest-gain", "Hansen 2000-2012 gain x pixel area"),
    ("forest-cover", "Hansen tree cover above a canopy threshold x pixel area"),
    ("fire", "sentinel2 (QA60 bits 10, 11; B8/B12) or landsat8 (pixel_qa bits 3-5; B5/B7)"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Interval;

    fn classes() -> ThresholdTable {
        ThresholdTable::from_pairs(&[(Interval::lt(1.5), 1.0), (Interval::ge(1.5), 2.0)]).unwrap()
    }

    #[test]
    fn test_explicit_weight_count_must_match() {
        let spec = CompositeIndexSpec::new(
            "x",
            vec![Factor::new("a", RasterExpr::image("a"), Reclass::Identity)],
            classes(),
        )
        .with_weights(Weights::Explicit(vec![0.5, 0.5]));
        assert!(spec.build(&NoDataNormalizer::default()).unwrap_err().is_configuration());
    }

    #[test]
    fn test_aligned_factor_needs_reference() {
        let spec = CompositeIndexSpec::new(
            "x",
            vec![Factor::new("a", RasterExpr::image("a"), Reclass::Identity).aligned()],
            classes(),
        );
        assert!(spec.build(&NoDataNormalizer::default()).is_err());
    }

    #[test]
    fn test_empty_spec_rejected() {
        let spec = CompositeIndexSpec::new("x", vec![], classes());
        assert!(spec.build(&NoDataNormalizer::default()).is_err());
    }
}
