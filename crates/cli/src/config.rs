//! The JSON run file: region, dataset overrides and per-index parameters.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use aridex_algorithms::classify::NoDataNormalizer;
use aridex_algorithms::datasets::DatasetRegistry;
use aridex_algorithms::indices::{
    climate_quality, forest_cover, forest_fire, forest_gain, forest_loss, management_quality,
    soil_quality, vegetation_quality, ClimateParams, FireParams, ForestCoverParams, IndexContext,
    ManagementParams, SoilParams, VegetationParams,
};
use aridex_algorithms::result::IndexResult;
use aridex_core::{EdgeMode, Region};
use clap::ValueEnum;
use serde::Deserialize;

/// Index functions the binary can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum IndexKind {
    Climate,
    Soil,
    Vegetation,
    Management,
    ForestLoss,
    ForestGain,
    ForestCover,
    Fire,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegionConfig {
    /// Polygon rings, outer ring first, as `[x, y]` pairs
    pub rings: Vec<Vec<[f64; 2]>>,
    /// Great-circle edges (longitude/latitude) or straight planar edges
    #[serde(default = "default_geodesic")]
    pub geodesic: bool,
}

fn default_geodesic() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForestConfig {
    pub loss_year: Option<i32>,
    pub cover: Option<ForestCoverParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub region: RegionConfig,
    /// Dataset key → asset id
    #[serde(default)]
    pub datasets: BTreeMap<String, String>,
    pub normalizer: Option<NoDataNormalizer>,
    pub climate: Option<ClimateParams>,
    pub soil: Option<SoilParams>,
    pub vegetation: Option<VegetationParams>,
    pub management: Option<ManagementParams>,
    #[serde(default)]
    pub forest: ForestConfig,
    pub fire: Option<FireParams>,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("Invalid run file {}", path.display()))
    }

    pub fn context(&self) -> Result<IndexContext> {
        let edges = if self.region.geodesic {
            EdgeMode::Geodesic
        } else {
            EdgeMode::Planar
        };
        let region = Region::from_rings(self.region.rings.clone(), edges).context("Invalid region")?;
        let registry = DatasetRegistry::global()
            .with_overrides(&self.datasets)
            .context("Invalid dataset override")?;
        let mut ctx = IndexContext::new(region).with_registry(registry);
        if let Some(normalizer) = &self.normalizer {
            ctx = ctx.with_normalizer(normalizer.clone());
        }
        Ok(ctx)
    }

    /// Build the graph for `kind` from its section of the run file.
    pub fn build(&self, kind: IndexKind) -> Result<IndexResult> {
        let ctx = self.context()?;
        let result = match kind {
            IndexKind::Climate => climate_quality(&ctx, section(&self.climate, "climate")?),
            IndexKind::Soil => soil_quality(&ctx, section(&self.soil, "soil")?),
            IndexKind::Vegetation => vegetation_quality(&ctx, section(&self.vegetation, "vegetation")?),
            IndexKind::Management => management_quality(&ctx, section(&self.management, "management")?),
            IndexKind::ForestLoss => forest_loss(&ctx, *section(&self.forest.loss_year, "forest.loss_year")?),
            IndexKind::ForestGain => forest_gain(&ctx),
            IndexKind::ForestCover => forest_cover(&ctx, section(&self.forest.cover, "forest.cover")?),
            IndexKind::Fire => forest_fire(&ctx, section(&self.fire, "fire")?),
        };
        result.with_context(|| format!("Failed to build {:?} index", kind))
    }
}

fn section<'a, T>(value: &'a Option<T>, name: &str) -> Result<&'a T> {
    match value {
        Some(v) => Ok(v),
        None => bail!("run file has no '{}' section", name),
    }
}
