//! Dataset identifiers
//!
//! Every index names its inputs through a [`Dataset`] key. The default
//! identifiers live in one immutable registry built on first use; a
//! deployment that mirrors assets elsewhere derives a new registry with
//! [`DatasetRegistry::with_override`] instead of touching the shared one.

use aridex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    /// Bioclimatic variables (`bio12` is annual precipitation, mm)
    WorldClimBio,
    /// 1 arc-second elevation
    Srtm,
    Era5Monthly,
    TerraClimate,
    /// Yearly ESA CCI land cover, one `y<year>` band per year
    EsaCciLandCover,
    GpwPopulationDensity,
    ProbaVToc,
    HansenForestChange,
    Sentinel2,
    Landsat8Sr,
    ParentMaterial,
    Slope,
    SoilTexture,
    RockFragments,
    SoilDrainage,
}

impl Dataset {
    pub const ALL: [Dataset; 15] = [
        Dataset::WorldClimBio,
        Dataset::Srtm,
        Dataset::Era5Monthly,
        Dataset::TerraClimate,
        Dataset::EsaCciLandCover,
        Dataset::GpwPopulationDensity,
        Dataset::ProbaVToc,
        Dataset::HansenForestChange,
        Dataset::Sentinel2,
        Dataset::Landsat8Sr,
        Dataset::ParentMaterial,
        Dataset::Slope,
        Dataset::SoilTexture,
        Dataset::RockFragments,
        Dataset::SoilDrainage,
    ];

    /// Asset id on the public platform
    pub fn default_id(self) -> &'static str {
        match self {
            Dataset::WorldClimBio => "WORLDCLIM/V1/BIO",
            Dataset::Srtm => "USGS/SRTMGL1_003",
            Dataset::Era5Monthly => "ECMWF/ERA5/MONTHLY",
            Dataset::TerraClimate => "IDAHO_EPSCOR/TERRACLIMATE",
            Dataset::EsaCciLandCover => "users/geflanddegradation/toolbox_datasets/lcov_esacc_1992_2018",
            Dataset::GpwPopulationDensity => "CIESIN/GPWv411/GPW_Population_Density",
            Dataset::ProbaVToc => "VITO/PROBAV/C1/S1_TOC_100M",
            Dataset::HansenForestChange => "UMD/hansen/global_forest_change_2019_v1_7",
            Dataset::Sentinel2 => "COPERNICUS/S2",
            Dataset::Landsat8Sr => "LANDSAT/LC08/C01/T1_SR",
            Dataset::ParentMaterial => "users/miswagrace/parent_material_northafrica",
            Dataset::Slope => "users/miswagrace/slope_north_africa",
            Dataset::SoilTexture => "users/miswagrace/texture_north_africa",
            Dataset::RockFragments => "users/miswagrace/rock_fragment_north_africa",
            Dataset::SoilDrainage => "users/miswagrace/drainage_northafrica",
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Dataset::WorldClimBio => "world_clim_bio",
            Dataset::Srtm => "srtm",
            Dataset::Era5Monthly => "era5_monthly",
            Dataset::TerraClimate => "terra_climate",
            Dataset::EsaCciLandCover => "esa_cci_land_cover",
            Dataset::GpwPopulationDensity => "gpw_population_density",
            Dataset::ProbaVToc => "proba_v_toc",
            Dataset::HansenForestChange => "hansen_forest_change",
            Dataset::Sentinel2 => "sentinel2",
            Dataset::Landsat8Sr => "landsat8_sr",
            Dataset::ParentMaterial => "parent_material",
            Dataset::Slope => "slope",
            Dataset::SoilTexture => "soil_texture",
            Dataset::RockFragments => "rock_fragments",
            Dataset::SoilDrainage => "soil_drainage",
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dataset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Dataset::ALL
            .into_iter()
            .find(|d| d.key() == s)
            .ok_or_else(|| Error::UnknownDataset(s.to_string()))
    }
}

/// Dataset key → asset id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRegistry {
    ids: BTreeMap<Dataset, String>,
}

static DEFAULT_REGISTRY: LazyLock<DatasetRegistry> = LazyLock::new(|| DatasetRegistry {
    ids: Dataset::ALL
        .into_iter()
        .map(|d| (d, d.default_id().to_string()))
        .collect(),
});

impl DatasetRegistry {
    /// The shared default registry
    pub fn global() -> &'static DatasetRegistry {
        &DEFAULT_REGISTRY
    }

    pub fn id(&self, dataset: Dataset) -> &str {
        self.ids
            .get(&dataset)
            .map(String::as_str)
            .unwrap_or_else(|| dataset.default_id())
    }

    /// A new registry with `dataset` pointing at `id`.
    pub fn with_override(&self, dataset: Dataset, id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::config("dataset registry", format!("empty id for {}", dataset)));
        }
        let mut ids = self.ids.clone();
        ids.insert(dataset, id);
        Ok(Self { ids })
    }

    /// Apply `key → id` overrides such as those read from a run file.
    pub fn with_overrides<'a, I>(&self, overrides: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a String, &'a String)>,
    {
        overrides
            .into_iter()
            .try_fold(self.clone(), |registry, (key, id)| {
                registry.with_override(key.parse()?, id.clone())
            })
    }

    pub fn entries(&self) -> impl Iterator<Item = (Dataset, &str)> {
        self.ids.iter().map(|(d, id)| (*d, id.as_str()))
    }
}

impl Default for DatasetRegistry {
    fn default() -> Self {
        Self::global().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_registry_has_every_dataset() {
        let registry = DatasetRegistry::global();
        assert_eq!(registry.entries().count(), Dataset::ALL.len());
        assert_eq!(registry.id(Dataset::Srtm), "USGS/SRTMGL1_003");
    }

    #[test]
    fn test_override_leaves_global_untouched() {
        let custom = DatasetRegistry::global()
            .with_override(Dataset::Srtm, "mirror/srtm")
            .unwrap();
        assert_eq!(custom.id(Dataset::Srtm), "mirror/srtm");
        assert_eq!(DatasetRegistry::global().id(Dataset::Srtm), "USGS/SRTMGL1_003");
    }

    #[test]
    fn test_overrides_by_key() {
        let map: BTreeMap<String, String> =
            [("sentinel2".to_string(), "COPERNICUS/S2_SR".to_string())].into();
        let custom = DatasetRegistry::global().with_overrides(&map).unwrap();
        assert_eq!(custom.id(Dataset::Sentinel2), "COPERNICUS/S2_SR");

        let bad: BTreeMap<String, String> = [("nope".to_string(), "x".to_string())].into();
        assert!(DatasetRegistry::global().with_overrides(&bad).is_err());
    }

    #[test]
    fn test_keys_round_trip() {
        for d in Dataset::ALL {
            assert_eq!(d.key().parse::<Dataset>().unwrap(), d);
        }
    }
}
