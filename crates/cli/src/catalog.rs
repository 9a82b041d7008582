//! GeoTIFF catalog for local evaluation.
//!
//! `catalog.json` in the catalog directory maps asset ids to band files:
//!
//! ```json
//! {
//!   "images": {
//!     "USGS/SRTMGL1_003": { "epsg": 4326, "bands": [{ "name": "elevation", "file": "srtm.tif" }] }
//!   },
//!   "collections": {
//!     "ECMWF/ERA5/MONTHLY": { "epsg": 4326, "scenes": [
//!       { "date": "2019-06-01", "bands": [{ "name": "total_precipitation", "file": "tp_201906.tif" }] }
//!     ] }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use aridex_algorithms::eval::MemoryCatalog;
use aridex_core::io::read_geotiff;
use aridex_core::{Image, CRS};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct BandFile {
    name: String,
    file: String,
}

#[derive(Debug, Deserialize)]
struct ImageEntry {
    epsg: Option<u32>,
    nodata: Option<f64>,
    bands: Vec<BandFile>,
}

#[derive(Debug, Deserialize)]
struct SceneEntry {
    date: NaiveDate,
    bands: Vec<BandFile>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    epsg: Option<u32>,
    nodata: Option<f64>,
    scenes: Vec<SceneEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    images: BTreeMap<String, ImageEntry>,
    #[serde(default)]
    collections: BTreeMap<String, CollectionEntry>,
}

/// Load `dir/catalog.json` and every band file it names.
pub fn load_catalog(dir: &Path) -> Result<MemoryCatalog> {
    let index = dir.join("catalog.json");
    let text = std::fs::read_to_string(&index)
        .with_context(|| format!("Failed to read {}", index.display()))?;
    let file: CatalogFile =
        serde_json::from_str(&text).with_context(|| format!("Invalid catalog {}", index.display()))?;

    let mut catalog = MemoryCatalog::new();
    for (id, entry) in &file.images {
        let image = load_image(dir, &entry.bands, entry.epsg, entry.nodata)
            .with_context(|| format!("Failed to load image '{}'", id))?;
        catalog.insert_image(id.clone(), image);
    }
    for (id, entry) in &file.collections {
        for scene in &entry.scenes {
            let image = load_image(dir, &scene.bands, entry.epsg, entry.nodata)
                .with_context(|| format!("Failed to load scene {} of '{}'", scene.date, id))?;
            catalog.insert_scene(id.clone(), scene.date, image);
        }
    }
    debug!(
        "catalog: {} images, {} collections",
        file.images.len(),
        file.collections.len()
    );
    Ok(catalog)
}

fn load_image(dir: &Path, bands: &[BandFile], epsg: Option<u32>, nodata: Option<f64>) -> Result<Image> {
    let crs = epsg.map(CRS::from_epsg);
    let rasters = bands
        .iter()
        .map(|band| {
            let path = dir.join(&band.file);
            let raster = read_geotiff(&path, nodata)
                .with_context(|| format!("Failed to read {}", path.display()))?
                .with_crs(crs.clone());
            Ok((band.name.clone(), raster))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Image::from_bands(rasters)?)
}
