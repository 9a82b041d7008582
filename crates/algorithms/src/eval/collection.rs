//! Filtering, cloud masking and reduction of scene collections

use super::pixel::check_grid;
use super::Scene;
use crate::graph::{CollectionQuery, Reducer, SceneMask};
use crate::maybe_rayon::map_cells;
use aridex_core::{Error, Image, Raster, Result};
use tracing::{debug, warn};

/// Collapse `scenes` into one image as `query` describes.
pub(crate) fn reduce(mut scenes: Vec<Scene>, query: &CollectionQuery) -> Result<Image> {
    let total = scenes.len();
    if let Some(dates) = &query.dates {
        scenes.retain(|s| dates.contains(s.date));
    }
    if let Some(region) = &query.bounds {
        scenes.retain(|s| region.intersects_bounds(s.image.first().bounds()));
    }
    scenes.sort_by_key(|s| s.date);
    debug!(
        "{}: {} of {} scenes pass the filters",
        query.dataset,
        scenes.len(),
        total
    );
    if scenes.is_empty() {
        warn!("{}: no scenes left after filtering", query);
        return Err(Error::Other(format!(
            "collection {} is empty after filtering",
            query.dataset
        )));
    }

    let images = match &query.scene_mask {
        Some(mask) => scenes
            .iter()
            .map(|s| mask_scene(&s.image, mask))
            .collect::<Result<Vec<_>>>()?,
        None => scenes.into_iter().map(|s| s.image).collect(),
    };

    match query.reducer {
        Reducer::First => nth(images, 0, query),
        Reducer::Nth { index } => nth(images, index, query),
        Reducer::Max => fold_scenes(&images, |acc, v| acc.max(v)),
        Reducer::Sum => fold_scenes(&images, |acc, v| acc + v),
        Reducer::Mosaic => fold_scenes(&images, |_, v| v),
    }
}

fn nth(images: Vec<Image>, index: usize, query: &CollectionQuery) -> Result<Image> {
    let count = images.len();
    images.into_iter().nth(index).ok_or_else(|| {
        Error::Other(format!(
            "collection {} has {} scenes, no scene {}",
            query.dataset, count, index
        ))
    })
}

/// Mask pixels whose QA band has any listed bit set.
fn mask_scene(image: &Image, mask: &SceneMask) -> Result<Image> {
    let qa = image.band(&mask.qa_band)?;
    let bits = mask.bit_mask();
    let qd = qa.data();
    let bands = image
        .bands()
        .filter(|(name, _)| mask.keep_qa || *name != mask.qa_band)
        .map(|(name, band)| {
            let bd = band.data();
            let masked = band.with_data(map_cells(band.rows(), band.cols(), |row, col| {
                let flags = qd[[row, col]];
                if flags.is_nan() || (flags as i64 as u64) & bits != 0 {
                    f64::NAN
                } else {
                    bd[[row, col]]
                }
            }))?;
            Ok((name.to_string(), masked))
        })
        .collect::<Result<Vec<_>>>()?;
    Image::from_bands(bands)
}

/// Per-pixel fold over valid samples in date order; all-masked stays masked.
fn fold_scenes<F>(images: &[Image], f: F) -> Result<Image>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    let first = &images[0];
    for image in &images[1..] {
        check_grid(first.first(), image.first())?;
    }
    let bands = first
        .bands()
        .map(|(name, template)| {
            let layers = images
                .iter()
                .map(|img| img.band(name))
                .collect::<Result<Vec<&Raster>>>()?;
            let out = template.with_data(map_cells(template.rows(), template.cols(), |row, col| {
                layers
                    .iter()
                    .map(|r| r.data()[[row, col]])
                    .filter(|v| !v.is_nan())
                    .fold(None, |acc, v| Some(acc.map_or(v, |a| f(a, v))))
                    .unwrap_or(f64::NAN)
            }))?;
            Ok((name.to_string(), out))
        })
        .collect::<Result<Vec<_>>>()?;
    Image::from_bands(bands)
}
