//! Band-wise pixel operations
//!
//! Every operation here follows the same masking rule: a NaN input cell
//! yields a NaN output cell unless the operation says otherwise.

use super::spatial;
use crate::classify::{combine, RemapTable};
use crate::maybe_rayon::map_cells;
use aridex_core::{Error, Image, Raster, Result};
use tracing::debug;

/// Result of evaluating one node
#[derive(Debug, Clone)]
pub(crate) enum Value {
    /// A scalar with no grid; it takes the grid of whatever it meets
    Constant(f64),
    /// Pixel area in m², likewise grid-less until combined
    PixelArea,
    Image(Image),
}

impl Value {
    /// Turn a grid-less value into an image on `grid`.
    pub(crate) fn on_grid(&self, grid: &Raster) -> Image {
        match self {
            Value::Constant(v) => Image::single("constant", grid.like(*v)),
            Value::PixelArea => Image::single("area", spatial::pixel_area(grid)),
            Value::Image(image) => image.clone(),
        }
    }

    pub(crate) fn into_image(self, what: &str) -> Result<Image> {
        match self {
            Value::Image(image) => Ok(image),
            _ => Err(Error::Other(format!("{} needs an image, got a grid-less value", what))),
        }
    }
}

/// Both grids must describe the same cells before pixels are paired.
pub(crate) fn check_grid(a: &Raster, b: &Raster) -> Result<()> {
    if !aridex_core::crs::compatible(a.crs(), b.crs()) {
        let name = |r: &Raster| r.crs().map_or("unknown".to_string(), |c| c.identifier());
        return Err(Error::CrsMismatch(name(a), name(b)));
    }
    if !a.same_grid(b) {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

/// Apply `f` to every cell of every band.
pub(crate) fn map_value<F>(value: Value, f: F) -> Result<Value>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    match value {
        Value::Constant(v) => Ok(Value::Constant(f(v))),
        Value::PixelArea => Err(Error::Other("pixel area needs a grid before it can be transformed".into())),
        Value::Image(image) => Ok(Value::Image(image.map_bands(|r| map_raster(r, &f))?)),
    }
}

pub(crate) fn map_raster<F>(raster: &Raster, f: F) -> Result<Raster>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    let data = raster.data();
    raster.with_data(map_cells(raster.rows(), raster.cols(), |row, col| f(data[[row, col]])))
}

/// Pair two values cell by cell.
///
/// Grid-less values broadcast onto the image they meet. Images pair band by
/// band; a single-band image broadcasts across a multi-band one. Band names
/// come from the side with more bands, the left side on a tie.
pub(crate) fn zip_values<F>(lhs: Value, rhs: Value, f: F) -> Result<Value>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    let (lhs, rhs) = match (lhs, rhs) {
        (Value::Constant(a), Value::Constant(b)) => return Ok(Value::Constant(f(a, b))),
        (Value::Image(a), Value::Image(b)) => (a, b),
        (Value::Image(a), other) => {
            let b = other.on_grid(a.first());
            (a, b)
        }
        (other, Value::Image(b)) => {
            let a = other.on_grid(b.first());
            (a, b)
        }
        _ => {
            return Err(Error::Other(
                "pixel area must be combined with an image that supplies a grid".into(),
            ))
        }
    };
    check_grid(lhs.first(), rhs.first())?;

    let (n, m) = (lhs.band_count(), rhs.band_count());
    if n != m && n != 1 && m != 1 {
        return Err(Error::Other(format!("cannot pair {} bands with {} bands", n, m)));
    }
    let names = if m > n { rhs.band_names() } else { lhs.band_names() };
    let a_bands: Vec<&Raster> = lhs.bands().map(|(_, r)| r).collect();
    let b_bands: Vec<&Raster> = rhs.bands().map(|(_, r)| r).collect();

    let bands = names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let a = a_bands[i.min(n - 1)];
            let b = b_bands[i.min(m - 1)];
            let (ad, bd) = (a.data(), b.data());
            let out = a.with_data(map_cells(a.rows(), a.cols(), |row, col| {
                f(ad[[row, col]], bd[[row, col]])
            }))?;
            Ok((name, out))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Image(Image::from_bands(bands)?))
}

/// Replace categorical codes through `table`, honouring its miss policy.
pub(crate) fn remap(value: Value, table: &RemapTable) -> Result<Value> {
    let image = match value {
        Value::Constant(code) if code.is_nan() => return Ok(Value::Constant(code)),
        Value::Constant(code) => {
            return Ok(Value::Constant(table.resolve(code)?.unwrap_or(f64::NAN)));
        }
        other => other.into_image("remap")?,
    };

    let mut misses = 0usize;
    for (_, band) in image.bands() {
        for &code in band.data().iter().filter(|v| !v.is_nan()) {
            if table.lookup(code).is_none() {
                // Fail policy surfaces here, before any output is built
                table.resolve(code)?;
                misses += 1;
            }
        }
    }
    if misses > 0 {
        debug!(
            "remap: {} pixels carry codes outside the table ({:?} policy)",
            misses,
            table.miss_policy()
        );
    }

    let remapped = image.map_bands(|r| {
        map_raster(r, |code| {
            if code.is_nan() {
                return f64::NAN;
            }
            table.resolve(code).ok().flatten().unwrap_or(f64::NAN)
        })
    })?;
    Ok(Value::Image(remapped))
}

/// Per-pixel `∏ vᵢ ^ eᵢ` over aligned terms.
pub(crate) fn weighted_product(values: Vec<(Value, f64)>) -> Result<Value> {
    let grid = values.iter().find_map(|(v, _)| match v {
        Value::Image(image) => Some(image.first().clone()),
        _ => None,
    });
    let Some(grid) = grid else {
        let scalars = values
            .iter()
            .map(|(v, e)| match v {
                Value::Constant(c) => Ok((*c, *e)),
                _ => Err(Error::Other("pixel area in a product needs an image factor".into())),
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(Value::Constant(combine(&scalars).unwrap_or(f64::NAN)));
    };

    let images: Vec<(Image, f64)> = values.iter().map(|(v, e)| (v.on_grid(&grid), *e)).collect();
    for (image, _) in &images {
        check_grid(&grid, image.first())?;
    }
    let n = images.iter().map(|(i, _)| i.band_count()).max().unwrap_or(1);
    if let Some((bad, _)) = images.iter().find(|(i, _)| i.band_count() != 1 && i.band_count() != n) {
        return Err(Error::Other(format!(
            "cannot combine a {}-band factor with {}-band factors",
            bad.band_count(),
            n
        )));
    }
    let names = images
        .iter()
        .find(|(i, _)| i.band_count() == n)
        .map(|(i, _)| i.band_names())
        .unwrap_or_default();

    let bands = names
        .into_iter()
        .enumerate()
        .map(|(b, name)| {
            let layers: Vec<(&Raster, f64)> = images
                .iter()
                .map(|(img, e)| {
                    let idx = b.min(img.band_count() - 1);
                    (img.bands().nth(idx).map(|(_, r)| r).unwrap_or(img.first()), *e)
                })
                .collect();
            let out = grid.with_data(map_cells(grid.rows(), grid.cols(), |row, col| {
                let terms: Vec<(f64, f64)> = layers
                    .iter()
                    .map(|(r, e)| (r.data()[[row, col]], *e))
                    .collect();
                combine(&terms).unwrap_or(f64::NAN)
            }))?;
            Ok((name, out))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Image(Image::from_bands(bands)?))
}

/// `(a − b) / (a + b)`, masked where the sum is zero.
pub(crate) fn normalized_difference(image: &Image, first: &str, second: &str) -> Result<Image> {
    let a = image.band(first)?;
    let b = image.band(second)?;
    let (ad, bd) = (a.data(), b.data());
    let nd = a.with_data(map_cells(a.rows(), a.cols(), |row, col| {
        let (x, y) = (ad[[row, col]], bd[[row, col]]);
        let sum = x + y;
        if x.is_nan() || y.is_nan() || sum.abs() < f64::EPSILON {
            f64::NAN
        } else {
            (x - y) / sum
        }
    }))?;
    Ok(Image::single("nd", nd))
}
