//! Multi-band images

use crate::error::{Error, Result};
use crate::raster::Raster;

/// An ordered set of named bands sharing one grid.
#[derive(Debug, Clone)]
pub struct Image {
    bands: Vec<(String, Raster)>,
}

impl Image {
    /// Single-band image
    pub fn single(name: impl Into<String>, raster: Raster) -> Self {
        Self {
            bands: vec![(name.into(), raster)],
        }
    }

    /// Build from named bands; every band must sit on the first band's grid.
    pub fn from_bands(bands: Vec<(String, Raster)>) -> Result<Self> {
        let Some((_, first)) = bands.first() else {
            return Err(Error::Other("an image needs at least one band".into()));
        };
        for (_, raster) in &bands[1..] {
            if !first.same_grid(raster) {
                return Err(Error::SizeMismatch {
                    er: first.rows(),
                    ec: first.cols(),
                    ar: raster.rows(),
                    ac: raster.cols(),
                });
            }
        }
        Ok(Self { bands })
    }

    /// Append a band on the same grid
    pub fn add_band(&mut self, name: impl Into<String>, raster: Raster) -> Result<()> {
        let first = self.first();
        if !first.same_grid(&raster) {
            return Err(Error::SizeMismatch {
                er: first.rows(),
                ec: first.cols(),
                ar: raster.rows(),
                ac: raster.cols(),
            });
        }
        self.bands.push((name.into(), raster));
        Ok(())
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn band_names(&self) -> Vec<String> {
        self.bands.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Band by name
    pub fn band(&self, name: &str) -> Result<&Raster> {
        self.bands
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, r)| r)
            .ok_or_else(|| Error::UnknownBand {
                band: name.to_string(),
                available: self.band_names(),
            })
    }

    /// First band; every image has one.
    pub fn first(&self) -> &Raster {
        &self.bands[0].1
    }

    pub fn bands(&self) -> impl Iterator<Item = (&str, &Raster)> {
        self.bands.iter().map(|(n, r)| (n.as_str(), r))
    }

    pub fn into_bands(self) -> Vec<(String, Raster)> {
        self.bands
    }

    /// Keep the listed bands, in the listed order.
    pub fn select(&self, names: &[String]) -> Result<Image> {
        let bands = names
            .iter()
            .map(|name| Ok((name.clone(), self.band(name)?.clone())))
            .collect::<Result<Vec<_>>>()?;
        Image::from_bands(bands)
    }

    /// Rename every band; a multi-band image gets `name`, `name_1`, ...
    pub fn renamed(mut self, name: &str) -> Image {
        for (i, (n, _)) in self.bands.iter_mut().enumerate() {
            *n = if i == 0 { name.to_string() } else { format!("{}_{}", name, i) };
        }
        self
    }

    /// Apply `f` to every band, keeping names.
    pub fn map_bands<F>(&self, mut f: F) -> Result<Image>
    where
        F: FnMut(&Raster) -> Result<Raster>,
    {
        let bands = self
            .bands
            .iter()
            .map(|(n, r)| Ok((n.clone(), f(r)?)))
            .collect::<Result<Vec<_>>>()?;
        Image::from_bands(bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_rename() {
        let mut img = Image::single("B5", Raster::filled(2, 2, 0.5));
        img.add_band("B7", Raster::filled(2, 2, 0.2)).unwrap();

        let sel = img.select(&["B7".to_string()]).unwrap();
        assert_eq!(sel.band_names(), vec!["B7"]);
        assert_eq!(sel.first().get(0, 0).unwrap(), 0.2);

        let renamed = img.renamed("nbr");
        assert_eq!(renamed.band_names(), vec!["nbr", "nbr_1"]);
    }

    #[test]
    fn test_unknown_band() {
        let img = Image::single("bio12", Raster::new(2, 2));
        assert!(matches!(img.band("bio1"), Err(Error::UnknownBand { .. })));
    }

    #[test]
    fn test_mismatched_band_rejected() {
        let mut img = Image::single("a", Raster::new(2, 2));
        assert!(img.add_band("b", Raster::new(3, 2)).is_err());
    }
}
