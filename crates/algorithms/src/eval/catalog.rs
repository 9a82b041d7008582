//! In-memory dataset provider

use super::{DatasetProvider, Scene};
use aridex_core::{Error, Image, Result};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Datasets held in memory, keyed by dataset id.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    images: HashMap<String, Image>,
    collections: HashMap<String, Vec<Scene>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_image(&mut self, id: impl Into<String>, image: Image) {
        self.images.insert(id.into(), image);
    }

    pub fn insert_scene(&mut self, id: impl Into<String>, date: NaiveDate, image: Image) {
        self.collections
            .entry(id.into())
            .or_default()
            .push(Scene { date, image });
    }

    pub fn with_image(mut self, id: impl Into<String>, image: Image) -> Self {
        self.insert_image(id, image);
        self
    }

    pub fn with_scene(mut self, id: impl Into<String>, date: NaiveDate, image: Image) -> Self {
        self.insert_scene(id, date, image);
        self
    }

    /// Ids of every dataset held, sorted.
    pub fn dataset_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .images
            .keys()
            .chain(self.collections.keys())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

impl DatasetProvider for MemoryCatalog {
    fn image(&self, id: &str) -> Result<Image> {
        self.images
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownDataset(id.to_string()))
    }

    fn collection(&self, id: &str) -> Result<Vec<Scene>> {
        self.collections
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownDataset(id.to_string()))
    }
}
