//! Wrapped index output

use crate::graph::RasterExpr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptive tags attached to one output layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandInfo {
    pub name: String,
    pub add_to_map: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl BandInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            add_to_map: true,
            metadata: BTreeMap::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.add_to_map = false;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// A raster graph and its tags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub info: BandInfo,
    pub graph: RasterExpr,
}

/// One primary layer plus auxiliary layers, fixed once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexResult {
    primary: Layer,
    #[serde(default)]
    auxiliary: Vec<Layer>,
}

impl IndexResult {
    pub fn new(graph: RasterExpr, info: BandInfo) -> Self {
        Self {
            primary: Layer { info, graph },
            auxiliary: Vec::new(),
        }
    }

    pub fn with_auxiliary(mut self, graph: RasterExpr, info: BandInfo) -> Self {
        self.auxiliary.push(Layer { info, graph });
        self
    }

    pub fn primary(&self) -> &Layer {
        &self.primary
    }

    pub fn auxiliary(&self) -> &[Layer] {
        &self.auxiliary
    }

    /// Primary first, then auxiliaries in insertion order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        std::iter::once(&self.primary).chain(&self.auxiliary)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
