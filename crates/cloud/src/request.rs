//! Wire shape of a submission.

use aridex_algorithms::graph::RasterExpr;
use aridex_algorithms::result::{IndexResult, Layer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One layer as the service receives it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPayload {
    pub label: String,
    pub add_to_map: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub graph: RasterExpr,
}

impl From<&Layer> for LayerPayload {
    fn from(layer: &Layer) -> Self {
        Self {
            label: layer.info.name.clone(),
            add_to_map: layer.info.add_to_map,
            metadata: layer.info.metadata.clone(),
            graph: layer.graph.clone(),
        }
    }
}

/// Request body: `{ "layers": [...] }`, primary layer first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub layers: Vec<LayerPayload>,
}

impl SubmitRequest {
    pub fn from_result(result: &IndexResult) -> Self {
        Self {
            layers: result.layers().map(LayerPayload::from).collect(),
        }
    }

    /// Total node count over all layers, for logging.
    pub fn node_count(&self) -> usize {
        self.layers.iter().map(|l| l.graph.node_count()).sum()
    }
}

impl From<&IndexResult> for SubmitRequest {
    fn from(result: &IndexResult) -> Self {
        Self::from_result(result)
    }
}
