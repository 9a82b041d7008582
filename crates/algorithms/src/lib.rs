//! # aridex algorithms
//!
//! Desertification-risk indices as declarative raster graphs.
//!
//! ## Layout
//!
//! - **graph**: the expression tree (`RasterExpr`) that index functions build
//! - **classify**: threshold classification, categorical remapping, no-data
//!   normalization and weighted-product composition
//! - **indices**: climate, soil, vegetation and management quality; forest
//!   loss, gain and cover; burn severity
//! - **eval**: a local reference evaluator for graphs over in-memory rasters
//! - **datasets**: dataset identifiers and the shared registry
//! - **result**: `IndexResult`, the tagged output of an index function

pub mod classify;
pub mod datasets;
pub mod eval;
pub mod graph;
pub mod indices;
pub(crate) mod maybe_rayon;
pub mod result;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classify::{
        CompositeFormula, Edge, FactorTerm, IndexComposer, Interval, MissPolicy, NoDataNormalizer,
        RemapTable, ThresholdRule, ThresholdTable,
    };
    pub use crate::datasets::{Dataset, DatasetRegistry};
    pub use crate::eval::{DatasetProvider, LocalEvaluator, MemoryCatalog, Scene};
    pub use crate::graph::{CollectionQuery, DateRange, RasterExpr, Reducer, SceneMask};
    pub use crate::indices::{
        climate_quality, forest_cover, forest_fire, forest_gain, forest_loss, management_quality,
        soil_quality, vegetation_quality, ClimateParams, ClimateVariant, DepthPolicy, FireParams,
        ForestCoverParams, IndexContext, ManagementParams, Platform, SoilParams, VegetationParams,
    };
    pub use crate::result::{BandInfo, IndexResult, Layer};
    pub use aridex_core::prelude::*;
}
