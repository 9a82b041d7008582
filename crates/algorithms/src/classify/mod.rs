//! Reclassification primitives
//!
//! Threshold classification, categorical remapping, no-data normalization
//! and weighted-product composition. All of them build graph nodes; the
//! pixel semantics live in [`crate::eval`].

pub mod composite;
pub mod nodata;
pub mod remap;
pub mod threshold;

pub use composite::{combine, CompositeFormula, FactorTerm, IndexComposer};
pub use nodata::{NoDataNormalizer, CANONICAL_NODATA, RAW_NODATA};
pub use remap::{MissPolicy, RemapTable};
pub use threshold::{Bound, Edge, Interval, ThresholdRule, ThresholdTable};
