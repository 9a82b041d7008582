//! Soil quality index (SQI)
//!
//! `SQI = (slope · parent material · texture · depth · rock fragments · drainage)^(1/6)`
//!
//! Depth is a single scalar for the whole region and enters the product as
//! a constant class. Slope and parent material come on their own grids and
//! are resampled onto the SRTM grid first.

use super::{CompositeIndexSpec, Factor, IndexContext, Reclass};
use crate::classify::{Interval, RemapTable, ThresholdTable};
use crate::datasets::Dataset;
use crate::graph::RasterExpr;
use crate::result::{BandInfo, IndexResult};
use aridex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Deepest soil the index is defined for, in cm
pub const MAX_DEPTH_CM: f64 = 200.0;

/// Which end of the depth range scores high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthPolicy {
    /// `<15→4, [15,30)→3, [30,75)→2, ≥75→1`
    #[default]
    ShallowHighIndex,
    /// `<15→1, [15,30)→2, [30,75)→3, ≥75→4`
    ShallowLowIndex,
}

impl DepthPolicy {
    pub fn table(self) -> Result<ThresholdTable> {
        let classes = match self {
            DepthPolicy::ShallowHighIndex => [4.0, 3.0, 2.0, 1.0],
            DepthPolicy::ShallowLowIndex => [1.0, 2.0, 3.0, 4.0],
        };
        ThresholdTable::from_pairs(&[
            (Interval::lt(15.0), classes[0]),
            (Interval::half_open(15.0, 30.0), classes[1]),
            (Interval::half_open(30.0, 75.0), classes[2]),
            (Interval::ge(75.0), classes[3]),
        ])
    }

    /// Depth class for a depth in cm.
    pub fn depth_index(self, depth: f64) -> Result<f64> {
        if !depth.is_finite() || !(0.0..=MAX_DEPTH_CM).contains(&depth) {
            return Err(Error::config(
                "soil depth",
                format!("{} cm is outside 0..={} cm", depth, MAX_DEPTH_CM),
            ));
        }
        self.table()?.classify_scalar("soil depth", depth)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilParams {
    /// Soil depth in cm
    pub depth: f64,
    /// Weights for USDA texture classes 1..=13
    pub texture_matrix: Vec<f64>,
    #[serde(default)]
    pub depth_policy: DepthPolicy,
}

/// Texture classes remapped through the caller's matrix
pub fn texture_table(matrix: &[f64]) -> Result<RemapTable> {
    if matrix.len() != 13 {
        return Err(Error::config(
            "soil texture",
            format!("matrix has {} entries, expected 13", matrix.len()),
        ));
    }
    RemapTable::new((1..=13).map(f64::from).collect(), matrix.to_vec())
}

pub fn parent_material_table() -> Result<RemapTable> {
    RemapTable::new(
        vec![1.0, 1.2, 1.4, 1.5, 1.6, 1.7, 2.0],
        vec![1.0, 1.7, 1.7, 1.7, 1.7, 1.7, 2.0],
    )
}

/// Rock fragments (%): `<20→2, [20,60]→1.3, >60→1`
pub fn rock_fragment_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::lt(20.0), 2.0),
        (Interval::closed(20.0, 60.0), 1.3),
        (Interval::gt(60.0), 1.0),
    ])
}

/// Drainage classes 1..=7
pub fn drainage_table() -> Result<RemapTable> {
    RemapTable::new(
        (1..=7).map(f64::from).collect(),
        vec![2.0, 2.0, 1.4, 1.2, 1.0, 1.7, 2.0],
    )
}

/// `<1.13→1, [1.13,1.45]→2, >1.45→3`
pub fn sqi_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::lt(1.13), 1.0),
        (Interval::closed(1.13, 1.45), 2.0),
        (Interval::gt(1.45), 3.0),
    ])
}

pub fn soil_quality(ctx: &IndexContext, params: &SoilParams) -> Result<IndexResult> {
    debug!("Entering soil quality function.");
    let depth_index = params.depth_policy.depth_index(params.depth)?;
    debug!("depth {} cm scores {} ({:?})", params.depth, depth_index, params.depth_policy);

    let region = &ctx.region;
    let srtm = ctx.image(Dataset::Srtm);

    let spec = CompositeIndexSpec::new(
        "sqi",
        vec![
            Factor::new("slope", ctx.image(Dataset::Slope).clip(region), Reclass::Identity).aligned(),
            Factor::new(
                "parent_material",
                ctx.image(Dataset::ParentMaterial).clip(region),
                Reclass::remap(parent_material_table()?),
            )
            .aligned(),
            Factor::new(
                "soil_texture",
                ctx.image(Dataset::SoilTexture).clip(region),
                Reclass::remap(texture_table(&params.texture_matrix)?),
            ),
            Factor::new("soil_depth", RasterExpr::constant(depth_index), Reclass::Identity),
            Factor::new(
                "rock_fragment",
                ctx.image(Dataset::RockFragments).clip(region),
                Reclass::Threshold(rock_fragment_classes()?),
            ),
            Factor::new(
                "drainage",
                ctx.image(Dataset::SoilDrainage).clip(region),
                Reclass::remap(drainage_table()?),
            ),
        ],
        sqi_classes()?,
    )
    .with_reference(srtm)
    .clipped_to(region);

    let sqi = spec.build(&ctx.normalizer)?;
    Ok(IndexResult::new(
        sqi,
        BandInfo::new("Soil Quality Index (cm deep)").with_metadata("depth", params.depth),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_buckets_shallow_high() {
        let p = DepthPolicy::ShallowHighIndex;
        assert_eq!(p.depth_index(10.0).unwrap(), 4.0);
        assert_eq!(p.depth_index(15.0).unwrap(), 3.0);
        assert_eq!(p.depth_index(50.0).unwrap(), 2.0);
        assert_eq!(p.depth_index(75.0).unwrap(), 1.0);
    }

    #[test]
    fn test_depth_buckets_shallow_low() {
        let p = DepthPolicy::ShallowLowIndex;
        assert_eq!(p.depth_index(10.0).unwrap(), 1.0);
        assert_eq!(p.depth_index(50.0).unwrap(), 3.0);
    }

    #[test]
    fn test_invalid_depth_is_configuration_error() {
        for depth in [-1.0, f64::NAN, 250.0] {
            let err = DepthPolicy::default().depth_index(depth).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_texture_matrix_length() {
        assert!(texture_table(&[1.0; 12]).is_err());
        let t = texture_table(&[1.0, 1.0, 1.2, 1.2, 1.6, 1.6, 1.6, 1.6, 2.0, 2.0, 2.0, 2.0, 2.0]).unwrap();
        assert_eq!(t.lookup(5.0), Some(t.values()[4]));
    }

    #[test]
    fn test_sqi_class_edges() {
        let t = sqi_classes().unwrap();
        assert_eq!(t.class_of(1.12), Some(1.0));
        assert_eq!(t.class_of(1.13), Some(2.0));
        assert_eq!(t.class_of(1.45), Some(2.0));
        assert_eq!(t.class_of(1.46), Some(3.0));
    }
}
