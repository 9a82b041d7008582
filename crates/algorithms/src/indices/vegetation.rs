//! Vegetation quality index (VQI)
//!
//! `VQI = (fire risk · erosion protection · drought resistance · plant cover)^(1/4)`
//!
//! The first three factors remap the year's land cover through caller
//! matrices. Plant cover comes from the maximum PROBA-V NDVI over a date
//! range.

use super::landcover::{land_cover, matrix_table, MATRIX_DIVISOR};
use super::{CompositeIndexSpec, Factor, IndexContext, Reclass};
use crate::classify::{Interval, ThresholdTable};
use crate::datasets::Dataset;
use crate::graph::{CollectionQuery, DateRange, RasterExpr, Reducer};
use crate::result::{BandInfo, IndexResult};
use aridex_core::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VegetationParams {
    pub year: i32,
    pub ndvi_dates: DateRange,
    pub drought_matrix: Vec<f64>,
    pub fire_matrix: Vec<f64>,
    pub erosion_matrix: Vec<f64>,
}

/// Plant cover (%) into ten steps.
///
/// Rule order matters: the `[16,38)` and `[18,26)` rules overlap and the
/// later, narrower rules decide where they do.
pub fn plant_cover_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::ge(80.0), 1.0),
        (Interval::half_open(72.0, 80.0), 1.1),
        (Interval::half_open(62.0, 72.0), 1.2),
        (Interval::half_open(50.0, 62.0), 1.3),
        (Interval::half_open(38.0, 50.0), 1.4),
        (Interval::half_open(16.0, 38.0), 1.5),
        (Interval::half_open(18.0, 26.0), 1.6),
        (Interval::half_open(13.0, 18.0), 1.7),
        (Interval::half_open(11.0, 13.0), 1.8),
        (Interval::half_open(10.0, 11.0), 1.9),
        (Interval::lt(10.0), 2.0),
    ])
}

/// `≤1.13→1, (1.13,1.38]→2, >1.38→3`
pub fn vqi_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::le(1.13), 1.0),
        (Interval::left_open(1.13, 1.38), 2.0),
        (Interval::gt(1.38), 3.0),
    ])
}

pub fn vegetation_quality(ctx: &IndexContext, params: &VegetationParams) -> Result<IndexResult> {
    debug!("Entering vegetation quality function.");
    let region = &ctx.region;
    let lc = land_cover(ctx, params.year)?;

    let matrix = |name: &str, values: &[f64]| -> Result<Reclass> {
        Ok(Reclass::Remap {
            table: matrix_table(name, values)?,
            divisor: MATRIX_DIVISOR,
        })
    };

    let max_ndvi = RasterExpr::collection(
        CollectionQuery::new(ctx.dataset_id(Dataset::ProbaVToc))
            .filter_date(params.ndvi_dates)
            .reduce(Reducer::Max),
    )
    .select("NDVI");
    let plant_cover = max_ndvi.divide(255.0).multiply(100.0).clip(region);

    let spec = CompositeIndexSpec::new(
        "Vegetation Quality Index",
        vec![
            Factor::new("fire_risk", lc.clone(), matrix("fire risk", &params.fire_matrix)?),
            Factor::new(
                "erosion_protection",
                lc.clone(),
                matrix("erosion protection", &params.erosion_matrix)?,
            ),
            Factor::new(
                "drought_resistance",
                lc,
                matrix("drought resistance", &params.drought_matrix)?,
            ),
            Factor::new("plant_cover", plant_cover, Reclass::Threshold(plant_cover_classes()?)),
        ],
        vqi_classes()?,
    )
    .clipped_to(region);

    let vqi = spec.build(&ctx.normalizer)?;
    Ok(IndexResult::new(
        vqi,
        BandInfo::new("Vegetation Quality Index").with_metadata("year", params.year),
    ))
}
