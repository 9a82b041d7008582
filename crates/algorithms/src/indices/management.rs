//! Management quality index (MQI)
//!
//! `MQI = (land use intensity · population density)^(1/2)`

use super::landcover::{land_cover, matrix_table, MATRIX_DIVISOR};
use super::{CompositeIndexSpec, Factor, IndexContext, Reclass};
use crate::classify::{Interval, ThresholdTable};
use crate::datasets::Dataset;
use crate::graph::{CollectionQuery, RasterExpr, Reducer};
use crate::result::{BandInfo, IndexResult};
use aridex_core::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagementParams {
    pub year: i32,
    pub land_use_matrix: Vec<f64>,
}

/// Position of the GPWv4.11 epoch (2000, 2005, 2010, 2015, 2020) for `year`
pub fn population_epoch(year: i32) -> usize {
    match year {
        y if y <= 2000 => 0,
        y if y <= 2005 => 1,
        y if y <= 2010 => 2,
        y if y <= 2015 => 3,
        _ => 4,
    }
}

/// Persons per km² in eleven steps, `<4→1.0 … ≥2700→2.0`
pub fn population_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::lt(4.0), 1.0),
        (Interval::half_open(4.0, 30.0), 1.1),
        (Interval::half_open(30.0, 80.0), 1.2),
        (Interval::half_open(80.0, 170.0), 1.3),
        (Interval::half_open(170.0, 300.0), 1.4),
        (Interval::half_open(300.0, 500.0), 1.5),
        (Interval::half_open(500.0, 850.0), 1.6),
        (Interval::half_open(850.0, 1400.0), 1.7),
        (Interval::half_open(1400.0, 2000.0), 1.8),
        (Interval::half_open(2000.0, 2700.0), 1.9),
        (Interval::ge(2700.0), 2.0),
    ])
}

/// `≤1.25→1, (1.25,1.5]→2, >1.5→3`
pub fn mqi_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::le(1.25), 1.0),
        (Interval::left_open(1.25, 1.5), 2.0),
        (Interval::gt(1.5), 3.0),
    ])
}

pub fn management_quality(ctx: &IndexContext, params: &ManagementParams) -> Result<IndexResult> {
    debug!("Entering management quality function.");
    let region = &ctx.region;
    let lc = land_cover(ctx, params.year)?;

    let epoch = population_epoch(params.year);
    debug!("population density epoch {} for {}", epoch, params.year);
    let population = RasterExpr::collection(
        CollectionQuery::new(ctx.dataset_id(Dataset::GpwPopulationDensity))
            .reduce(Reducer::Nth { index: epoch }),
    )
    .select("population_density")
    .clip(region);

    let spec = CompositeIndexSpec::new(
        "Management Quality Index",
        vec![
            Factor::new(
                "landuse_intensity",
                lc,
                Reclass::Remap {
                    table: matrix_table("land use intensity", &params.land_use_matrix)?,
                    divisor: MATRIX_DIVISOR,
                },
            ),
            Factor::new(
                "population_density",
                population,
                Reclass::Threshold(population_classes()?),
            ),
        ],
        mqi_classes()?,
    )
    .clipped_to(region);

    let mqi = spec.build(&ctx.normalizer)?;
    Ok(IndexResult::new(
        mqi,
        BandInfo::new("Management Quality Index").with_metadata("year", params.year),
    ))
}
