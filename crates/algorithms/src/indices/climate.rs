//! Climate quality index (CQI)
//!
//! Two formulations exist and a deployment picks one; their tables are
//! never mixed.
//!
//! - [`ClimateVariant::MonthlyEra5`]: `(rainfall · orientation · aridity)^(1/3)`
//!   with WorldClim rainfall, SRTM aspect and the ERA5 monthly aridity
//!   proxy `2·T − P`.
//!
//!   Orientation sectors 1 (north-east) and 2 (west) both score 1. Older
//!   scripts tested `sector == 1 AND sector == 2`, which never holds, so
//!   they left sector 2 at 2. Here the merge is applied as intended.
//! - [`ClimateVariant::AnnualTerraClimate`]: `(precipitation · aridity)^(1/2)`
//!   with the yearly TerraClimate precipitation sum and the `P / PET`
//!   aridity index. The exponent is a true square root.

use super::{CompositeIndexSpec, Factor, IndexContext, Reclass};
use crate::classify::{Interval, RemapTable, ThresholdTable};
use crate::datasets::Dataset;
use crate::graph::{CollectionQuery, DateRange, RasterExpr, Reducer};
use crate::result::{BandInfo, IndexResult};
use aridex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// First year of the TerraClimate record
const TERRACLIMATE_FIRST_YEAR: i32 = 1958;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum ClimateVariant {
    /// One ERA5 month, `YYYY-MM`
    MonthlyEra5 { month: String },
    AnnualTerraClimate { year: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateParams {
    #[serde(flatten)]
    pub variant: ClimateVariant,
}

impl ClimateParams {
    pub fn monthly(month: impl Into<String>) -> Self {
        Self {
            variant: ClimateVariant::MonthlyEra5 {
                month: month.into(),
            },
        }
    }

    pub fn annual(year: i32) -> Self {
        Self {
            variant: ClimateVariant::AnnualTerraClimate { year },
        }
    }
}

/// Annual rainfall (mm): `>650→1, [280,650]→2, <280→4`
pub fn rainfall_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::gt(650.0), 1.0),
        (Interval::closed(280.0, 650.0), 2.0),
        (Interval::lt(280.0), 4.0),
    ])
}

/// Aspect (degrees) into three sectors
pub fn orientation_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::half_open(0.0, 112.5), 1.0),
        (Interval::half_open(247.5, 360.0), 2.0),
        (Interval::half_open(112.5, 247.5), 3.0),
    ])
}

/// Sectors 1 and 2 both score 1; sector 3 scores 2.
///
/// Sector 2 is merged on purpose, not kept at 2 as the always-false
/// `eq(1) AND eq(2)` test of older scripts left it.
pub fn orientation_merge() -> Result<RemapTable> {
    RemapTable::new(vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 2.0])
}

/// ERA5 aridity proxy `2·T(°C) − P(mm)`
pub fn monthly_aridity_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::lt(50.0), 1.0),
        (Interval::half_open(50.0, 75.0), 1.1),
        (Interval::half_open(75.0, 100.0), 1.2),
        (Interval::half_open(100.0, 125.0), 1.4),
        (Interval::half_open(125.0, 150.0), 1.8),
        (Interval::ge(150.0), 2.0),
    ])
}

/// Yearly TerraClimate precipitation (mm)
pub fn annual_precipitation_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::gt(650.0), 1.0),
        (Interval::left_open(570.0, 650.0), 1.05),
        (Interval::left_open(490.0, 570.0), 1.15),
        (Interval::left_open(440.0, 490.0), 1.25),
        (Interval::left_open(380.0, 440.0), 1.35),
        (Interval::left_open(320.0, 380.0), 1.5),
        (Interval::closed(280.0, 320.0), 1.65),
        (Interval::lt(280.0), 2.0),
    ])
}

/// `P / PET` aridity index
pub fn aridity_index_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::gt(0.65), 1.0),
        (Interval::left_open(0.5, 0.65), 1.1),
        (Interval::left_open(0.2, 0.5), 1.4),
        (Interval::closed(0.05, 0.2), 1.8),
        (Interval::lt(0.05), 2.0),
    ])
}

/// `<1.15→1, [1.15,1.81]→2, >1.81→3`
pub fn cqi_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::lt(1.15), 1.0),
        (Interval::closed(1.15, 1.81), 2.0),
        (Interval::gt(1.81), 3.0),
    ])
}

pub fn climate_quality(ctx: &IndexContext, params: &ClimateParams) -> Result<IndexResult> {
    debug!("Entering climate quality function ({:?})", params.variant);
    match &params.variant {
        ClimateVariant::MonthlyEra5 { month } => monthly(ctx, month),
        ClimateVariant::AnnualTerraClimate { year } => annual(ctx, *year),
    }
}

fn monthly(ctx: &IndexContext, month: &str) -> Result<IndexResult> {
    let dates = DateRange::month(month)?;
    let region = &ctx.region;

    let rainfall = ctx
        .image(Dataset::WorldClimBio)
        .clip(region)
        .select("bio12");

    debug!("Calculating field orientation");
    let aspect = ctx.image(Dataset::Srtm).clip(region).aspect();

    let era5 = RasterExpr::collection(
        CollectionQuery::new(ctx.dataset_id(Dataset::Era5Monthly))
            .filter_date(dates)
            .reduce(Reducer::First),
    )
    .clip(region);
    let temperature = era5.select("mean_2m_air_temperature").subtract(273.15);
    let precipitation = era5.select("total_precipitation").multiply(1000.0);
    let aridity = temperature.multiply(2.0).subtract(precipitation);

    debug!("Calculating climate quality");
    let spec = CompositeIndexSpec::new(
        "Climate Quality",
        vec![
            Factor::new("Annual Rainfall", rainfall, Reclass::Threshold(rainfall_classes()?)),
            Factor::new(
                "Field Orientation",
                aspect,
                Reclass::Chain(vec![
                    Reclass::Threshold(orientation_classes()?),
                    Reclass::remap(orientation_merge()?),
                ]),
            ),
            Factor::new("Aridity Index", aridity, Reclass::Threshold(monthly_aridity_classes()?)),
        ],
        cqi_classes()?,
    )
    .clipped_to(region);

    let cqi = spec.build(&ctx.normalizer)?;
    Ok(IndexResult::new(
        cqi,
        BandInfo::new("Climate Quality Index (month)").with_metadata("month", month),
    ))
}

fn annual(ctx: &IndexContext, year: i32) -> Result<IndexResult> {
    if year < TERRACLIMATE_FIRST_YEAR {
        return Err(Error::config(
            "climate quality",
            format!("TerraClimate starts in {}, got {}", TERRACLIMATE_FIRST_YEAR, year),
        ));
    }
    let region = &ctx.region;
    let yearly = RasterExpr::collection(
        CollectionQuery::new(ctx.dataset_id(Dataset::TerraClimate))
            .filter_date(DateRange::year(year)?)
            .filter_bounds(region)
            .reduce(Reducer::Sum),
    )
    .clip(region);
    let precipitation = yearly.select("pr");
    // pet is stored ×10
    let pet = yearly.select("pet").multiply(0.1);
    let aridity = precipitation.divide(pet);

    debug!("Calculating climate quality");
    let spec = CompositeIndexSpec::new(
        "Climate Quality",
        vec![
            Factor::new(
                "Precipitation",
                precipitation,
                Reclass::Threshold(annual_precipitation_classes()?),
            ),
            Factor::new("Aridity Index", aridity, Reclass::Threshold(aridity_index_classes()?)),
        ],
        cqi_classes()?,
    )
    .clipped_to(region);

    let cqi = spec.build(&ctx.normalizer)?;
    Ok(IndexResult::new(
        cqi,
        BandInfo::new("Climate Quality Index (year)").with_metadata("year", year),
    ))
}
