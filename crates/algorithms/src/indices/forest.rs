//! Forest loss, gain and cover areas from the Hansen global forest change
//! layers. These skip classification: each is a 0/1 mask turned into m².
//!
//! The region is clipped with planar edges, matching the bounding-box clip
//! the layers were validated with.

use super::area::area_of;
use super::IndexContext;
use crate::datasets::Dataset;
use crate::result::{BandInfo, IndexResult};
use aridex_core::{EdgeMode, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Loss years present in the 2019 release
pub const FIRST_LOSS_YEAR: i32 = 2001;
pub const LAST_LOSS_YEAR: i32 = 2019;

/// Tree cover percentage counted as forest unless overridden
pub const DEFAULT_CANOPY_THRESHOLD: f64 = 30.0;

fn check_loss_year(year: i32) -> Result<()> {
    if !(FIRST_LOSS_YEAR..=LAST_LOSS_YEAR).contains(&year) {
        return Err(Error::config(
            "forest change",
            format!("year {} outside {}..={}", year, FIRST_LOSS_YEAR, LAST_LOSS_YEAR),
        ));
    }
    Ok(())
}

/// Area of forest lost during `year`.
pub fn forest_loss(ctx: &IndexContext, year: i32) -> Result<IndexResult> {
    debug!("Entering Forest Loss function.");
    check_loss_year(year)?;
    let region = ctx.region.with_edges(EdgeMode::Planar);

    let loss = ctx
        .image(Dataset::HansenForestChange)
        .select("lossyear")
        .equals(f64::from(year % 100))
        .clip(&region);

    Ok(IndexResult::new(
        area_of(&loss),
        BandInfo::new(format!("Forest Loss in {}", year)).with_metadata("year", year),
    ))
}

/// Area of forest gained between 2000 and 2012.
pub fn forest_gain(ctx: &IndexContext) -> Result<IndexResult> {
    debug!("Entering Forest Gain function.");
    let region = ctx.region.with_edges(EdgeMode::Planar);
    let gain = ctx
        .image(Dataset::HansenForestChange)
        .select("gain")
        .equals(1.0)
        .clip(&region);

    Ok(IndexResult::new(
        area_of(&gain),
        BandInfo::new("Forest Gain 2000-2012")
            .with_metadata("year_start", 2000)
            .with_metadata("year_end", 2012),
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestCoverParams {
    pub year: i32,
    /// Minimum 2000 tree cover (%) for a pixel to count as forest
    #[serde(default = "default_canopy")]
    pub canopy_threshold: f64,
    /// Drop pixels lost between 2001 and `year`
    #[serde(default)]
    pub subtract_loss: bool,
}

fn default_canopy() -> f64 {
    DEFAULT_CANOPY_THRESHOLD
}

impl ForestCoverParams {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            canopy_threshold: DEFAULT_CANOPY_THRESHOLD,
            subtract_loss: false,
        }
    }
}

/// Area of forest standing in `year`.
pub fn forest_cover(ctx: &IndexContext, params: &ForestCoverParams) -> Result<IndexResult> {
    debug!("Entering Forest Cover function.");
    if !(0.0..=100.0).contains(&params.canopy_threshold) {
        return Err(Error::config(
            "forest cover",
            format!("canopy threshold {} is not a percentage", params.canopy_threshold),
        ));
    }
    if params.year != 2000 {
        check_loss_year(params.year)?;
    }
    let region = ctx.region.with_edges(EdgeMode::Planar);
    let hansen = ctx.image(Dataset::HansenForestChange);

    let mut cover = hansen.select("treecover2000").gte(params.canopy_threshold);
    if params.subtract_loss && params.year > 2000 {
        let lossyear = hansen.select("lossyear");
        let lost = lossyear.gte(1.0).and(&lossyear.lte(f64::from(params.year % 100)));
        cover = cover.and(&lost.equals(0.0));
    }
    let cover = cover.clip(&region);

    Ok(IndexResult::new(
        area_of(&cover),
        BandInfo::new(format!("Forest Cover {}", params.year))
            .with_metadata("year", params.year)
            .with_metadata("canopy_threshold", params.canopy_threshold),
    ))
}
