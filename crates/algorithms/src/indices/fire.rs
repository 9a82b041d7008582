//! Burn severity from the differenced normalized burn ratio (dNBR)
//!
//! Pre- and post-fire collections are filtered by date and region, cloud
//! masked scene by scene and mosaicked. `dNBR = (NBR_pre − NBR_post)·1000`
//! is bucketed into seven severity classes in one threshold pass; there is
//! no composite step.

use super::IndexContext;
use crate::classify::{Interval, ThresholdTable};
use crate::datasets::Dataset;
use crate::graph::{CollectionQuery, DateRange, RasterExpr, Reducer, SceneMask};
use crate::result::{BandInfo, IndexResult};
use aridex_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    #[default]
    Sentinel2,
    Landsat8,
}

impl Platform {
    pub fn dataset(self) -> Dataset {
        match self {
            Platform::Sentinel2 => Dataset::Sentinel2,
            Platform::Landsat8 => Dataset::Landsat8Sr,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Platform::Sentinel2 => "Sentinel-2",
            Platform::Landsat8 => "Landsat 8",
        }
    }

    /// Cloud, cirrus, shadow and snow flags
    pub fn scene_mask(self) -> SceneMask {
        match self {
            Platform::Sentinel2 => SceneMask::new("QA60", vec![10, 11]),
            Platform::Landsat8 => SceneMask::new("pixel_qa", vec![3, 4, 5]),
        }
    }

    /// `(nir, swir)` bands of the burn ratio
    pub fn nbr_bands(self) -> (&'static str, &'static str) {
        match self {
            Platform::Sentinel2 => ("B8", "B12"),
            Platform::Landsat8 => ("B5", "B7"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FireParams {
    pub prefire: DateRange,
    pub postfire: DateRange,
    #[serde(default)]
    pub platform: Platform,
}

/// USGS dNBR severity ranges, closed at both ends
pub fn severity_classes() -> Result<ThresholdTable> {
    ThresholdTable::from_pairs(&[
        (Interval::closed(-500.0, -251.0), 1.0),
        (Interval::closed(-250.0, -101.0), 2.0),
        (Interval::closed(-100.0, 99.0), 3.0),
        (Interval::closed(100.0, 269.0), 4.0),
        (Interval::closed(270.0, 439.0), 5.0),
        (Interval::closed(440.0, 659.0), 6.0),
        (Interval::closed(660.0, 1300.0), 7.0),
    ])
}

fn burn_ratio(ctx: &IndexContext, platform: Platform, dates: DateRange) -> RasterExpr {
    let (nir, swir) = platform.nbr_bands();
    RasterExpr::collection(
        CollectionQuery::new(ctx.dataset_id(platform.dataset()))
            .filter_date(dates)
            .filter_bounds(&ctx.region)
            .mask_scenes(platform.scene_mask())
            .reduce(Reducer::Mosaic),
    )
    .clip(&ctx.region)
    .normalized_difference(nir, swir)
}

pub fn forest_fire(ctx: &IndexContext, params: &FireParams) -> Result<IndexResult> {
    debug!("Entering forest_fire function.");
    if params.prefire.end() > params.postfire.start() {
        return Err(Error::config(
            "forest fire",
            format!(
                "pre-fire window {} overlaps post-fire window {}",
                params.prefire, params.postfire
            ),
        ));
    }
    debug!(
        "Data selected for analysis: {}; fire between {} and {}",
        params.platform.label(),
        params.prefire.end(),
        params.postfire.start()
    );

    let pre_nbr = burn_ratio(ctx, params.platform, params.prefire).rename("preNBR");
    let post_nbr = burn_ratio(ctx, params.platform, params.postfire).rename("postNBR");
    let dnbr = pre_nbr.subtract(&post_nbr).multiply(1000.0);
    let severity = severity_classes()?
        .classify(&dnbr, ctx.normalizer.canonical)?
        .rename("dNBR");

    let pre_tags = |info: BandInfo| {
        info.with_metadata("prefire_start", params.prefire.start())
            .with_metadata("prefire_end", params.prefire.end())
    };
    let post_tags = |info: BandInfo| {
        info.with_metadata("postfire_start", params.postfire.start())
            .with_metadata("postfire_end", params.postfire.end())
    };

    Ok(IndexResult::new(severity, post_tags(pre_tags(BandInfo::new("dNBR image"))))
        .with_auxiliary(pre_nbr, pre_tags(BandInfo::new("Prefire Normalized Burn Ratio")))
        .with_auxiliary(post_nbr, post_tags(BandInfo::new("Postfire Normalized Burn Ratio"))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aridex_core::{EdgeMode, Region};

    fn params() -> FireParams {
        FireParams {
            prefire: DateRange::parse("2016-12-20", "2017-01-18").unwrap(),
            postfire: DateRange::parse("2017-02-20", "2017-03-28").unwrap(),
            platform: Platform::Sentinel2,
        }
    }

    #[test]
    fn test_severity_examples() {
        let t = severity_classes().unwrap();
        assert_eq!(t.class_of(-300.0), Some(1.0));
        assert_eq!(t.class_of(50.0), Some(3.0));
        assert_eq!(t.class_of(1300.0), Some(7.0));
        assert_eq!(t.class_of(-600.0), None);
    }

    #[test]
    fn test_result_layers() {
        let ctx = IndexContext::new(Region::rectangle(-72.5, -35.8, -72.0, -35.4, EdgeMode::Geodesic).unwrap());
        let r = forest_fire(&ctx, &params()).unwrap();
        assert_eq!(r.layers().count(), 3);
        assert_eq!(r.primary().info.metadata.len(), 4);
        assert_eq!(r.auxiliary()[1].info.metadata["postfire_end"], "2017-03-28");
        assert_eq!(r.primary().graph.datasets(), vec!["COPERNICUS/S2"]);
    }

    #[test]
    fn test_overlapping_windows_rejected() {
        let ctx = IndexContext::new(Region::rectangle(0.0, 0.0, 1.0, 1.0, EdgeMode::Planar).unwrap());
        let mut p = params();
        p.postfire = DateRange::parse("2017-01-01", "2017-03-28").unwrap();
        assert!(forest_fire(&ctx, &p).unwrap_err().is_configuration());
    }
}
