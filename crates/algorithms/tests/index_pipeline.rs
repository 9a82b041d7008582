//! End-to-end index graphs evaluated against synthetic in-memory datasets.
//!
//! Every dataset sits on the same small WGS84 grid unless a test says
//! otherwise, so reprojection steps resolve to identity resamples.

use aridex_algorithms::classify::{Interval, NoDataNormalizer, ThresholdTable};
use aridex_algorithms::datasets::{Dataset, DatasetRegistry};
use aridex_algorithms::eval::{LocalEvaluator, MemoryCatalog};
use aridex_algorithms::graph::{DateRange, RasterExpr};
use aridex_algorithms::indices::area::area_of;
use aridex_algorithms::indices::soil::texture_table;
use aridex_algorithms::indices::{
    climate_quality, forest_fire, forest_loss, management_quality, soil_quality, ClimateParams,
    CompositeIndexSpec, DepthPolicy, Factor, FireParams, IndexContext, ManagementParams, Platform,
    Reclass, SoilParams,
};
use aridex_core::{EdgeMode, GeoTransform, Image, Raster, Region, CRS};
use approx::assert_relative_eq;
use chrono::NaiveDate;

// ── Fixtures ──────────────────────────────────────────────────────────

fn grid(rows: usize, cols: usize, value: f64) -> Raster {
    Raster::filled(rows, cols, value)
        .with_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0))
        .with_crs(Some(CRS::wgs84()))
}

fn band(name: &str, raster: Raster) -> Image {
    Image::single(name, raster)
}

fn id(dataset: Dataset) -> &'static str {
    dataset.default_id()
}

fn region_around(rows: usize, cols: usize) -> Region {
    Region::rectangle(-0.1, -0.1, cols as f64 + 0.1, rows as f64 + 0.1, EdgeMode::Planar).unwrap()
}

fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").unwrap()
}

const TEXTURE_MATRIX: [f64; 13] = [1.0, 1.0, 1.2, 1.2, 1.0, 1.6, 1.6, 1.6, 2.0, 2.0, 2.0, 2.0, 2.0];

fn soil_catalog() -> MemoryCatalog {
    MemoryCatalog::new()
        .with_image(id(Dataset::Srtm), band("elevation", grid(3, 3, 400.0)))
        .with_image(id(Dataset::Slope), band("slope", grid(3, 3, 1.0)))
        .with_image(id(Dataset::ParentMaterial), band("pm", grid(3, 3, 1.0)))
        .with_image(id(Dataset::SoilTexture), band("texture", grid(3, 3, 5.0)))
        .with_image(id(Dataset::RockFragments), band("rock", grid(3, 3, 75.0)))
        .with_image(id(Dataset::SoilDrainage), band("drainage", grid(3, 3, 5.0)))
}

// ── Soil quality ──────────────────────────────────────────────────────

#[test]
fn soil_texture_code_five_takes_fifth_value() {
    let cat = soil_catalog();
    let table = texture_table(&TEXTURE_MATRIX).unwrap();
    let out = LocalEvaluator::new(&cat)
        .evaluate(&table.apply(&RasterExpr::image(id(Dataset::SoilTexture))))
        .unwrap();
    assert_eq!(out.first().get(1, 1).unwrap(), TEXTURE_MATRIX[4]);
}

#[test]
fn soil_depth_policy_decides_the_class() {
    // Every other factor scores 1, so SQI = depth_index^(1/6).
    let cat = soil_catalog();
    let ctx = IndexContext::new(region_around(3, 3));
    let run = |policy| {
        let params = SoilParams {
            depth: 50.0,
            texture_matrix: TEXTURE_MATRIX.to_vec(),
            depth_policy: policy,
        };
        let result = soil_quality(&ctx, &params).unwrap();
        LocalEvaluator::new(&cat).evaluate(&result.primary().graph).unwrap()
    };

    // 2^(1/6) = 1.122 < 1.13
    let high = run(DepthPolicy::ShallowHighIndex);
    assert_eq!(high.first().get(1, 1).unwrap(), 1.0);
    assert_eq!(high.first().valid_count(), 9);

    // 3^(1/6) = 1.201
    let low = run(DepthPolicy::ShallowLowIndex);
    assert_eq!(low.first().get(1, 1).unwrap(), 2.0);
}

#[test]
fn soil_nodata_marker_masks_pixel() {
    let mut rock = grid(3, 3, 75.0);
    rock.set(0, 0, 9999.0).unwrap();
    let cat = soil_catalog().with_image(id(Dataset::RockFragments), band("rock", rock));
    let ctx = IndexContext::new(region_around(3, 3));
    let params = SoilParams {
        depth: 50.0,
        texture_matrix: TEXTURE_MATRIX.to_vec(),
        depth_policy: DepthPolicy::default(),
    };
    let result = soil_quality(&ctx, &params).unwrap();
    let out = LocalEvaluator::new(&cat).evaluate(&result.primary().graph).unwrap();
    // The sentinel pass runs on classified factors, and 9999 has already
    // fallen into the >60 rock class by then, so the pixel survives.
    assert_eq!(out.first().valid_count(), 9);

    let mut drainage = grid(3, 3, 5.0);
    drainage.set(2, 2, 9999.0).unwrap();
    let cat = soil_catalog().with_image(id(Dataset::SoilDrainage), band("drainage", drainage));
    let out = LocalEvaluator::new(&cat).evaluate(&result.primary().graph).unwrap();
    // 9999 is no drainage code: the remap masks it and the composite follows
    assert!(out.first().get(2, 2).unwrap().is_nan());
    assert_eq!(out.first().valid_count(), 8);
}

#[test]
fn soil_graph_survives_json_round_trip() {
    let ctx = IndexContext::new(region_around(3, 3));
    let params = SoilParams {
        depth: 50.0,
        texture_matrix: TEXTURE_MATRIX.to_vec(),
        depth_policy: DepthPolicy::ShallowLowIndex,
    };
    let graph = soil_quality(&ctx, &params).unwrap().primary().graph.clone();
    let text = serde_json::to_string(&graph).unwrap();
    assert!(text.len() < 64 * 1024, "{} bytes for {} nodes", text.len(), graph.node_count());

    let back: RasterExpr = serde_json::from_str(&text).unwrap();
    assert_eq!(back.node_count(), graph.node_count());

    let cat = soil_catalog();
    let eval = LocalEvaluator::new(&cat);
    let a = eval.evaluate(&graph).unwrap();
    let b = eval.evaluate(&back).unwrap();
    assert_eq!(b.first().get(1, 1).unwrap(), 2.0);
    assert_eq!(a.first().valid_count(), b.first().valid_count());
}

// ── Climate quality ───────────────────────────────────────────────────

#[test]
fn climate_monthly_end_to_end() {
    // Elevation rises eastward: aspect 270°, sector 2, merged score 1.
    let mut dem = grid(5, 5, 0.0);
    for row in 0..5 {
        for col in 0..5 {
            dem.set(row, col, col as f64 * 10.0).unwrap();
        }
    }
    let era5 = Image::from_bands(vec![
        ("mean_2m_air_temperature".into(), grid(5, 5, 293.15)),
        ("total_precipitation".into(), grid(5, 5, 0.01)),
    ])
    .unwrap();
    let cat = MemoryCatalog::new()
        .with_image(id(Dataset::WorldClimBio), band("bio12", grid(5, 5, 300.0)))
        .with_image(id(Dataset::Srtm), band("elevation", dem))
        .with_scene(id(Dataset::Era5Monthly), date("2019-05-01"), era5.clone())
        .with_scene(id(Dataset::Era5Monthly), date("2019-06-01"), era5);

    let ctx = IndexContext::new(region_around(5, 5));
    let result = climate_quality(&ctx, &ClimateParams::monthly("2019-06")).unwrap();
    let out = LocalEvaluator::new(&cat).evaluate(&result.primary().graph).unwrap();
    let cqi = out.first();

    // rainfall 300 → 2, orientation → 1, aridity 2·20 − 10 = 30 → 1
    // (2·1·1)^(1/3) = 1.26 → class 2; aspect masks the border ring
    assert_eq!(cqi.valid_count(), 9);
    assert_eq!(cqi.get(2, 2).unwrap(), 2.0);
    assert!(cqi.get(0, 0).unwrap().is_nan());
    assert_eq!(out.band_names(), vec!["Climate Quality"]);
}

#[test]
fn climate_annual_uses_square_root() {
    // pr sums to 600 (→1.05), pet sums to 12000 (×0.1 = 1200), P/PET = 0.5 (→1.4)
    let month = Image::from_bands(vec![
        ("pr".into(), grid(2, 2, 50.0)),
        ("pet".into(), grid(2, 2, 1000.0)),
    ])
    .unwrap();
    let mut cat = MemoryCatalog::new();
    for m in 1..=12 {
        let d = NaiveDate::from_ymd_opt(2015, m, 1).unwrap();
        cat.insert_scene(id(Dataset::TerraClimate), d, month.clone());
    }
    cat.insert_scene(id(Dataset::TerraClimate), date("2016-01-01"), month);

    let ctx = IndexContext::new(region_around(2, 2));
    let result = climate_quality(&ctx, &ClimateParams::annual(2015)).unwrap();
    let composite = LocalEvaluator::new(&cat).evaluate(&result.primary().graph).unwrap();
    // sqrt(1.05 · 1.4) = 1.212 → class 2
    assert_eq!(composite.first().get(0, 0).unwrap(), 2.0);
    assert_eq!(result.primary().info.metadata["year"], "2015");
}

// ── Management quality ────────────────────────────────────────────────

#[test]
fn management_picks_population_epoch() {
    let mut lc = Image::single("y2010", grid(2, 2, 10.0));
    lc.add_band("y2016", grid(2, 2, 202.0)).unwrap();
    let mut cat = MemoryCatalog::new().with_image(id(Dataset::EsaCciLandCover), lc);
    // epochs 2000..2020: only the 2010 epoch (index 2) is dense
    for (i, year) in [2000, 2005, 2010, 2015, 2020].into_iter().enumerate() {
        let density = if i == 2 { 5000.0 } else { 1.0 };
        let d = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
        cat.insert_scene(
            id(Dataset::GpwPopulationDensity),
            d,
            band("population_density", grid(2, 2, density)),
        );
    }
    let mut matrix = vec![10.0; 34];
    matrix[0] = 20.0;
    let ctx = IndexContext::new(region_around(2, 2));
    let params = |year| ManagementParams {
        year,
        land_use_matrix: matrix.clone(),
    };

    // 2010 → epoch 2: (2.0 · 2.0)^(1/2) = 2 → class 3
    let dense = management_quality(&ctx, &params(2010)).unwrap();
    let out = LocalEvaluator::new(&cat).evaluate(&dense.primary().graph).unwrap();
    assert_eq!(out.first().get(0, 0).unwrap(), 3.0);

    // 2016 → epoch 4, land cover 202 → 1.0: (1.0 · 1.0)^(1/2) → class 1
    let sparse = management_quality(&ctx, &params(2016)).unwrap();
    let out = LocalEvaluator::new(&cat).evaluate(&sparse.primary().graph).unwrap();
    assert_eq!(out.first().get(0, 0).unwrap(), 1.0);
}

// ── Composition ───────────────────────────────────────────────────────

#[test]
fn swapping_factor_tables_changes_the_index() {
    let cat = MemoryCatalog::new()
        .with_image("a", band("a", grid(1, 1, 10.0)))
        .with_image("b", band("b", grid(1, 1, 100.0)));
    let t1 = ThresholdTable::from_pairs(&[(Interval::lt(50.0), 1.0), (Interval::ge(50.0), 4.0)]).unwrap();
    let t2 = ThresholdTable::from_pairs(&[(Interval::lt(50.0), 1.5), (Interval::ge(50.0), 1.0)]).unwrap();
    let classes =
        ThresholdTable::from_pairs(&[(Interval::lt(1.5), 1.0), (Interval::ge(1.5), 2.0)]).unwrap();
    let (a, b) = (RasterExpr::image("a"), RasterExpr::image("b"));
    let normalizer = NoDataNormalizer::default();

    let run = |factors: Vec<Factor>| {
        let graph = CompositeIndexSpec::new("x", factors, classes.clone())
            .build(&normalizer)
            .unwrap();
        LocalEvaluator::new(&cat).evaluate(&graph).unwrap().first().get(0, 0).unwrap()
    };

    let original = run(vec![
        Factor::new("f1", a.clone(), Reclass::Threshold(t1.clone())),
        Factor::new("f2", b.clone(), Reclass::Threshold(t2.clone())),
    ]);
    let reordered = run(vec![
        Factor::new("f2", b.clone(), Reclass::Threshold(t2.clone())),
        Factor::new("f1", a.clone(), Reclass::Threshold(t1.clone())),
    ]);
    let swapped = run(vec![
        Factor::new("f1", b, Reclass::Threshold(t1)),
        Factor::new("f2", a, Reclass::Threshold(t2)),
    ]);

    assert_eq!(original, 1.0);
    assert_eq!(reordered, original);
    assert_eq!(swapped, 2.0);
}

// ── Area path ─────────────────────────────────────────────────────────

#[test]
fn forest_loss_area_matches_region_area() {
    // 10×10 UTM grid of 30 m cells, all lost in 2015.
    let lossyear = Raster::filled(10, 10, 15.0)
        .with_transform(GeoTransform::new(0.0, 300.0, 30.0, -30.0))
        .with_crs(Some(CRS::from_epsg(32631)));
    let cat = MemoryCatalog::new().with_image(id(Dataset::HansenForestChange), band("lossyear", lossyear));
    let region = Region::rectangle(0.0, 0.0, 300.0, 300.0, EdgeMode::Planar).unwrap();
    let ctx = IndexContext::new(region.clone());

    let result = forest_loss(&ctx, 2015).unwrap();
    let out = LocalEvaluator::new(&cat).evaluate(&result.primary().graph).unwrap();
    let stats = out.first().statistics();
    assert_eq!(stats.valid_count, 100);
    assert_relative_eq!(stats.sum, region.area(), max_relative = 1e-9);

    // a different year: nothing lost, everything masked
    let none = forest_loss(&ctx, 2016).unwrap();
    let out = LocalEvaluator::new(&cat).evaluate(&none.primary().graph).unwrap();
    assert_eq!(out.first().valid_count(), 0);
}

#[test]
fn geographic_area_matches_geodesic_region_area() {
    let mask = Raster::filled(4, 4, 1.0)
        .with_transform(GeoTransform::new(0.0, 2.0, 0.5, -0.5))
        .with_crs(Some(CRS::wgs84()));
    let cat = MemoryCatalog::new().with_image("mask", band("m", mask));
    let region = Region::rectangle(0.0, 0.0, 2.0, 2.0, EdgeMode::Geodesic).unwrap();

    let graph = area_of(&RasterExpr::image("mask").clip(&region));
    let out = LocalEvaluator::new(&cat).evaluate(&graph).unwrap();
    // spherical cells against the ellipsoidal polygon area
    assert_relative_eq!(out.first().statistics().sum, region.area(), max_relative = 1e-2);
}

// ── Burn severity ─────────────────────────────────────────────────────

fn s2_scene(b8: [f64; 3], b12: [f64; 3], qa: [f64; 3]) -> Image {
    let row = |v: [f64; 3]| {
        Raster::from_vec(v.to_vec(), 1, 3)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0))
            .with_crs(Some(CRS::wgs84()))
    };
    Image::from_bands(vec![
        ("B8".into(), row(b8)),
        ("B12".into(), row(b12)),
        ("QA60".into(), row(qa)),
    ])
    .unwrap()
}

#[test]
fn burn_severity_end_to_end() {
    let cat = MemoryCatalog::new()
        .with_scene(
            id(Dataset::Sentinel2),
            date("2017-01-05"),
            s2_scene([0.6, 0.6, 0.6], [0.2, 0.2, 0.2], [0.0, 0.0, 0.0]),
        )
        .with_scene(
            id(Dataset::Sentinel2),
            date("2017-03-01"),
            s2_scene([0.58, 0.9, 0.5], [0.22, 0.1, 0.5], [0.0, 0.0, 1024.0]),
        );
    let ctx = IndexContext::new(region_around(1, 3));
    let params = FireParams {
        prefire: DateRange::parse("2016-12-20", "2017-01-18").unwrap(),
        postfire: DateRange::parse("2017-02-20", "2017-03-28").unwrap(),
        platform: Platform::Sentinel2,
    };
    let result = forest_fire(&ctx, &params).unwrap();
    let eval = LocalEvaluator::new(&cat);
    let severity = eval.evaluate(&result.primary().graph).unwrap();
    let s = severity.first();

    // dNBR = (0.5 − 0.45)·1000 = 50 → class 3
    assert_eq!(s.get(0, 0).unwrap(), 3.0);
    // dNBR = (0.5 − 0.8)·1000 = −300 → class 1
    assert_eq!(s.get(0, 1).unwrap(), 1.0);
    // cloud bit set in the only post-fire scene
    assert!(s.get(0, 2).unwrap().is_nan());

    let pre = eval.evaluate(&result.auxiliary()[0].graph).unwrap();
    assert_relative_eq!(pre.first().get(0, 0).unwrap(), 0.5, epsilon = 1e-12);
}

// ── Registry ──────────────────────────────────────────────────────────

#[test]
fn registry_override_redirects_graph() {
    let registry = DatasetRegistry::global()
        .with_override(Dataset::HansenForestChange, "mirror/hansen")
        .unwrap();
    let ctx = IndexContext::new(region_around(1, 1)).with_registry(registry);
    let result = forest_loss(&ctx, 2010).unwrap();
    assert_eq!(result.primary().graph.datasets(), vec!["mirror/hansen"]);
}
