//! Grid-aware operations: pixel area, aspect, clipping, resampling

use crate::maybe_rayon::map_cells;
use aridex_core::{Error, GeoTransform, Raster, Region, Result, CRS};
use geo::Contains;
use geo_types::Point;
use std::f64::consts::PI;

/// Cell areas in m² on the grid of `template`.
///
/// Geographic grids use the spherical band area of each row; projected
/// grids use the constant planar cell area.
pub(crate) fn pixel_area(template: &Raster) -> Raster {
    let transform = *template.transform();
    let geographic = template.crs().is_some_and(CRS::is_geographic);
    let mut out = template.like(0.0);
    for (row, mut line) in out.data_mut().rows_mut().into_iter().enumerate() {
        line.fill(if geographic {
            transform.geographic_cell_area(row)
        } else {
            transform.planar_cell_area()
        });
    }
    out
}

/// Horn (1981) aspect in degrees clockwise from north.
///
/// Border cells, cells next to a masked neighbour and flat cells are masked.
pub(crate) fn aspect(dem: &Raster) -> Result<Raster> {
    const FLAT_THRESHOLD: f64 = 1e-10;
    let (rows, cols) = dem.shape();
    let z = dem.data();

    let data = map_cells(rows, cols, |row, col| {
        if row == 0 || col == 0 || row + 1 >= rows || col + 1 >= cols {
            return f64::NAN;
        }
        let a = z[[row - 1, col - 1]];
        let b = z[[row - 1, col]];
        let c = z[[row - 1, col + 1]];
        let d = z[[row, col - 1]];
        let e = z[[row, col]];
        let f = z[[row, col + 1]];
        let g = z[[row + 1, col - 1]];
        let h = z[[row + 1, col]];
        let i = z[[row + 1, col + 1]];
        if [a, b, c, d, e, f, g, h, i].iter().any(|v| v.is_nan()) {
            return f64::NAN;
        }

        let dz_dx = (c + 2.0 * f + i) - (a + 2.0 * d + g);
        let dz_dy = (g + 2.0 * h + i) - (a + 2.0 * b + c);
        if dz_dx.abs() < FLAT_THRESHOLD && dz_dy.abs() < FLAT_THRESHOLD {
            return f64::NAN;
        }

        // Downslope direction: east component -dz/dx, north component +dz/dy
        // (row index grows southward).
        let bearing = (-dz_dx).atan2(dz_dy);
        let bearing = if bearing < 0.0 { bearing + 2.0 * PI } else { bearing };
        bearing.to_degrees() % 360.0
    });
    dem.with_data(data)
}

/// Mask every cell whose centre is outside `region`.
pub(crate) fn clip(raster: &Raster, region: &Region) -> Result<Raster> {
    let polygon = region.to_polygon();
    let transform = *raster.transform();
    let data = raster.data();
    raster.with_data(map_cells(raster.rows(), raster.cols(), |row, col| {
        let (x, y) = transform.pixel_to_geo(col, row);
        if polygon.contains(&Point::new(x, y)) {
            data[[row, col]]
        } else {
            f64::NAN
        }
    }))
}

/// Nearest-neighbour resample of `source` onto the grid of `target`.
pub(crate) fn resample_like(source: &Raster, target: &Raster) -> Result<Raster> {
    if !aridex_core::crs::compatible(source.crs(), target.crs()) {
        return Err(crs_mismatch(source.crs(), target.crs()));
    }
    if source.same_grid(target) {
        return Ok(source.clone());
    }
    let (rows, cols) = target.shape();
    let tt = *target.transform();
    let st = *source.transform();
    let (src_rows, src_cols) = source.shape();
    let data = source.data();

    let out = map_cells(rows, cols, |row, col| {
        let (x, y) = tt.pixel_to_geo(col, row);
        let (fc, fr) = st.geo_to_pixel(x, y);
        if !(fc.is_finite() && fr.is_finite()) || fc < 0.0 || fr < 0.0 {
            return f64::NAN;
        }
        let (sc, sr) = (fc.floor() as usize, fr.floor() as usize);
        if sr >= src_rows || sc >= src_cols {
            return f64::NAN;
        }
        data[[sr, sc]]
    });
    target.with_data(out).map(|r| r.with_crs(source.crs().cloned()))
}

/// Resample onto the same extent at a new square cell size.
pub(crate) fn rescale(source: &Raster, scale: f64) -> Result<Raster> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(Error::config("reproject", format!("scale {} is not positive", scale)));
    }
    let (min_x, min_y, max_x, max_y) = source.bounds();
    let cols = ((max_x - min_x) / scale).ceil().max(1.0) as usize;
    let rows = ((max_y - min_y) / scale).ceil().max(1.0) as usize;
    let target = Raster::new(rows, cols)
        .with_transform(GeoTransform::new(min_x, max_y, scale, -scale))
        .with_crs(source.crs().cloned());
    resample_like(source, &target)
}

pub(crate) fn crs_mismatch(a: Option<&CRS>, b: Option<&CRS>) -> Error {
    let name = |c: Option<&CRS>| c.map_or("unknown".to_string(), CRS::identifier);
    Error::CrsMismatch(name(a), name(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aridex_core::EdgeMode;
    use approx::assert_relative_eq;

    fn ramp_east_up() -> Raster {
        // Elevation grows eastward, so the surface faces west.
        let mut values = Vec::new();
        for _ in 0..5 {
            for col in 0..5 {
                values.push(col as f64 * 10.0);
            }
        }
        Raster::from_vec(values, 5, 5).unwrap()
    }

    #[test]
    fn test_aspect_west_facing() {
        let out = aspect(&ramp_east_up()).unwrap();
        assert_relative_eq!(out.get(2, 2).unwrap(), 270.0, epsilon = 1e-9);
        assert!(out.get(0, 0).unwrap().is_nan());
    }

    #[test]
    fn test_aspect_flat_is_masked() {
        let out = aspect(&Raster::filled(4, 4, 7.0)).unwrap();
        assert!(out.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_planar_pixel_area() {
        let r = Raster::new(2, 2)
            .with_transform(GeoTransform::new(0.0, 60.0, 30.0, -30.0))
            .with_crs(Some(CRS::from_epsg(32632)));
        let area = pixel_area(&r);
        assert_relative_eq!(area.get(1, 1).unwrap(), 900.0);
    }

    #[test]
    fn test_geographic_pixel_area_shrinks_poleward() {
        let r = Raster::new(2, 1)
            .with_transform(GeoTransform::new(0.0, 60.0, 1.0, -30.0))
            .with_crs(Some(CRS::wgs84()));
        let area = pixel_area(&r);
        assert!(area.get(0, 0).unwrap() < area.get(1, 0).unwrap());
    }

    #[test]
    fn test_clip_masks_outside() {
        let r = Raster::filled(4, 4, 1.0).with_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));
        let region = Region::rectangle(0.0, 0.0, 2.0, 2.0, EdgeMode::Planar).unwrap();
        let out = clip(&r, &region).unwrap();
        // rows 2..4 and cols 0..2 are inside
        assert_eq!(out.valid_count(), 4);
        assert_eq!(out.get(3, 0).unwrap(), 1.0);
        assert!(out.get(0, 3).unwrap().is_nan());
    }

    #[test]
    fn test_resample_nearest() {
        let coarse = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2)
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
        let fine = Raster::new(4, 4).with_transform(GeoTransform::new(0.0, 2.0, 0.5, -0.5));
        let out = resample_like(&coarse, &fine).unwrap();
        assert_eq!(out.shape(), (4, 4));
        assert_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_eq!(out.get(3, 3).unwrap(), 4.0);
        assert_eq!(out.get(1, 2).unwrap(), 2.0);
    }

    #[test]
    fn test_resample_refuses_other_crs() {
        let a = Raster::new(2, 2).with_crs(Some(CRS::wgs84()));
        let b = Raster::new(2, 2).with_crs(Some(CRS::from_epsg(3857)));
        assert!(matches!(resample_like(&a, &b), Err(Error::CrsMismatch(_, _))));
    }
}
