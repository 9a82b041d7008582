//! Region-of-interest geometry
//!
//! A [`Region`] is a polygon given as coordinate rings plus an [`EdgeMode`]
//! saying how its edges run between vertices. The mode is significant: at
//! large extents a geodesic edge bows away from the straight line between
//! the same two vertices, so clipping selects different pixel sets.

use crate::error::{Error, Result};
use geo::{Area, Contains, GeodesicArea};
use geo_types::{Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Longest great-circle step, in degrees, used when densifying geodesic edges.
const GEODESIC_STEP_DEG: f64 = 0.25;

/// How polygon edges are interpreted when clipping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Edges follow great circles on the sphere
    #[default]
    Geodesic,
    /// Edges are straight lines in coordinate space
    Planar,
}

/// A polygon region of interest.
///
/// Rings follow GeoJSON polygon layout: the first ring is the exterior,
/// any further rings are holes. Coordinates are `[x, y]` (longitude,
/// latitude for geographic regions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    rings: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    edges: EdgeMode,
}

impl Region {
    /// Build a region from GeoJSON-style rings.
    pub fn from_rings(rings: Vec<Vec<[f64; 2]>>, edges: EdgeMode) -> Result<Self> {
        if rings.is_empty() {
            return Err(Error::config("region", "polygon has no rings"));
        }
        let mut closed = Vec::with_capacity(rings.len());
        for (i, ring) in rings.into_iter().enumerate() {
            closed.push(close_ring(ring, i)?);
        }
        Ok(Self {
            rings: closed,
            edges,
        })
    }

    /// Axis-aligned rectangle, handy for tests and bounding-box clips.
    pub fn rectangle(min_x: f64, min_y: f64, max_x: f64, max_y: f64, edges: EdgeMode) -> Result<Self> {
        if !(min_x < max_x && min_y < max_y) {
            return Err(Error::config(
                "region",
                format!("empty rectangle ({min_x}, {min_y}, {max_x}, {max_y})"),
            ));
        }
        Self::from_rings(
            vec![vec![
                [min_x, min_y],
                [max_x, min_y],
                [max_x, max_y],
                [min_x, max_y],
            ]],
            edges,
        )
    }

    /// Parse a GeoJSON `Polygon` geometry (or a `Feature` wrapping one).
    pub fn from_geojson(value: &serde_json::Value, edges: EdgeMode) -> Result<Self> {
        let geometry = match value.get("type").and_then(|t| t.as_str()) {
            Some("Feature") => value
                .get("geometry")
                .ok_or_else(|| Error::config("region", "feature has no geometry"))?,
            Some("Polygon") => value,
            other => {
                return Err(Error::config(
                    "region",
                    format!("expected a GeoJSON Polygon, got {:?}", other),
                ))
            }
        };
        let coordinates = geometry
            .get("coordinates")
            .cloned()
            .ok_or_else(|| Error::config("region", "polygon has no coordinates"))?;
        let rings: Vec<Vec<[f64; 2]>> = serde_json::from_value(coordinates)
            .map_err(|e| Error::config("region", e.to_string()))?;
        Self::from_rings(rings, edges)
    }

    /// Same rings, different edge interpretation.
    pub fn with_edges(&self, edges: EdgeMode) -> Region {
        Region {
            rings: self.rings.clone(),
            edges,
        }
    }

    pub fn edges(&self) -> EdgeMode {
        self.edges
    }

    pub fn rings(&self) -> &[Vec<[f64; 2]>] {
        &self.rings
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` of the vertices.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let mut b = (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &[x, y] in &self.rings[0] {
            b.0 = b.0.min(x);
            b.1 = b.1.min(y);
            b.2 = b.2.max(x);
            b.3 = b.3.max(y);
        }
        b
    }

    /// Whether the vertex bounding box overlaps the given box.
    pub fn intersects_bounds(&self, bounds: (f64, f64, f64, f64)) -> bool {
        let (a0, a1, a2, a3) = self.bounds();
        let (b0, b1, b2, b3) = bounds;
        a0 <= b2 && b0 <= a2 && a1 <= b3 && b1 <= a3
    }

    /// Polygon used for point-in-polygon tests.
    ///
    /// Geodesic edges are densified along great circles so that straight
    /// segments between the extra vertices follow the curved edge.
    pub fn to_polygon(&self) -> Polygon<f64> {
        let ring = |r: &Vec<[f64; 2]>| -> LineString<f64> {
            let coords: Vec<Coord<f64>> = match self.edges {
                EdgeMode::Planar => r.iter().map(|&[x, y]| Coord { x, y }).collect(),
                EdgeMode::Geodesic => densify_geodesic(r),
            };
            LineString::from(coords)
        };
        Polygon::new(ring(&self.rings[0]), self.rings[1..].iter().map(ring).collect())
    }

    /// Whether the point lies strictly inside the region.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.to_polygon().contains(&Point::new(x, y))
    }

    /// Region area.
    ///
    /// Geodesic regions are taken as longitude/latitude and measured on the
    /// WGS84 ellipsoid in m². Planar regions are measured in squared
    /// coordinate units, which is m² for metric projected systems.
    pub fn area(&self) -> f64 {
        let polygon = self.to_polygon();
        match self.edges {
            EdgeMode::Geodesic => polygon.geodesic_area_unsigned(),
            EdgeMode::Planar => polygon.unsigned_area(),
        }
    }
}

fn close_ring(mut ring: Vec<[f64; 2]>, index: usize) -> Result<Vec<[f64; 2]>> {
    if ring.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::config("region", format!("ring {index} has non-finite coordinates")));
    }
    if ring.first() != ring.last() {
        if let Some(&first) = ring.first() {
            ring.push(first);
        }
    }
    // A closed triangle needs four positions.
    if ring.len() < 4 {
        return Err(Error::config(
            "region",
            format!("ring {index} needs at least 3 distinct vertices"),
        ));
    }
    Ok(ring)
}

fn to_unit(lon: f64, lat: f64) -> [f64; 3] {
    let (lon, lat) = (lon.to_radians(), lat.to_radians());
    [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
}

fn from_unit(v: [f64; 3]) -> Coord<f64> {
    let lat = v[2].atan2((v[0] * v[0] + v[1] * v[1]).sqrt());
    let lon = v[1].atan2(v[0]);
    Coord {
        x: lon.to_degrees(),
        y: lat.to_degrees(),
    }
}

/// Insert great-circle points so no step exceeds [`GEODESIC_STEP_DEG`].
fn densify_geodesic(ring: &[[f64; 2]]) -> Vec<Coord<f64>> {
    let mut out = Vec::with_capacity(ring.len());
    for pair in ring.windows(2) {
        let ([x0, y0], [x1, y1]) = (pair[0], pair[1]);
        out.push(Coord { x: x0, y: y0 });

        let a = to_unit(x0, y0);
        let b = to_unit(x1, y1);
        let dot = (a[0] * b[0] + a[1] * b[1] + a[2] * b[2]).clamp(-1.0, 1.0);
        let omega = dot.acos();
        let steps = (omega.to_degrees() / GEODESIC_STEP_DEG).ceil() as usize;
        if steps < 2 || omega.sin().abs() < 1e-12 {
            continue;
        }
        for k in 1..steps {
            let t = k as f64 / steps as f64;
            let wa = ((1.0 - t) * omega).sin() / omega.sin();
            let wb = (t * omega).sin() / omega.sin();
            let p = [
                wa * a[0] + wb * b[0],
                wa * a[1] + wb * b[1],
                wa * a[2] + wb * b[2],
            ];
            let mut c = from_unit(p);
            // Keep longitudes on the same side as the edge's endpoints.
            if (c.x - x0).abs() > 180.0 {
                c.x += 360.0 * (x0 - c.x).signum();
            }
            out.push(c);
        }
    }
    if let Some(&[x, y]) = ring.last() {
        out.push(Coord { x, y });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ring_is_closed() {
        let r = Region::from_rings(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]], EdgeMode::Planar)
            .unwrap();
        assert_eq!(r.rings()[0].len(), 4);
        assert_eq!(r.rings()[0][0], r.rings()[0][3]);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let err = Region::from_rings(vec![vec![[0.0, 0.0], [1.0, 0.0]]], EdgeMode::Planar)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_planar_area() {
        let r = Region::rectangle(0.0, 0.0, 300.0, 200.0, EdgeMode::Planar).unwrap();
        assert_relative_eq!(r.area(), 60_000.0, epsilon = 1e-6);
    }

    #[test]
    fn test_contains_planar() {
        let r = Region::rectangle(0.0, 0.0, 10.0, 10.0, EdgeMode::Planar).unwrap();
        assert!(r.contains(5.0, 5.0));
        assert!(!r.contains(11.0, 5.0));
    }

    #[test]
    fn test_geodesic_edge_bows_poleward() {
        // A long east-west edge at 60°N: the great circle between the two
        // vertices runs north of the parallel, so a point just north of the
        // straight edge is inside only in geodesic mode.
        let rings = vec![vec![[-40.0, 50.0], [40.0, 50.0], [40.0, 60.0], [-40.0, 60.0]]];
        let geodesic = Region::from_rings(rings.clone(), EdgeMode::Geodesic).unwrap();
        let planar = Region::from_rings(rings, EdgeMode::Planar).unwrap();

        assert!(!planar.contains(0.0, 61.0));
        assert!(geodesic.contains(0.0, 61.0));
    }

    #[test]
    fn test_from_geojson_feature() {
        let value = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[-72.4, -35.5], [-72.2, -35.5], [-72.2, -35.7], [-72.4, -35.7], [-72.4, -35.5]]]
            }
        });
        let r = Region::from_geojson(&value, EdgeMode::Geodesic).unwrap();
        assert!(r.contains(-72.3, -35.6));
        assert!(r.area() > 0.0);
    }
}
