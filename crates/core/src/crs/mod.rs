//! Coordinate reference system handling

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes of the geographic (longitude/latitude) systems we recognise.
const GEOGRAPHIC_EPSG: [u32; 3] = [4326, 4269, 4258];

/// Coordinate reference system of a raster grid.
///
/// Only identity matters here: the remote platform does the actual
/// projection math, and the local evaluator only needs to know whether two
/// grids share a system and whether cell sizes are degrees or metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 geographic CRS (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether coordinates are longitude/latitude degrees.
    pub fn is_geographic(&self) -> bool {
        match (self.epsg, &self.wkt) {
            (Some(code), _) => GEOGRAPHIC_EPSG.contains(&code),
            (None, Some(wkt)) => wkt.trim_start().starts_with("GEOGCS") || wkt.contains("GEOGCRS"),
            (None, None) => false,
        }
    }

    /// Check if two CRS are equivalent
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        // Textual WKT comparison is all we can do without a projection library.
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Short identifier, e.g. `EPSG:4326`
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

/// Whether two optional systems may be combined on one grid.
///
/// Two unknown systems are treated as compatible, an unknown and a known
/// system are not.
pub fn compatible(a: Option<&CRS>, b: Option<&CRS>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_equivalent(b),
        _ => false,
    }
}
