//! Coordinate reference systems and the transforms between them
//!
//! Two systems are supported: WGS84 longitude/latitude ([`Crs::Geographic`],
//! EPSG:4326) and spherical Web Mercator ([`Crs::Projected`], EPSG:3857) in
//! meters. All transforms are pure functions.

use crate::{Coordinate, MatchError, Result};
use geo::{Coord, LineString, MapCoords, Polygon};
use std::fmt;
use std::str::FromStr;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Precomputed constant: 180.0 / EARTH_MERCATOR_MAX
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;

/// Precomputed constant: PI / EARTH_MERCATOR_MAX
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// A supported coordinate reference system
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326)
    Geographic,
    /// Spherical Web Mercator in meters (EPSG:3857)
    Projected,
}

impl Crs {
    /// EPSG code of the geographic system
    pub const GEOGRAPHIC_EPSG: u32 = 4326;
    /// EPSG code of the projected system
    pub const PROJECTED_EPSG: u32 = 3857;

    /// Resolve an EPSG code to a supported CRS
    pub fn from_epsg(code: u32) -> Result<Self> {
        match code {
            Self::GEOGRAPHIC_EPSG => Ok(Crs::Geographic),
            Self::PROJECTED_EPSG => Ok(Crs::Projected),
            other => Err(MatchError::UnsupportedCrs {
                crs: format!("EPSG:{other}"),
            }),
        }
    }

    #[inline]
    pub fn epsg(self) -> u32 {
        match self {
            Crs::Geographic => Self::GEOGRAPHIC_EPSG,
            Crs::Projected => Self::PROJECTED_EPSG,
        }
    }

    #[inline]
    pub fn is_geographic(self) -> bool {
        matches!(self, Crs::Geographic)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = MatchError;

    /// Parse `"EPSG:<code>"` (case-insensitive prefix) or a bare code
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let code = match trimmed.split_once(':') {
            Some((authority, code)) if authority.trim().eq_ignore_ascii_case("epsg") => code,
            Some(_) => {
                return Err(MatchError::UnsupportedCrs {
                    crs: trimmed.to_string(),
                });
            }
            None => trimmed,
        };
        let code: u32 = code.trim().parse().map_err(|_| MatchError::UnsupportedCrs {
            crs: trimmed.to_string(),
        })?;
        Self::from_epsg(code)
    }
}

/// Convert WGS84 (lon, lat) to Web Mercator (x, y) in meters
///
/// Latitude is clamped to the valid Web Mercator range first.
#[inline(always)]
pub fn wgs84_to_mercator(lon: f64, lat: f64) -> Coord<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;

    Coord { x, y }
}

/// Convert Web Mercator (x, y) in meters to WGS84 (lon, lat) in degrees
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> Coord<f64> {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    Coord { x: lon, y: lat }
}

/// Reproject a raw `geo` coordinate between two systems
#[inline]
pub fn reproject_coord(coord: Coord<f64>, from: Crs, to: Crs) -> Coord<f64> {
    match (from, to) {
        (Crs::Geographic, Crs::Projected) => wgs84_to_mercator(coord.x, coord.y),
        (Crs::Projected, Crs::Geographic) => mercator_to_wgs84(coord.x, coord.y),
        _ => coord,
    }
}

/// Reproject every vertex of a line string
pub fn reproject_line_string(line: &LineString<f64>, from: Crs, to: Crs) -> LineString<f64> {
    if from == to {
        return line.clone();
    }
    line.map_coords(|c| reproject_coord(c, from, to))
}

/// Reproject every vertex of a polygon, interior rings included
pub fn reproject_polygon(polygon: &Polygon<f64>, from: Crs, to: Crs) -> Polygon<f64> {
    if from == to {
        return polygon.clone();
    }
    polygon.map_coords(|c| reproject_coord(c, from, to))
}

/// Express a coordinate in [`Crs::Geographic`]; identity if it already is
#[inline]
pub fn to_geographic(coordinate: &Coordinate) -> Coordinate {
    coordinate.reproject(Crs::Geographic)
}

/// Express a coordinate in [`Crs::Projected`]; identity if it already is
#[inline]
pub fn to_projected(coordinate: &Coordinate) -> Coordinate {
    coordinate.reproject(Crs::Projected)
}

/// Check if a projected point is within Web Mercator bounds
///
/// A tolerance of a millimeter absorbs the rounding of points projected from
/// the clamped latitude.
#[inline(always)]
pub fn is_valid_mercator(coord: Coord<f64>) -> bool {
    const TOLERANCE: f64 = 1e-3;
    let range = (EARTH_MERCATOR_MIN - TOLERANCE)..=(EARTH_MERCATOR_MAX + TOLERANCE);
    range.contains(&coord.x) && range.contains(&coord.y)
}
