//! A single CRS-tagged point

use crate::crs::{self, Crs};
use geo::{Coord, Point};

/// An immutable 2-D point tagged with the CRS its values are expressed in.
///
/// For [`Crs::Geographic`], `x` is the longitude and `y` the latitude.
/// Equality compares `(x, y, crs)`; coordinates in different systems are
/// never equal, even if they denote the same location.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Coordinate {
    x: f64,
    y: f64,
    crs: Crs,
}

impl Coordinate {
    #[inline]
    pub fn new(x: f64, y: f64, crs: Crs) -> Self {
        Self { x, y, crs }
    }

    /// Wrap a `geo` point already expressed in `crs`
    #[inline]
    pub fn from_point(point: Point<f64>, crs: Crs) -> Self {
        Self::new(point.x(), point.y(), crs)
    }

    #[inline]
    pub fn x(&self) -> f64 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f64 {
        self.y
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    #[inline]
    pub fn point(&self) -> Point<f64> {
        Point::new(self.x, self.y)
    }

    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }

    /// Returns a new coordinate expressed in `target`; a copy of `self` if it
    /// already is.
    #[inline]
    pub fn reproject(&self, target: Crs) -> Coordinate {
        let c = crs::reproject_coord(self.coord(), self.crs, target);
        Coordinate::new(c.x, c.y, target)
    }

    #[inline]
    pub fn to_geographic(&self) -> Coordinate {
        self.reproject(Crs::Geographic)
    }

    #[inline]
    pub fn to_projected(&self) -> Coordinate {
        self.reproject(Crs::Projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let c = Coordinate::new(-0.1278, 51.5074, Crs::Geographic);
        assert_eq!(c.x(), -0.1278);
        assert_eq!(c.y(), 51.5074);
        assert_eq!(c.crs(), Crs::Geographic);
        assert_eq!(c.point(), Point::new(-0.1278, 51.5074));
    }

    #[test]
    fn test_equality_includes_crs() {
        let a = Coordinate::new(1.0, 2.0, Crs::Geographic);
        let b = Coordinate::new(1.0, 2.0, Crs::Projected);
        assert_ne!(a, b);
        assert_eq!(a, Coordinate::new(1.0, 2.0, Crs::Geographic));
    }

    #[test]
    fn test_reproject_is_noop_in_same_crs() {
        let c = Coordinate::new(500.0, -300.0, Crs::Projected);
        assert_eq!(c.reproject(Crs::Projected), c);
    }

    #[test]
    fn test_reproject_leaves_source_untouched() {
        let c = Coordinate::new(2.3522, 48.8566, Crs::Geographic);
        let p = c.to_projected();

        assert_eq!(p.crs(), Crs::Projected);
        assert_eq!(c.crs(), Crs::Geographic);
        assert_eq!(c.x(), 2.3522);

        let back = p.to_geographic();
        assert!((back.x() - c.x()).abs() < 1e-9);
        assert!((back.y() - c.y()).abs() < 1e-9);
    }
}
