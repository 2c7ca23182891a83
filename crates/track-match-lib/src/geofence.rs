//! Padded bounding regions used to scope an area of interest

use crate::crs::{self, Crs};
use crate::{Coordinate, MatchError, Result, Trace};
use geo::{BoundingRect, Centroid, Coord, Intersects, Polygon, Rect};

/// A CRS-tagged polygonal region, built from a bounding box plus padding
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "GeofenceRepr")
)]
pub struct Geofence {
    geometry: Polygon<f64>,
    crs: Crs,
}

/// Unchecked serialized form of a [`Geofence`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct GeofenceRepr {
    geometry: Polygon<f64>,
    crs: Crs,
}

#[cfg(feature = "serde")]
impl TryFrom<GeofenceRepr> for Geofence {
    type Error = MatchError;

    fn try_from(repr: GeofenceRepr) -> Result<Self> {
        let ring = repr.geometry.exterior();
        let vertices = ring.0.len();
        let reason = if vertices < 4 || !ring.is_closed() {
            Some(format!("open boundary ring of {vertices} vertices"))
        } else if !ring.coords().all(|c| c.x.is_finite() && c.y.is_finite()) {
            Some("boundary ring has non-finite vertices".to_string())
        } else {
            None
        };

        match reason {
            Some(reason) => Err(MatchError::InvalidBounds {
                crs: repr.crs,
                reason,
            }),
            None => Ok(Self {
                geometry: repr.geometry,
                crs: repr.crs,
            }),
        }
    }
}

impl Geofence {
    /// Geographic geofence around `[lon_min, lon_max] x [lat_min, lat_max]`,
    /// expanded by `padding` degrees on every side
    pub fn new(
        lon_min: f64,
        lon_max: f64,
        lat_min: f64,
        lat_max: f64,
        padding: f64,
    ) -> Result<Self> {
        Self::from_bounds(lon_min, lon_max, lat_min, lat_max, padding, Crs::Geographic)
    }

    /// Geofence around a box expressed in `crs`, expanded by `padding` CRS
    /// units on every side
    ///
    /// # Errors
    /// [`MatchError::InvalidBounds`] if a bound is inverted or non-finite, or
    /// if the padding is negative or non-finite.
    pub fn from_bounds(
        min_x: f64,
        max_x: f64,
        min_y: f64,
        max_y: f64,
        padding: f64,
        crs: Crs,
    ) -> Result<Self> {
        let invalid = |reason: String| MatchError::InvalidBounds { crs, reason };

        if ![min_x, max_x, min_y, max_y, padding]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(invalid(format!(
                "non-finite bounds ({min_x}, {max_x}, {min_y}, {max_y}) or padding {padding}"
            )));
        }
        if min_x > max_x {
            return Err(invalid(format!("x range is inverted: {min_x} > {max_x}")));
        }
        if min_y > max_y {
            return Err(invalid(format!("y range is inverted: {min_y} > {max_y}")));
        }
        if padding < 0.0 {
            return Err(invalid(format!("padding must be >= 0, got {padding}")));
        }

        let rect = Rect::new(
            Coord {
                x: min_x - padding,
                y: min_y - padding,
            },
            Coord {
                x: max_x + padding,
                y: max_y + padding,
            },
        );

        Ok(Self {
            geometry: rect.to_polygon(),
            crs,
        })
    }

    /// Padded bounding box of a trace, in the trace's CRS
    pub fn from_trace(trace: &Trace, padding: f64) -> Result<Self> {
        let bbox = trace.bounding_rect().ok_or(MatchError::EmptyTrace)?;
        Self::from_bounds(
            bbox.min().x,
            bbox.max().x,
            bbox.min().y,
            bbox.max().y,
            padding,
            trace.crs(),
        )
    }

    #[inline]
    pub fn geometry(&self) -> &Polygon<f64> {
        &self.geometry
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Returns a new geofence with the boundary polygon reprojected
    pub fn to_crs(&self, target: Crs) -> Geofence {
        Geofence {
            geometry: crs::reproject_polygon(&self.geometry, self.crs, target),
            crs: target,
        }
    }

    /// Whether `coordinate` lies inside the region or on its boundary
    ///
    /// # Errors
    /// [`MatchError::CrsMismatch`] if the coordinate is in another CRS; the
    /// caller must reproject explicitly.
    pub fn contains(&self, coordinate: &Coordinate) -> Result<bool> {
        if coordinate.crs() != self.crs {
            return Err(MatchError::CrsMismatch {
                entity: "geofence".to_string(),
                expected: self.crs,
                found: coordinate.crs(),
            });
        }
        Ok(self.geometry.intersects(&coordinate.point()))
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.geometry.bounding_rect()
    }

    pub fn centroid(&self) -> Option<Coordinate> {
        self.geometry
            .centroid()
            .map(|p| Coordinate::from_point(p, self.crs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    fn unit_box() -> Geofence {
        Geofence::new(0.0, 1.0, 0.0, 1.0, 0.1).unwrap()
    }

    #[test]
    fn test_padding_expands_region() {
        let fence = unit_box();
        let padded = Coordinate::new(-0.05, 0.5, Crs::Geographic);
        let beyond = Coordinate::new(-0.2, 0.5, Crs::Geographic);
        assert!(fence.contains(&padded).unwrap());
        assert!(!fence.contains(&beyond).unwrap());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let fence = Geofence::new(0.0, 1.0, 0.0, 1.0, 0.0).unwrap();
        let edge = Coordinate::new(0.0, 0.5, Crs::Geographic);
        let corner = Coordinate::new(1.0, 1.0, Crs::Geographic);
        assert!(fence.contains(&edge).unwrap());
        assert!(fence.contains(&corner).unwrap());
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(matches!(
            Geofence::new(1.0, 0.0, 0.0, 1.0, 0.0),
            Err(MatchError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Geofence::new(0.0, 1.0, 2.0, 1.0, 0.0),
            Err(MatchError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Geofence::new(0.0, 1.0, 0.0, 1.0, -0.5),
            Err(MatchError::InvalidBounds { .. })
        ));
        assert!(matches!(
            Geofence::new(f64::NAN, 1.0, 0.0, 1.0, 0.0),
            Err(MatchError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_equal_bounds_with_padding() {
        let fence = Geofence::new(5.0, 5.0, 5.0, 5.0, 0.5).unwrap();
        let nearby = Coordinate::new(5.2, 4.9, Crs::Geographic);
        assert!(fence.contains(&nearby).unwrap());
    }

    #[test]
    fn test_contains_rejects_other_crs() {
        let fence = unit_box();
        let projected = Coordinate::new(0.5, 0.5, Crs::Geographic).to_projected();

        let err = fence.contains(&projected).unwrap_err();
        assert!(matches!(
            err,
            MatchError::CrsMismatch {
                expected: Crs::Geographic,
                found: Crs::Projected,
                ..
            }
        ));
        // Still usable after the failed query
        let center = Coordinate::new(0.5, 0.5, Crs::Geographic);
        assert!(fence.contains(&center).unwrap());
    }

    #[test]
    fn test_to_crs_preserves_containment() {
        let fence = unit_box().to_crs(Crs::Projected);
        assert_eq!(fence.crs(), Crs::Projected);

        let inside = Coordinate::new(0.5, 0.5, Crs::Geographic).to_projected();
        let outside = Coordinate::new(2.0, 0.5, Crs::Geographic).to_projected();
        assert!(fence.contains(&inside).unwrap());
        assert!(!fence.contains(&outside).unwrap());

        let back = fence.to_crs(Crs::Geographic);
        let bbox = back.bounding_rect().unwrap();
        assert!((bbox.min().x + 0.1).abs() < 1e-9);
        assert!((bbox.max().y - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_from_trace() {
        let trace = Trace::from_points(
            vec![Point::new(10.0, 20.0), Point::new(30.0, 5.0)],
            Crs::Projected,
        );
        let fence = Geofence::from_trace(&trace, 1.0).unwrap();
        assert_eq!(fence.crs(), Crs::Projected);

        let bbox = fence.bounding_rect().unwrap();
        assert_eq!(bbox.min(), Coord { x: 9.0, y: 4.0 });
        assert_eq!(bbox.max(), Coord { x: 31.0, y: 21.0 });

        let centroid = fence.centroid().unwrap();
        assert!((centroid.x() - 20.0).abs() < 1e-9);
        assert!((centroid.y() - 12.5).abs() < 1e-9);

        let empty = Trace::from_points(Vec::new(), Crs::Projected);
        assert!(matches!(
            Geofence::from_trace(&empty, 1.0),
            Err(MatchError::EmptyTrace)
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let fence = unit_box().to_crs(Crs::Projected);
        let json = serde_json::to_string(&fence).unwrap();
        let restored: Geofence = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, fence);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_rejects_open_ring() {
        let empty = r#"{"geometry": {"exterior": [], "interiors": []}, "crs": "Geographic"}"#;
        let err = serde_json::from_str::<Geofence>(empty).unwrap_err();
        assert!(err.to_string().contains("Invalid geofence bounds"));

        let open = r#"{
            "geometry": {
                "exterior": [{"x": 0.0, "y": 0.0}, {"x": 1.0, "y": 0.0}, {"x": 1.0, "y": 1.0}],
                "interiors": []
            },
            "crs": "Projected"
        }"#;
        let err = serde_json::from_str::<Geofence>(open).unwrap_err();
        assert!(err.to_string().contains("3 vertices"));
    }
}
