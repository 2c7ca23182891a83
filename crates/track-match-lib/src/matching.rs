//! Per-point matcher output and its tabular interchange form

use crate::Coordinate;
use crate::road::{NodeId, RoadRef};

/// The road a point was assigned to, with the perpendicular offset to it
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct Assignment {
    road: RoadRef,
    distance: f64,
}

/// The matcher's result for one trace point
///
/// Unmatched points carry neither a road nor a distance. They are skipped by
/// consolidation but kept here for diagnostics.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Match {
    trace_index: usize,
    coordinate: Coordinate,
    assignment: Option<Assignment>,
}

impl Match {
    /// A point assigned to `road`, `distance` CRS units away from it
    pub fn matched(
        trace_index: usize,
        coordinate: Coordinate,
        road: RoadRef,
        distance: f64,
    ) -> Self {
        Self {
            trace_index,
            coordinate,
            assignment: Some(Assignment { road, distance }),
        }
    }

    /// A point the matcher could not assign to any road
    pub fn unmatched(trace_index: usize, coordinate: Coordinate) -> Self {
        Self {
            trace_index,
            coordinate,
            assignment: None,
        }
    }

    #[inline]
    pub fn trace_index(&self) -> usize {
        self.trace_index
    }

    #[inline]
    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    #[inline]
    pub fn road(&self) -> Option<&RoadRef> {
        self.assignment.as_ref().map(|a| &a.road)
    }

    #[inline]
    pub fn distance(&self) -> Option<f64> {
        self.assignment.as_ref().map(|a| a.distance)
    }

    #[inline]
    pub fn is_matched(&self) -> bool {
        self.assignment.is_some()
    }

    /// Flatten into one interchange row
    pub fn to_record(&self) -> MatchRecord {
        let road = self.road();
        MatchRecord {
            trace_index: self.trace_index,
            road_id: road.map(|r| r.road_id.to_string()),
            u: road.map(|r| r.u),
            v: road.map(|r| r.v),
            x: self.coordinate.x(),
            y: self.coordinate.y(),
            crs: self.coordinate.crs().epsg(),
            distance: self.distance(),
        }
    }
}

/// One row of the match interchange table
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchRecord {
    pub trace_index: usize,
    pub road_id: Option<String>,
    pub u: Option<NodeId>,
    pub v: Option<NodeId>,
    pub x: f64,
    pub y: f64,
    /// EPSG code of `x` / `y`
    pub crs: u32,
    pub distance: Option<f64>,
}

/// Tabular projection of a match sequence, one row per match in input order,
/// for handoff to reporting and visualization tools
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct MatchFrame {
    rows: Vec<MatchRecord>,
}

impl MatchFrame {
    pub fn from_matches(matches: &[Match]) -> Self {
        Self {
            rows: matches.iter().map(Match::to_record).collect(),
        }
    }

    #[inline]
    pub fn rows(&self) -> &[MatchRecord] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<MatchRecord> {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Crs;

    fn sample_matches() -> Vec<Match> {
        vec![
            Match::matched(
                0,
                Coordinate::new(10.0, 20.0, Crs::Projected),
                RoadRef::new("A", 1, 2),
                1.5,
            ),
            Match::unmatched(1, Coordinate::new(11.0, 21.0, Crs::Projected)),
        ]
    }

    #[test]
    fn test_matched_accessors() {
        let m = &sample_matches()[0];
        assert!(m.is_matched());
        assert_eq!(m.trace_index(), 0);
        assert_eq!(m.road().map(|r| r.endpoints()), Some((1, 2)));
        assert_eq!(m.distance(), Some(1.5));
    }

    #[test]
    fn test_unmatched_has_no_road_or_distance() {
        let m = &sample_matches()[1];
        assert!(!m.is_matched());
        assert!(m.road().is_none());
        assert!(m.distance().is_none());
        assert_eq!(m.coordinate().x(), 11.0);
    }

    #[test]
    fn test_frame_keeps_every_match() {
        let frame = MatchFrame::from_matches(&sample_matches());
        assert_eq!(frame.len(), 2);

        let rows = frame.rows();
        assert_eq!(rows[0].road_id.as_deref(), Some("A"));
        assert_eq!(rows[0].u, Some(1));
        assert_eq!(rows[0].crs, 3857);
        assert_eq!(rows[1].trace_index, 1);
        assert_eq!(rows[1].road_id, None);
        assert_eq!(rows[1].distance, None);
    }

    #[test]
    fn test_empty_frame() {
        let frame = MatchFrame::from_matches(&[]);
        assert!(frame.is_empty());
        assert!(frame.into_rows().is_empty());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_frame_serializes_as_row_array() {
        let frame = MatchFrame::from_matches(&sample_matches());
        let json = serde_json::to_value(&frame).unwrap();

        let rows = json.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["road_id"], "A");
        assert!(rows[1]["distance"].is_null());
    }
}
