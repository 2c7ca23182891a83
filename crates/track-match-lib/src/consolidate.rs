//! Run-length route consolidation
//!
//! Turns the matcher's flat, ordered per-point road assignments into a
//! deduplicated sequence of route segments plus a per-point distance-error
//! profile. All distance work happens in the working CRS; geometries are
//! reprojected to the output CRS only once the walk is complete.

use crate::crs::{self, Crs};
use crate::road::{MapInterface, RoadId, RoadRef};
use crate::{Coordinate, Match, MatchError, Result};
use geo::LineString;
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for a consolidation run
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsolidationConfig {
    /// CRS the matcher worked in; every matched coordinate must use it.
    /// Default: [`Crs::Projected`]
    pub working_crs: Crs,
    /// CRS of the produced geometries. Default: [`Crs::Geographic`]
    pub output_crs: Crs,
    /// Also reproject matched-point coordinates to `output_crs`.
    /// Distances are never reprojected. Default: true
    pub reproject_matched_points: bool,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            working_crs: Crs::Projected,
            output_crs: Crs::Geographic,
            reproject_matched_points: true,
        }
    }
}

/// A maximal run of consecutive matches on the same road
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteSegment {
    pub road_id: RoadId,
    /// Edge geometry resolved when the run started, in the output CRS
    pub geometry: LineString<f64>,
    /// Trace index of the first match in the run
    pub first_trace_index: usize,
}

/// A matched point as reported alongside the route
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchedPoint {
    pub trace_index: usize,
    pub road_id: RoadId,
    pub coordinate: Coordinate,
    /// Offset to the road in working-CRS units
    pub distance: f64,
}

/// Distance to the assigned road for every matched point, in input order
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ErrorProfile {
    entries: Vec<(usize, f64)>,
}

impl ErrorProfile {
    /// `(trace_index, distance)` pairs
    #[inline]
    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.entries.is_empty() {
            return None;
        }
        let total: f64 = self.entries.iter().map(|(_, d)| d).sum();
        Some(total / self.entries.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.entries.iter().map(|&(_, d)| d).reduce(f64::max)
    }
}

/// Result of a consolidation run
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Consolidation {
    segments: Vec<RouteSegment>,
    matched_points: Vec<MatchedPoint>,
    error_profile: ErrorProfile,
    crs: Crs,
}

impl Consolidation {
    #[inline]
    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    /// Matched points, in the output CRS when the run was configured to
    /// reproject them, else in the working CRS
    #[inline]
    pub fn matched_points(&self) -> &[MatchedPoint] {
        &self.matched_points
    }

    #[inline]
    pub fn error_profile(&self) -> &ErrorProfile {
        &self.error_profile
    }

    /// CRS of the segment geometries
    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// The middle matched point, for centering a view on the route
    pub fn center(&self) -> Option<Coordinate> {
        self.matched_points
            .get(self.matched_points.len() / 2)
            .map(|p| p.coordinate)
    }

    pub fn into_parts(self) -> (Vec<RouteSegment>, ErrorProfile) {
        (self.segments, self.error_profile)
    }
}

/// Consolidate an ordered match sequence into route segments and an error
/// profile
///
/// Unmatched points are skipped. Consecutive matches on the same road collapse
/// into one segment whose geometry is the first candidate `road_map` returns
/// for the run's first `(u, v)`.
///
/// # Errors
/// * [`MatchError::UnorderedMatches`] if trace indices are not strictly
///   increasing
/// * [`MatchError::CrsMismatch`] if a matched coordinate is not in the
///   working CRS
/// * [`MatchError::MissingRoadGeometry`] if the map has no edge for a run's
///   endpoints
///
/// Any error aborts the whole run; no partial output is returned.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn consolidate<M>(
    matches: &[Match],
    road_map: &M,
    config: &ConsolidationConfig,
) -> Result<Consolidation>
where
    M: MapInterface + ?Sized,
{
    check_order(matches)?;

    let mut segments: Vec<RouteSegment> = Vec::new();
    let mut matched_points = Vec::new();
    let mut entries = Vec::new();

    for m in matches {
        let (Some(road), Some(distance)) = (m.road(), m.distance()) else {
            continue;
        };
        let trace_index = m.trace_index();

        if m.coordinate().crs() != config.working_crs {
            return Err(MatchError::CrsMismatch {
                entity: format!("match at trace index {trace_index}"),
                expected: config.working_crs,
                found: m.coordinate().crs(),
            });
        }

        if segments.last().is_none_or(|s| s.road_id != road.road_id) {
            let geometry = resolve_geometry(road_map, trace_index, road)?;
            tracing::trace!(road_id = %road.road_id, trace_index, "Starting route segment");
            segments.push(RouteSegment {
                road_id: road.road_id.clone(),
                geometry,
                first_trace_index: trace_index,
            });
        }

        entries.push((trace_index, distance));
        matched_points.push(MatchedPoint {
            trace_index,
            road_id: road.road_id.clone(),
            coordinate: *m.coordinate(),
            distance,
        });
    }

    let map_crs = road_map.crs();
    for segment in &mut segments {
        segment.geometry =
            crs::reproject_line_string(&segment.geometry, map_crs, config.output_crs);
    }
    if config.reproject_matched_points {
        for point in &mut matched_points {
            point.coordinate = point.coordinate.reproject(config.output_crs);
        }
    }

    tracing::debug!(
        matches = matches.len(),
        matched = entries.len(),
        segments = segments.len(),
        "Consolidated matches into route"
    );

    Ok(Consolidation {
        segments,
        matched_points,
        error_profile: ErrorProfile { entries },
        crs: config.output_crs,
    })
}

/// Consolidate many independent match sequences in parallel
///
/// Results are returned in input order; one failing run does not affect the
/// others.
pub fn consolidate_many<R, M>(
    runs: &[R],
    road_map: &M,
    config: &ConsolidationConfig,
) -> Vec<Result<Consolidation>>
where
    R: AsRef<[Match]> + Sync,
    M: MapInterface + Sync + ?Sized,
{
    #[cfg(feature = "profiling")]
    profiling::scope!("consolidate::consolidate_many");

    runs.par_iter()
        .map(|run| consolidate(run.as_ref(), road_map, config))
        .collect()
}

fn check_order(matches: &[Match]) -> Result<()> {
    for (position, pair) in matches.windows(2).enumerate() {
        let (previous, found) = (pair[0].trace_index(), pair[1].trace_index());
        if found <= previous {
            return Err(MatchError::UnorderedMatches {
                position: position + 1,
                previous,
                found,
            });
        }
    }
    Ok(())
}

fn resolve_geometry<M>(road_map: &M, trace_index: usize, road: &RoadRef) -> Result<LineString<f64>>
where
    M: MapInterface + ?Sized,
{
    let (u, v) = road.endpoints();
    let mut candidates = road_map.edges_between(u, v);
    if candidates.len() > 1 {
        tracing::warn!(
            u,
            v,
            candidates = candidates.len(),
            "Several edges between nodes, using the first"
        );
    }
    if candidates.is_empty() {
        return Err(MatchError::MissingRoadGeometry {
            trace_index,
            road_id: road.road_id.clone(),
            u,
            v,
        });
    }
    Ok(candidates.swap_remove(0).geometry)
}
