//! Trace storage and construction module
//!
//! This module provides the [`Trace`] struct: an ordered, CRS-tagged sequence
//! of coordinates in recording order. Traces are built in one batch from a raw
//! source (tabular rows, GPX track logs or `geo` geometry) and are read-only
//! afterwards; reprojection returns a new trace.

use crate::{Coordinate, Crs, MatchError, Result, crs};
use geo::{Coord, LineString, Point, Rect};
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::path::Path;

/// Earth's radius in meters, used for haversine path lengths
const EARTH_RADIUS_M: f64 = 6371000.0;

/// Names of the numeric fields read from each tabular row
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnSpec {
    /// Field holding the x value (longitude for geographic sources)
    pub x_column: String,
    /// Field holding the y value (latitude for geographic sources)
    pub y_column: String,
}

impl ColumnSpec {
    pub fn new(x_column: impl Into<String>, y_column: impl Into<String>) -> Self {
        Self {
            x_column: x_column.into(),
            y_column: y_column.into(),
        }
    }

    /// Planar `x` / `y` columns
    pub fn xy() -> Self {
        Self::new("x", "y")
    }

    /// Geographic `longitude` / `latitude` columns
    pub fn lon_lat() -> Self {
        Self::new("longitude", "latitude")
    }
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self::xy()
    }
}

/// A record from a tabular source (CSV reader, dataframe, SQL result row)
pub trait TabularRow {
    /// Numeric value of the named field, `None` if the row lacks it
    fn field(&self, name: &str) -> Option<f64>;
}

impl<K, S> TabularRow for HashMap<K, f64, S>
where
    K: Borrow<str> + Eq + Hash,
    S: BuildHasher,
{
    fn field(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl<K> TabularRow for BTreeMap<K, f64>
where
    K: Borrow<str> + Ord,
{
    fn field(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl<K, S> TabularRow for HashMap<K, Option<f64>, S>
where
    K: Borrow<str> + Eq + Hash,
    S: BuildHasher,
{
    fn field(&self, name: &str) -> Option<f64> {
        self.get(name).copied().flatten()
    }
}

impl<T: TabularRow + ?Sized> TabularRow for &T {
    fn field(&self, name: &str) -> Option<f64> {
        (**self).field(name)
    }
}

/// An ordered sequence of coordinates sharing one CRS
///
/// Coordinate order is the temporal order of the recording; it is never
/// reordered or deduplicated here.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "TraceRepr")
)]
pub struct Trace {
    coords: Vec<Coordinate>,
    crs: Crs,
}

/// Unchecked serialized form of a [`Trace`]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct TraceRepr {
    coords: Vec<Coordinate>,
    crs: Crs,
}

#[cfg(feature = "serde")]
impl TryFrom<TraceRepr> for Trace {
    type Error = MatchError;

    fn try_from(repr: TraceRepr) -> Result<Self> {
        let stray = repr.coords.iter().position(|c| c.crs() != repr.crs);
        if let Some(index) = stray {
            return Err(MatchError::CrsMismatch {
                entity: format!("coordinate {index} of trace"),
                expected: repr.crs,
                found: repr.coords[index].crs(),
            });
        }
        Ok(Self {
            coords: repr.coords,
            crs: repr.crs,
        })
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Trace {
    /// Build a trace from tabular rows, in row order
    ///
    /// # Arguments
    /// * `rows` - Records exposing the fields named by `columns`
    /// * `columns` - Which fields hold the x and y values
    /// * `crs` - The CRS the row values are expressed in
    ///
    /// Projected rows outside the Web Mercator bounds are kept but logged.
    ///
    /// # Errors
    /// [`MatchError::MalformedRow`] if any row lacks a column or holds a
    /// non-finite value. No partial trace is returned.
    pub fn from_rows<I, R>(rows: I, columns: &ColumnSpec, crs: Crs) -> Result<Self>
    where
        I: IntoIterator<Item = R>,
        R: TabularRow,
    {
        #[cfg(feature = "profiling")]
        profiling::scope!("trace::from_rows");

        let coords = rows
            .into_iter()
            .enumerate()
            .map(|(row, record)| {
                let x = Self::read_field(&record, row, &columns.x_column)?;
                let y = Self::read_field(&record, row, &columns.y_column)?;
                if crs == Crs::Projected && !crs::is_valid_mercator(Coord { x, y }) {
                    tracing::warn!("Row {row} lies outside Web Mercator bounds: ({x}, {y})");
                }
                Ok(Coordinate::new(x, y, crs))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(points = coords.len(), %crs, "Built trace from tabular rows");
        Ok(Self { coords, crs })
    }

    fn read_field<R: TabularRow>(record: &R, row: usize, column: &str) -> Result<f64> {
        let value = record.field(column).ok_or_else(|| MatchError::MalformedRow {
            row,
            reason: format!("missing column '{column}'"),
        })?;
        if !value.is_finite() {
            return Err(MatchError::MalformedRow {
                row,
                reason: format!("non-finite value {value} in column '{column}'"),
            });
        }
        Ok(value)
    }

    /// Build a geographic trace from GPX data
    ///
    /// All tracks and their segments are flattened in file order.
    ///
    /// # Errors
    /// [`MatchError::EmptyTrack`] if the GPX data holds no track points.
    pub fn from_gpx(gpx_data: &gpx::Gpx) -> Result<Self> {
        #[cfg(feature = "profiling")]
        profiling::scope!("trace::from_gpx");

        let coords: Vec<Coordinate> = gpx_data
            .tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points)
            .map(|waypoint| Coordinate::from_point(waypoint.point(), Crs::Geographic))
            .collect();

        if coords.is_empty() {
            return Err(MatchError::EmptyTrack {
                tracks: gpx_data.tracks.len(),
            });
        }

        tracing::debug!(
            points = coords.len(),
            tracks = gpx_data.tracks.len(),
            "Built trace from GPX"
        );
        Ok(Self {
            coords,
            crs: Crs::Geographic,
        })
    }

    /// Parse GPX from a reader, then build a geographic trace from it
    pub fn from_gpx_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let gpx_data = gpx::read(reader)?;
        Self::from_gpx(&gpx_data)
    }

    /// Read and parse a GPX file, then build a geographic trace from it
    ///
    /// # Errors
    /// [`MatchError::Io`] if the file cannot be opened, otherwise as
    /// [`Trace::from_gpx_reader`].
    pub fn from_gpx_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_gpx_reader(std::io::BufReader::new(file))
    }

    /// Wrap points that are already expressed in `crs`, preserving order
    pub fn from_points<I>(points: I, crs: Crs) -> Self
    where
        I: IntoIterator<Item = Point<f64>>,
    {
        let coords = points
            .into_iter()
            .map(|p| Coordinate::from_point(p, crs))
            .collect();
        Self { coords, crs }
    }

    /// Wrap the vertices of a line string expressed in `crs`
    pub fn from_line_string(line: &LineString<f64>, crs: Crs) -> Self {
        Self::from_points(line.points(), crs)
    }

    /// Number of coordinates
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn crs(&self) -> Crs {
        self.crs
    }

    #[inline]
    pub fn coords(&self) -> &[Coordinate] {
        &self.coords
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Coordinate> {
        self.coords.iter()
    }

    /// Returns a new trace with every coordinate reprojected to `target`
    pub fn to_crs(&self, target: Crs) -> Trace {
        #[cfg(feature = "profiling")]
        profiling::scope!("trace::to_crs");

        if target == self.crs {
            return self.clone();
        }
        let coords = self.coords.iter().map(|c| c.reproject(target)).collect();
        Trace {
            coords,
            crs: target,
        }
    }

    /// Get the coordinate at `index`
    pub fn coordinate_at(&self, index: usize) -> Result<Coordinate> {
        self.coords
            .get(index)
            .copied()
            .ok_or(MatchError::IndexOutOfRange {
                index,
                len: self.coords.len(),
            })
    }

    /// The coordinate at index `len / 2`, a representative location for
    /// centering a view on the trace
    pub fn midpoint(&self) -> Result<Coordinate> {
        self.coords
            .get(self.coords.len() / 2)
            .copied()
            .ok_or(MatchError::EmptyTrace)
    }

    /// Bounding box in the trace's own CRS, `None` for an empty trace
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let first = self.coords.first()?;
        let (mut min_x, mut min_y) = (first.x(), first.y());
        let (mut max_x, mut max_y) = (min_x, min_y);

        for c in &self.coords[1..] {
            min_x = min_x.min(c.x());
            min_y = min_y.min(c.y());
            max_x = max_x.max(c.x());
            max_y = max_y.max(c.y());
        }

        Some(Rect::new(
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: max_y },
        ))
    }

    /// Total length of the path through all coordinates
    ///
    /// Meters along the sphere (haversine) for geographic traces, Euclidean
    /// distance in CRS units for projected traces.
    pub fn path_length(&self) -> f64 {
        let step = match self.crs {
            Crs::Geographic => haversine_distance,
            Crs::Projected => euclidean_distance,
        };
        self.coords.windows(2).map(|w| step(&w[0], &w[1])).sum()
    }

    /// The coordinates as a `geo` line string in the trace's CRS
    pub fn to_line_string(&self) -> LineString<f64> {
        self.coords.iter().map(Coordinate::coord).collect()
    }

    /// Append `other` after this trace, keeping both orders intact
    pub fn concat(&self, other: &Trace) -> Result<Trace> {
        if other.crs != self.crs {
            return Err(MatchError::CrsMismatch {
                entity: "trace".to_string(),
                expected: self.crs,
                found: other.crs,
            });
        }
        let mut coords = Vec::with_capacity(self.len() + other.len());
        coords.extend_from_slice(&self.coords);
        coords.extend_from_slice(&other.coords);
        Ok(Trace {
            coords,
            crs: self.crs,
        })
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a Coordinate;
    type IntoIter = std::slice::Iter<'a, Coordinate>;

    fn into_iter(self) -> Self::IntoIter {
        self.coords.iter()
    }
}

/// Calculate the Haversine distance between two geographic coordinates in meters
#[inline]
fn haversine_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();
    let delta_lat = (p2.y() - p1.y()).to_radians();
    let delta_lon = (p2.x() - p1.x()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[inline]
fn euclidean_distance(p1: &Coordinate, p2: &Coordinate) -> f64 {
    (p2.x() - p1.x()).hypot(p2.y() - p1.y())
}
