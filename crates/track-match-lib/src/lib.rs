//! Track Match Library - CRS-aware GPS traces and map-match consolidation
//!
//! This library ingests raw geolocated point sequences from heterogeneous sources,
//! keeps every geometric value tagged with its coordinate reference system, and
//! consolidates a map matcher's per-point road assignments into a compact route
//! with a per-point accuracy profile.
//!
//! # Architecture
//!
//! - **[`Crs`]**: The two supported systems (WGS84 lon/lat and Web Mercator) and
//!   the pure transforms between them
//! - **[`Coordinate`]**: A single CRS-tagged point
//! - **[`Trace`]**: Ordered coordinates built from tabular rows, GPX or `geo` points
//! - **[`Geofence`]**: A padded bounding polygon scoping a region of interest
//! - **[`Match`]**: The matcher's result for one trace point
//! - **[`consolidate`]**: Run-length route consolidation over a [`MapInterface`]
//!
//! The matcher itself and the road-network backend are external; the latter is
//! only consumed through [`MapInterface::edges_between`].

mod consolidate;
mod coordinate;
pub mod crs;
mod geofence;
mod matching;
pub mod road;
mod trace;

// Public API exports
pub use consolidate::{
    Consolidation, ConsolidationConfig, ErrorProfile, MatchedPoint, RouteSegment, consolidate,
    consolidate_many,
};
pub use coordinate::Coordinate;
pub use crs::Crs;
pub use geofence::Geofence;
pub use matching::{Match, MatchFrame, MatchRecord};
pub use road::{EdgeRecord, MapInterface, NodeId, RoadGraph, RoadId, RoadRef};
pub use trace::{ColumnSpec, TabularRow, Trace};

/// Error types for trace ingestion and match consolidation
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("Unsupported CRS: {crs} (expected EPSG:4326 or EPSG:3857)")]
    UnsupportedCrs { crs: String },

    #[error("CRS mismatch on {entity}: expected {expected}, found {found}")]
    CrsMismatch {
        entity: String,
        expected: Crs,
        found: Crs,
    },

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Track log contains no points ({tracks} tracks)")]
    EmptyTrack { tracks: usize },

    #[error("Trace is empty")]
    EmptyTrace,

    #[error("Index {index} out of range for trace of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid geofence bounds in {crs}: {reason}")]
    InvalidBounds { crs: Crs, reason: String },

    #[error(
        "Matches out of order at position {position}: trace index {found} follows {previous}"
    )]
    UnorderedMatches {
        position: usize,
        previous: usize,
        found: usize,
    },

    #[error(
        "No geometry for road {road_id} between nodes ({u}, {v}) at trace index {trace_index}"
    )]
    MissingRoadGeometry {
        trace_index: usize,
        road_id: RoadId,
        u: NodeId,
        v: NodeId,
    },

    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MatchError>;
