//! Road identities and the road-graph lookup capability
//!
//! The consolidation engine never walks a graph itself; it only asks a
//! [`MapInterface`] for the edges connecting two nodes. [`RoadGraph`] is a
//! small in-memory backend for that capability.

use crate::Crs;
use geo::LineString;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a road-network node (e.g. an OSM node id)
pub type NodeId = u64;

/// Free-form key/value attributes attached to a road
pub type Metadata = BTreeMap<String, String>;

/// Identity of a road-network edge
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadId(pub String);

impl RoadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RoadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A road as assigned by the matcher: identity plus the endpoints used to
/// look its geometry up again
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoadRef {
    pub road_id: RoadId,
    /// Start node of the edge
    pub u: NodeId,
    /// End node of the edge
    pub v: NodeId,
    pub metadata: Metadata,
}

impl RoadRef {
    pub fn new(road_id: impl Into<RoadId>, u: NodeId, v: NodeId) -> Self {
        Self {
            road_id: road_id.into(),
            u,
            v,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.u, self.v)
    }
}

/// A candidate edge returned by a road-graph lookup
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeRecord {
    pub road_id: RoadId,
    /// Edge geometry, expressed in the owning map's CRS
    pub geometry: LineString<f64>,
    pub metadata: Metadata,
}

impl EdgeRecord {
    pub fn new(road_id: impl Into<RoadId>, geometry: LineString<f64>) -> Self {
        Self {
            road_id: road_id.into(),
            geometry,
            metadata: Metadata::new(),
        }
    }
}

/// Lookup capability over a road network
///
/// Implementations must be deterministic: the same `(u, v)` always yields the
/// same candidates in the same order.
pub trait MapInterface {
    /// CRS of the geometries returned by [`MapInterface::edges_between`]
    fn crs(&self) -> Crs;

    /// All edges from `u` to `v`, possibly none
    fn edges_between(&self, u: NodeId, v: NodeId) -> Vec<EdgeRecord>;
}

impl<T: MapInterface + ?Sized> MapInterface for &T {
    fn crs(&self) -> Crs {
        (**self).crs()
    }

    fn edges_between(&self, u: NodeId, v: NodeId) -> Vec<EdgeRecord> {
        (**self).edges_between(u, v)
    }
}

/// In-memory directed multigraph of road edges keyed by `(u, v, key)`
///
/// Parallel edges between the same nodes are returned in ascending key order.
#[derive(Clone, Debug)]
pub struct RoadGraph {
    crs: Crs,
    edges: BTreeMap<(NodeId, NodeId), BTreeMap<u32, EdgeRecord>>,
}

impl RoadGraph {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            edges: BTreeMap::new(),
        }
    }

    /// Insert an edge, returning the record previously stored under the same
    /// `(u, v, key)`
    pub fn add_edge(
        &mut self,
        u: NodeId,
        v: NodeId,
        key: u32,
        record: EdgeRecord,
    ) -> Option<EdgeRecord> {
        self.edges.entry((u, v)).or_default().insert(key, record)
    }

    /// Total number of edges, parallel edges counted separately
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl MapInterface for RoadGraph {
    fn crs(&self) -> Crs {
        self.crs
    }

    fn edges_between(&self, u: NodeId, v: NodeId) -> Vec<EdgeRecord> {
        self.edges
            .get(&(u, v))
            .map(|parallel| parallel.values().cloned().collect())
            .unwrap_or_default()
    }
}
