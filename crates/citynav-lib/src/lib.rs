//! CityNav library entry points.
//!
//! This crate exposes the building blocks of a multi-modal urban routing
//! engine: a road/transit graph model, a modular Dijkstra/A* search,
//! landmark-based heuristics, strongly connected component analysis, a
//! timetable with the Connection Scan Algorithm and the hybrid computation
//! that stitches road access onto timetable journeys. Higher-level
//! consumers should go through [`RoutingEngine`] instead of wiring the
//! pieces themselves.

pub mod csa;
pub mod dijkstra;
pub mod error;
pub mod graph;
pub mod hybrid;
pub mod landmark;
pub mod path;
pub mod routing;
pub mod scc;
pub mod spatial;
pub mod timetable;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use csa::{ConnectionScan, JourneyPointer, ScanResult, TransitQuery};
pub use dijkstra::{AStarModule, CostModule, Dijkstra, MultiModalModule, TransitModule};
pub use error::{Error, Result};
pub use graph::{Edge, EdgeKind, GeoPoint, Graph, GraphView, ModeSet, Node, NodeId, TransportMode};
pub use hybrid::{HybridRoadTransit, NearestStopTranslation};
pub use landmark::{
    CrowFliesMetric, GreedyFarthestLandmarks, LandmarkMetric, LandmarkProvider, Metric,
    RandomLandmarks,
};
pub use path::{Path, PathSegment};
pub use routing::{EngineConfig, LandmarkStrategy, RoutingEngine, RoutingQuery};
pub use scc::{tarjan_iterative, tarjan_recursive, SccResult, StronglyConnectedComponent};
pub use spatial::CoverTree;
pub use timetable::{Connection, Footpath, Stop, StopId, Timetable, TripId};
