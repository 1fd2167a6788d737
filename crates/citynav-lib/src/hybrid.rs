//! Hybrid road and timetable routing.
//!
//! Queries that allow the tram are answered by translating their road
//! endpoints to the nearest transit stops, running the connection scan
//! between those stops, and stitching the timetable journey back into the
//! road network with zero-cost link segments. Queries without the tram skip
//! all of that and go straight to the road search.

use std::collections::HashSet;

use chrono::{DateTime, Timelike, Utc};
use tracing::debug;

use crate::csa::{ConnectionScan, TransitQuery};
use crate::dijkstra::{AStarModule, Dijkstra, MultiModalModule, TransitModule};
use crate::error::{Error, Result};
use crate::graph::{Edge, Graph, GraphView, ModeSet, Node, NodeId, TransportMode};
use crate::landmark::{LandmarkMetric, Metric};
use crate::path::{Path, PathSegment};
use crate::spatial::CoverTree;
use crate::timetable::{Stop, Timetable};

/// Crow-flies metres between stops; the cover tree's metric.
pub struct StopCrowFlies;

impl Metric<Stop> for StopCrowFlies {
    fn distance(&self, first: &Stop, second: &Stop) -> f64 {
        first.position.distance_m(&second.position)
    }
}

/// Seconds since midnight of an epoch-milliseconds departure timestamp,
/// interpreted in UTC.
pub fn departure_seconds(epoch_ms: i64) -> Result<u32> {
    let datetime = DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .ok_or(Error::InvalidDepartureTime { epoch_ms })?;
    Ok(datetime.time().num_seconds_from_midnight())
}

/// Maps road nodes to their geographically nearest transit stop.
pub struct NearestStopTranslation {
    tree: CoverTree<Stop, StopCrowFlies>,
}

impl NearestStopTranslation {
    pub fn new(table: &Timetable) -> Self {
        let mut tree = CoverTree::new(StopCrowFlies);
        for stop in table.stops() {
            tree.insert(*stop);
        }
        debug!(stops = tree.len(), "nearest-stop index built");
        Self { tree }
    }

    pub fn nearest_stop(&self, position: crate::graph::GeoPoint) -> Option<&Stop> {
        self.tree.nearest_neighbor(&Stop { id: 0, position })
    }

    /// The timetable query equivalent to departing from `node`.
    pub fn translate(&self, node: &Node, departure_secs: u32) -> Result<TransitQuery> {
        let position = node.position.ok_or(Error::NonSpatialNode { id: node.id })?;
        let stop = self
            .nearest_stop(position)
            .ok_or(Error::NoStopAvailable)?;
        Ok(TransitQuery::new(stop.id, departure_secs))
    }
}

pub struct HybridRoadTransit<'a> {
    graph: &'a Graph,
    table: &'a Timetable,
    metric: &'a LandmarkMetric,
    translation: &'a NearestStopTranslation,
}

impl<'a> HybridRoadTransit<'a> {
    pub fn new(
        graph: &'a Graph,
        table: &'a Timetable,
        metric: &'a LandmarkMetric,
        translation: &'a NearestStopTranslation,
    ) -> Self {
        Self {
            graph,
            table,
            metric,
            translation,
        }
    }

    fn road_search(&self, modes: ModeSet, departure_secs: u32) -> Dijkstra<'a, Graph> {
        Dijkstra::new(self.graph)
            .with_module(AStarModule::new(self.metric))
            .with_module(MultiModalModule::new(modes))
            .with_module(TransitModule::new(self.graph, departure_secs))
    }

    fn uses_road_only(modes: ModeSet) -> bool {
        !modes.contains(TransportMode::Tram)
    }

    pub fn shortest_path(
        &self,
        sources: &[NodeId],
        destination: NodeId,
        departure_ms: i64,
        modes: ModeSet,
    ) -> Result<Option<Path>> {
        let departure_secs = departure_seconds(departure_ms)?;
        if Self::uses_road_only(modes) {
            return Ok(self.road_search(modes, departure_secs).shortest_path(sources, destination));
        }

        let (queries, road_sources) = self.translate_sources(sources, departure_secs)?;
        let goal = self.translate_node(destination, departure_secs)?;
        let scan = ConnectionScan::new(self.table);
        let Some(transit) = scan.shortest_path(&queries, goal.stop) else {
            return Ok(None);
        };

        // Pick the road source whose translation fed the journey's first
        // stop; if the scan started anywhere else, fall back to the first.
        let entry = transit.source();
        let road_source = queries
            .iter()
            .position(|query| query.stop == entry)
            .map_or(road_sources[0], |at| road_sources[at]);

        let mut segments = Vec::with_capacity(transit.len() + 2);
        segments.push(PathSegment::new(Edge::link(0, road_source, entry), 0.0));
        segments.extend(transit.iter().copied());
        segments.push(PathSegment::new(
            Edge::link(1, transit.destination(), destination),
            0.0,
        ));
        Ok(Path::from_segments(segments, false))
    }

    pub fn shortest_path_cost(
        &self,
        sources: &[NodeId],
        destination: NodeId,
        departure_ms: i64,
        modes: ModeSet,
    ) -> Result<Option<f64>> {
        let departure_secs = departure_seconds(departure_ms)?;
        if Self::uses_road_only(modes) {
            return Ok(self
                .road_search(modes, departure_secs)
                .shortest_path_cost(sources, destination));
        }
        let (queries, _) = self.translate_sources(sources, departure_secs)?;
        let goal = self.translate_node(destination, departure_secs)?;
        Ok(ConnectionScan::new(self.table).shortest_path_cost(&queries, goal.stop))
    }

    /// Road node ids, or stop ids plus the query endpoints for timetable
    /// journeys.
    pub fn search_space(
        &self,
        sources: &[NodeId],
        destination: NodeId,
        departure_ms: i64,
        modes: ModeSet,
    ) -> Result<HashSet<NodeId>> {
        let departure_secs = departure_seconds(departure_ms)?;
        if Self::uses_road_only(modes) {
            return Ok(self
                .road_search(modes, departure_secs)
                .search_space(sources, destination));
        }
        let (queries, road_sources) = self.translate_sources(sources, departure_secs)?;
        self.translate_node(destination, departure_secs)?;
        let mut space: HashSet<NodeId> = ConnectionScan::new(self.table)
            .costs_reachable(&queries)
            .into_keys()
            .collect();
        space.extend(road_sources);
        space.insert(destination);
        Ok(space)
    }

    fn translate_sources(
        &self,
        sources: &[NodeId],
        departure_secs: u32,
    ) -> Result<(Vec<TransitQuery>, Vec<NodeId>)> {
        let mut queries = Vec::with_capacity(sources.len());
        let mut road_sources = Vec::with_capacity(sources.len());
        for &source in sources {
            queries.push(self.translate_node(source, departure_secs)?);
            road_sources.push(source);
        }
        Ok((queries, road_sources))
    }

    fn translate_node(&self, node: NodeId, departure_secs: u32) -> Result<TransitQuery> {
        let node = self
            .graph
            .node(node)
            .ok_or(Error::UnknownNode { id: node })?;
        self.translation.translate(node, departure_secs)
    }
}
