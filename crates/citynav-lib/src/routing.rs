//! Engine facade tying the pieces together.
//!
//! Building an engine runs the one-off precomputation: strongly connected
//! components of the road graph, landmark cost tables for the A* heuristic
//! and the nearest-stop index for hybrid queries. Queries then validate
//! their endpoints, reject pairs outside the largest component early and
//! dispatch to the hybrid road/timetable computation. A built engine is
//! immutable, so sharing it across query threads needs no locking.

use std::collections::HashSet;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::{GeoPoint, Graph, GraphView, ModeSet, NodeId};
use crate::hybrid::{HybridRoadTransit, NearestStopTranslation};
use crate::landmark::{GreedyFarthestLandmarks, LandmarkMetric, LandmarkProvider, RandomLandmarks};
use crate::path::Path;
use crate::scc::{tarjan_iterative, SccResult, StronglyConnectedComponent};
use crate::timetable::{Stop, Timetable};

/// Landmarks precomputed per engine by default.
pub const DEFAULT_LANDMARK_COUNT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkStrategy {
    /// Cheap to select, default.
    #[default]
    Random,
    /// Better spread, one graph sweep per landmark.
    GreedyFarthest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub landmark_count: usize,
    pub landmark_strategy: LandmarkStrategy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            landmark_count: DEFAULT_LANDMARK_COUNT,
            landmark_strategy: LandmarkStrategy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingQuery {
    pub sources: Vec<NodeId>,
    pub destination: NodeId,
    /// Departure as epoch milliseconds.
    pub departure_ms: i64,
    pub modes: ModeSet,
}

impl RoutingQuery {
    pub fn new(source: NodeId, destination: NodeId, departure_ms: i64, modes: ModeSet) -> Self {
        Self {
            sources: vec![source],
            destination,
            departure_ms,
            modes,
        }
    }
}

pub struct RoutingEngine {
    graph: Graph,
    timetable: Timetable,
    metric: LandmarkMetric,
    translation: NearestStopTranslation,
    components: SccResult,
}

impl RoutingEngine {
    pub fn build(graph: Graph, timetable: Timetable, config: EngineConfig) -> Result<Self> {
        if graph.is_empty() {
            return Err(Error::EmptyGraph);
        }
        let started = Instant::now();

        let components = tarjan_iterative(&graph);
        info!(
            components = components.components().len(),
            largest = components.largest().map_or(0, StronglyConnectedComponent::len),
            "road graph components computed"
        );

        let metric = match config.landmark_strategy {
            LandmarkStrategy::Random => {
                let mut provider = RandomLandmarks::new();
                LandmarkMetric::new(&graph, &mut provider, config.landmark_count)
            }
            LandmarkStrategy::GreedyFarthest => {
                let mut provider = GreedyFarthestLandmarks::new();
                LandmarkMetric::new(&graph, &mut provider, config.landmark_count)
            }
        };
        let translation = NearestStopTranslation::new(&timetable);

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            stops = timetable.stop_count(),
            connections = timetable.connection_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "routing engine built"
        );
        Ok(Self {
            graph,
            timetable,
            metric,
            translation,
            components,
        })
    }

    /// Builds with an explicit landmark provider, mainly for deterministic
    /// setups.
    pub fn build_with_provider(
        graph: Graph,
        timetable: Timetable,
        provider: &mut dyn LandmarkProvider,
        landmark_count: usize,
    ) -> Result<Self> {
        if graph.is_empty() {
            return Err(Error::EmptyGraph);
        }
        let components = tarjan_iterative(&graph);
        let metric = LandmarkMetric::new(&graph, provider, landmark_count);
        let translation = NearestStopTranslation::new(&timetable);
        Ok(Self {
            graph,
            timetable,
            metric,
            translation,
            components,
        })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn timetable(&self) -> &Timetable {
        &self.timetable
    }

    pub fn components(&self) -> &[StronglyConnectedComponent] {
        self.components.components()
    }

    pub fn largest_component(&self) -> Option<&StronglyConnectedComponent> {
        self.components.largest()
    }

    /// Geographically nearest transit stop to `position`.
    pub fn nearest_stop(&self, position: GeoPoint) -> Option<&Stop> {
        self.translation.nearest_stop(position)
    }

    pub fn shortest_path(&self, query: &RoutingQuery) -> Result<Option<Path>> {
        self.validate(query)?;
        if !self.connected(query) {
            return Ok(None);
        }
        self.hybrid().shortest_path(
            &query.sources,
            query.destination,
            query.departure_ms,
            query.modes,
        )
    }

    pub fn shortest_path_cost(&self, query: &RoutingQuery) -> Result<Option<f64>> {
        self.validate(query)?;
        if !self.connected(query) {
            return Ok(None);
        }
        self.hybrid().shortest_path_cost(
            &query.sources,
            query.destination,
            query.departure_ms,
            query.modes,
        )
    }

    pub fn search_space(&self, query: &RoutingQuery) -> Result<HashSet<NodeId>> {
        self.validate(query)?;
        if !self.connected(query) {
            return Ok(HashSet::new());
        }
        self.hybrid().search_space(
            &query.sources,
            query.destination,
            query.departure_ms,
            query.modes,
        )
    }

    fn hybrid(&self) -> HybridRoadTransit<'_> {
        HybridRoadTransit::new(&self.graph, &self.timetable, &self.metric, &self.translation)
    }

    fn validate(&self, query: &RoutingQuery) -> Result<()> {
        if query.sources.is_empty() {
            return Err(Error::EmptyQuery);
        }
        for &node in query.sources.iter().chain([&query.destination]) {
            if !self.graph.contains(node) {
                return Err(Error::UnknownNode { id: node });
            }
        }
        Ok(())
    }

    /// Whether some source shares the largest component with the
    /// destination. Endpoints outside it cannot reach each other by road,
    /// so the search is skipped entirely.
    fn connected(&self, query: &RoutingQuery) -> bool {
        let Some(core) = self.components.largest() else {
            return false;
        };
        core.contains(query.destination)
            && query.sources.iter().any(|&source| core.contains(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Edge, Node, TransportMode};
    use crate::test_helpers::{sample_timetable, spatial_grid_graph};
    use approx::assert_relative_eq;

    const NOON_MS: i64 = 1_700_000_000_000;

    fn engine() -> RoutingEngine {
        let graph = spatial_grid_graph(3, 3);
        let timetable = sample_timetable();
        let mut provider = RandomLandmarks::with_seed(5);
        RoutingEngine::build_with_provider(graph, timetable, &mut provider, 3).unwrap()
    }

    fn car_query(source: NodeId, destination: NodeId) -> RoutingQuery {
        RoutingQuery::new(
            source,
            destination,
            NOON_MS,
            ModeSet::single(TransportMode::Car),
        )
    }

    #[test]
    fn empty_graph_is_rejected() {
        let result = RoutingEngine::build(Graph::new(), Timetable::new(), EngineConfig::default());
        assert!(matches!(result, Err(Error::EmptyGraph)));
    }

    #[test]
    fn builds_with_the_configured_strategy() {
        let config = EngineConfig {
            landmark_count: 3,
            landmark_strategy: LandmarkStrategy::GreedyFarthest,
        };
        let engine =
            RoutingEngine::build(spatial_grid_graph(3, 3), sample_timetable(), config).unwrap();
        let cost = engine.shortest_path_cost(&car_query(0, 8)).unwrap();
        assert!(cost.is_some());
    }

    #[test]
    fn default_config_uses_twenty_random_landmarks() {
        let config = EngineConfig::default();
        assert_eq!(config.landmark_count, 20);
        assert_eq!(config.landmark_strategy, LandmarkStrategy::Random);
    }

    #[test]
    fn config_parses_from_json() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"landmark_count":4,"landmark_strategy":"greedy_farthest"}"#,
        )
        .unwrap();
        assert_eq!(config.landmark_count, 4);
        assert_eq!(config.landmark_strategy, LandmarkStrategy::GreedyFarthest);
    }

    #[test]
    fn answers_a_road_query_end_to_end() {
        let engine = engine();
        let query = car_query(0, 8);
        let cost = engine.shortest_path_cost(&query).unwrap().unwrap();
        let path = engine.shortest_path(&query).unwrap().unwrap();
        assert_eq!(path.source(), 0);
        assert_eq!(path.destination(), 8);
        assert_relative_eq!(path.total_cost(), cost, epsilon = 1e-4);
        assert!(!engine.search_space(&query).unwrap().is_empty());
    }

    #[test]
    fn rejects_empty_and_unknown_queries() {
        let engine = engine();
        let mut query = car_query(0, 8);
        query.sources.clear();
        assert!(matches!(
            engine.shortest_path(&query).unwrap_err(),
            Error::EmptyQuery
        ));
        assert!(matches!(
            engine.shortest_path(&car_query(0, 99)).unwrap_err(),
            Error::UnknownNode { id: 99 }
        ));
    }

    #[test]
    fn endpoints_outside_the_core_are_unreachable() {
        let mut graph = spatial_grid_graph(3, 3);
        // An island node the grid never reaches.
        graph.add_node(Node::road(50, 50.0, 11.0));
        graph.add_node(Node::road(51, 50.0, 11.1));
        graph.add_edge(Edge::road(100, 50, 51, 1.0)).unwrap();
        let mut provider = RandomLandmarks::with_seed(5);
        let engine =
            RoutingEngine::build_with_provider(graph, sample_timetable(), &mut provider, 3)
                .unwrap();

        assert!(engine.shortest_path(&car_query(0, 50)).unwrap().is_none());
        assert!(engine.shortest_path(&car_query(50, 8)).unwrap().is_none());
        assert!(engine.search_space(&car_query(0, 50)).unwrap().is_empty());
    }

    #[test]
    fn exposes_components_and_nearest_stop() {
        let engine = engine();
        assert!(!engine.components().is_empty());
        assert_eq!(engine.largest_component().unwrap().len(), 9);
        let stop = engine.nearest_stop(GeoPoint::new(48.11, 11.09)).unwrap();
        assert_eq!(stop.id, 1);
    }
}
