//! Distance metrics and the landmark (ALT) heuristic.
//!
//! A [`Metric`] is any lower bound on travel cost usable as an A* estimate.
//! [`CrowFliesMetric`] derives one from node coordinates; [`LandmarkMetric`]
//! precomputes true shortest-path costs to and from a handful of landmark
//! nodes and bounds any pair's distance through the triangle inequality,
//! which is usually much tighter.

use std::collections::HashMap;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::dijkstra::Dijkstra;
use crate::graph::{kmh_to_ms, Graph, GraphView, NodeId, MAXIMAL_ROAD_SPEED_KMH};

/// Lower-bound distance between two values, in travel-cost units.
pub trait Metric<T> {
    fn distance(&self, first: &T, second: &T) -> f64;
}

impl<T, M: Metric<T> + ?Sized> Metric<T> for &M {
    fn distance(&self, first: &T, second: &T) -> f64 {
        (**self).distance(first, second)
    }
}

/// Crow-flies travel-time bound between graph nodes. Assumes the fastest
/// road speed, so it never overestimates. Nodes without coordinates get a
/// zero bound.
pub struct CrowFliesMetric<'a> {
    graph: &'a Graph,
}

impl<'a> CrowFliesMetric<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        Self { graph }
    }
}

impl Metric<NodeId> for CrowFliesMetric<'_> {
    fn distance(&self, first: &NodeId, second: &NodeId) -> f64 {
        let Some(a) = self.graph.node(*first).and_then(|node| node.position) else {
            return 0.0;
        };
        let Some(b) = self.graph.node(*second).and_then(|node| node.position) else {
            return 0.0;
        };
        a.distance_m(&b) / kmh_to_ms(MAXIMAL_ROAD_SPEED_KMH)
    }
}

/// Chooses landmark nodes for the ALT heuristic. Providers are selection
/// strategies only; the graph is handed in per call, so one provider can
/// outlive the graph it selects from.
pub trait LandmarkProvider {
    fn select(&mut self, graph: &Graph, amount: usize) -> Vec<NodeId>;
}

/// Uniform sampling without replacement. Fast to select; the quality of the
/// resulting bounds varies with luck.
pub struct RandomLandmarks {
    rng: StdRng,
}

impl RandomLandmarks {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomLandmarks {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkProvider for RandomLandmarks {
    fn select(&mut self, graph: &Graph, amount: usize) -> Vec<NodeId> {
        let nodes: Vec<NodeId> = graph.node_ids().collect();
        let amount = amount.min(nodes.len());
        if amount == 0 {
            return Vec::new();
        }
        rand::seq::index::sample(&mut self.rng, nodes.len(), amount)
            .into_iter()
            .map(|at| nodes[at])
            .collect()
    }
}

/// Starts from one random node, then repeatedly adds the node farthest from
/// everything chosen so far. Produces well-spread landmarks at the price of
/// one full multi-source sweep per landmark.
pub struct GreedyFarthestLandmarks {
    rng: StdRng,
}

impl GreedyFarthestLandmarks {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for GreedyFarthestLandmarks {
    fn default() -> Self {
        Self::new()
    }
}

impl LandmarkProvider for GreedyFarthestLandmarks {
    fn select(&mut self, graph: &Graph, amount: usize) -> Vec<NodeId> {
        let nodes: Vec<NodeId> = graph.node_ids().collect();
        let amount = amount.min(nodes.len());
        if amount == 0 {
            return Vec::new();
        }

        let first = nodes[rand::seq::index::sample(&mut self.rng, nodes.len(), 1).index(0)];
        let mut landmarks = vec![first];
        let search = Dijkstra::new(graph);
        while landmarks.len() < amount {
            let costs = search.costs_reachable(&landmarks);
            let farthest = costs
                .into_iter()
                .filter(|(node, _)| !landmarks.contains(node))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            match farthest {
                Some((node, _)) => landmarks.push(node),
                // Everything reachable is already a landmark.
                None => break,
            }
        }
        landmarks
    }
}

/// ALT heuristic. For landmarks `L`, the bound for a pair `(a, b)` is the
/// best of `d(a, L) - d(b, L)` and `d(L, b) - d(L, a)` over all landmarks,
/// floored at zero. Costs from a landmark come from a forward sweep, costs
/// to it from a sweep over the reversed graph, so no edge is duplicated.
pub struct LandmarkMetric {
    from_landmark: HashMap<NodeId, HashMap<NodeId, f64>>,
    to_landmark: HashMap<NodeId, HashMap<NodeId, f64>>,
}

impl LandmarkMetric {
    pub fn new(graph: &Graph, provider: &mut dyn LandmarkProvider, amount: usize) -> Self {
        let started = Instant::now();
        let landmarks = provider.select(graph, amount);

        let mut from_landmark = HashMap::with_capacity(landmarks.len());
        let mut to_landmark = HashMap::with_capacity(landmarks.len());
        let forward = Dijkstra::new(graph);
        let reversed_view = graph.reversed();
        let backward = Dijkstra::new(&reversed_view);
        for &landmark in &landmarks {
            from_landmark.insert(landmark, forward.costs_reachable(&[landmark]));
            to_landmark.insert(landmark, backward.costs_reachable(&[landmark]));
        }

        info!(
            landmarks = landmarks.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "landmark costs precomputed"
        );
        Self {
            from_landmark,
            to_landmark,
        }
    }

    pub fn landmark_count(&self) -> usize {
        self.from_landmark.len()
    }
}

impl Metric<NodeId> for LandmarkMetric {
    fn distance(&self, first: &NodeId, second: &NodeId) -> f64 {
        let mut best = 0.0_f64;
        for (landmark, from) in &self.from_landmark {
            if let (Some(&to_b), Some(&to_a)) = (from.get(second), from.get(first)) {
                best = best.max(to_b - to_a);
            }
            if let Some(to) = self.to_landmark.get(landmark) {
                if let (Some(&a_to), Some(&b_to)) = (to.get(first), to.get(second)) {
                    best = best.max(a_to - b_to);
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dijkstra::{AStarModule, Dijkstra};
    use crate::test_helpers::spatial_grid_graph;
    use approx::assert_relative_eq;

    #[test]
    fn random_landmarks_clamp_to_graph_size() {
        let graph = spatial_grid_graph(2, 2);
        let mut provider = RandomLandmarks::with_seed(7);
        assert_eq!(provider.select(&graph, 10).len(), 4);
        assert!(provider.select(&graph, 0).is_empty());
    }

    #[test]
    fn random_landmarks_are_distinct() {
        let graph = spatial_grid_graph(3, 3);
        let mut provider = RandomLandmarks::with_seed(42);
        let mut landmarks = provider.select(&graph, 5);
        landmarks.sort_unstable();
        landmarks.dedup();
        assert_eq!(landmarks.len(), 5);
    }

    #[test]
    fn one_provider_selects_from_several_graphs() {
        let mut provider = RandomLandmarks::with_seed(9);
        let small = spatial_grid_graph(2, 2);
        assert_eq!(provider.select(&small, 2).len(), 2);
        drop(small);
        let large = spatial_grid_graph(3, 3);
        assert_eq!(provider.select(&large, 4).len(), 4);
    }

    #[test]
    fn greedy_landmarks_are_distinct_and_clamped() {
        let graph = spatial_grid_graph(3, 3);
        let mut provider = GreedyFarthestLandmarks::with_seed(42);
        let mut landmarks = provider.select(&graph, 20);
        let chosen = landmarks.len();
        assert!(chosen <= 9 && chosen >= 2, "selected {chosen}");
        landmarks.sort_unstable();
        landmarks.dedup();
        assert_eq!(landmarks.len(), chosen);
    }

    #[test]
    fn landmark_bound_never_exceeds_true_cost() {
        let graph = spatial_grid_graph(4, 4);
        let mut provider = RandomLandmarks::with_seed(1);
        let metric = LandmarkMetric::new(&graph, &mut provider, 4);
        let search = Dijkstra::new(&graph);
        for destination in [5, 10, 15] {
            let truth = search.shortest_path_cost(&[0], destination).unwrap();
            let bound = metric.distance(&0, &destination);
            assert!(bound <= truth + 1e-9, "bound {bound} > truth {truth}");
        }
    }

    #[test]
    fn landmark_guided_astar_matches_dijkstra() {
        let graph = spatial_grid_graph(4, 4);
        let mut provider = GreedyFarthestLandmarks::with_seed(3);
        let metric = LandmarkMetric::new(&graph, &mut provider, 4);
        let plain = Dijkstra::new(&graph);
        let guided = Dijkstra::new(&graph).with_module(AStarModule::new(metric));
        for destination in [3, 12, 15] {
            let expected = plain.shortest_path_cost(&[0], destination).unwrap();
            let actual = guided.shortest_path_cost(&[0], destination).unwrap();
            assert_relative_eq!(actual, expected, epsilon = 1e-4);
        }
    }

    #[test]
    fn crow_flies_metric_is_zero_without_coordinates() {
        let mut graph = crate::graph::Graph::new();
        graph.add_node(crate::graph::Node::plain(0));
        graph.add_node(crate::graph::Node::road(1, 48.0, 11.0));
        let metric = CrowFliesMetric::new(&graph);
        assert_relative_eq!(metric.distance(&0, &1), 0.0);
    }
}
