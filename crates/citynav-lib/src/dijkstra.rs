//! Modular Dijkstra and A* search.
//!
//! The core loop is a plain lazy-deletion Dijkstra. Everything beyond that
//! is bolted on through [`CostModule`] hooks: modules can veto an edge,
//! supply a goal-distance estimate (turning the search into A*), or replace
//! an edge's cost based on the tentative arrival time at its source. The
//! engine combines all registered modules, so multi-modal restriction,
//! timetable waiting and a landmark heuristic compose freely.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::trace;

use crate::graph::{Arc, EdgeKind, Graph, GraphView, ModeSet, NodeId, SECONDS_PER_DAY};
use crate::landmark::Metric;
use crate::path::{Path, PathSegment};

/// Total-order wrapper so costs can live in a [`BinaryHeap`].
#[derive(Debug, Clone, Copy, PartialEq)]
struct FloatOrd(f64);

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Heap entry ordered by `key` (tentative cost plus estimate), reversed so
/// the binary max-heap pops the smallest key first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    key: FloatOrd,
    cost: FloatOrd,
    node: NodeId,
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Hook set that customizes the search. All methods have pass-through
/// defaults, so a module only implements what it cares about.
pub trait CostModule {
    /// Whether `arc` may be relaxed at all. Modules are ANDed.
    fn consider_edge(&self, _arc: &Arc, _destination: Option<NodeId>) -> bool {
        true
    }

    /// Lower bound on the remaining cost from `node` to `destination`.
    /// The largest estimate over all modules is added to the queue key.
    fn estimate(&self, _node: NodeId, _destination: NodeId) -> Option<f64> {
        None
    }

    /// Replacement cost for `arc` given the tentative cost at its source.
    /// The largest replacement over all modules wins; if no module answers
    /// the edge keeps its base cost.
    fn adjust_cost(&self, _arc: &Arc, _tentative: f64) -> Option<f64> {
        None
    }
}

struct Settled {
    distance: f64,
    parent: Option<(Arc, f64)>,
}

/// Dijkstra over any graph view, extended by its registered modules.
pub struct Dijkstra<'a, G: GraphView> {
    graph: &'a G,
    modules: Vec<Box<dyn CostModule + 'a>>,
}

impl<'a, G: GraphView> Dijkstra<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            modules: Vec::new(),
        }
    }

    /// Registers a module; chainable.
    #[must_use]
    pub fn with_module(mut self, module: impl CostModule + 'a) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    /// Cheapest path from the closest of `sources` to `destination`.
    pub fn shortest_path(&self, sources: &[NodeId], destination: NodeId) -> Option<Path> {
        let settled = self.relax(sources, Some(destination));
        settled.get(&destination)?;

        let mut segments = Vec::new();
        let mut current = destination;
        while let Some((arc, cost)) = settled.get(&current).and_then(|entry| entry.parent) {
            segments.push(PathSegment::new(arc.edge, cost));
            current = arc.source();
        }
        match Path::from_segments(segments, true) {
            Some(path) => Some(path),
            None => Some(Path::empty(destination)),
        }
    }

    /// Cost of the cheapest path, without materializing it.
    pub fn shortest_path_cost(&self, sources: &[NodeId], destination: NodeId) -> Option<f64> {
        self.relax(sources, Some(destination))
            .get(&destination)
            .map(|entry| entry.distance)
    }

    /// Nodes settled while answering the query, for diagnostics.
    pub fn search_space(&self, sources: &[NodeId], destination: NodeId) -> HashSet<NodeId> {
        self.relax(sources, Some(destination))
            .into_keys()
            .collect()
    }

    /// Cheapest cost from the closest source to every reachable node.
    pub fn costs_reachable(&self, sources: &[NodeId]) -> HashMap<NodeId, f64> {
        self.relax(sources, None)
            .into_iter()
            .map(|(node, entry)| (node, entry.distance))
            .collect()
    }

    fn relax(&self, sources: &[NodeId], destination: Option<NodeId>) -> HashMap<NodeId, Settled> {
        let mut settled: HashMap<NodeId, Settled> = HashMap::new();
        let mut tentative: HashMap<NodeId, f64> = HashMap::new();
        let mut parents: HashMap<NodeId, (Arc, f64)> = HashMap::new();
        let mut queue = BinaryHeap::new();

        for &source in sources {
            tentative.insert(source, 0.0);
            queue.push(QueueEntry {
                key: FloatOrd(0.0),
                cost: FloatOrd(0.0),
                node: source,
            });
        }

        while let Some(entry) = queue.pop() {
            if settled.contains_key(&entry.node) {
                continue;
            }
            let distance = entry.cost.0;
            settled.insert(
                entry.node,
                Settled {
                    distance,
                    parent: parents.remove(&entry.node),
                },
            );
            if destination == Some(entry.node) {
                break;
            }

            for arc in self.graph.arcs_from(entry.node) {
                let next = arc.destination();
                if settled.contains_key(&next) {
                    continue;
                }
                if !self
                    .modules
                    .iter()
                    .all(|module| module.consider_edge(&arc, destination))
                {
                    continue;
                }
                let cost = self.effective_cost(&arc, distance);
                let candidate = distance + cost;
                let known = tentative.get(&next).copied().unwrap_or(f64::INFINITY);
                if candidate >= known {
                    continue;
                }
                tentative.insert(next, candidate);
                parents.insert(next, (arc, cost));
                let estimate = destination.map_or(0.0, |goal| self.estimate(next, goal));
                queue.push(QueueEntry {
                    key: FloatOrd(candidate + estimate),
                    cost: FloatOrd(candidate),
                    node: next,
                });
            }
        }
        trace!(settled = settled.len(), "relaxation finished");
        settled
    }

    fn effective_cost(&self, arc: &Arc, tentative: f64) -> f64 {
        self.modules
            .iter()
            .filter_map(|module| module.adjust_cost(arc, tentative))
            .max_by(f64::total_cmp)
            .unwrap_or_else(|| arc.cost())
    }

    fn estimate(&self, node: NodeId, destination: NodeId) -> f64 {
        self.modules
            .iter()
            .filter_map(|module| module.estimate(node, destination))
            .max_by(f64::total_cmp)
            .unwrap_or(0.0)
    }
}

/// Goal-distance estimates from a metric, turning the search into A*. With
/// an admissible metric the result cost equals plain Dijkstra's.
pub struct AStarModule<M> {
    metric: M,
}

impl<M: Metric<NodeId>> AStarModule<M> {
    pub fn new(metric: M) -> Self {
        Self { metric }
    }
}

impl<M: Metric<NodeId>> CostModule for AStarModule<M> {
    fn estimate(&self, node: NodeId, destination: NodeId) -> Option<f64> {
        Some(self.metric.distance(&node, &destination))
    }
}

/// Replaces link edge costs with the waiting time until the timed transit
/// node at their head, relative to the query departure time.
pub struct TransitModule<'a> {
    graph: &'a Graph,
    departure_secs: u32,
}

impl<'a> TransitModule<'a> {
    /// `departure_secs` is the query departure as seconds since midnight.
    pub fn new(graph: &'a Graph, departure_secs: u32) -> Self {
        Self {
            graph,
            departure_secs: departure_secs % SECONDS_PER_DAY,
        }
    }
}

impl CostModule for TransitModule<'_> {
    fn adjust_cost(&self, arc: &Arc, tentative: f64) -> Option<f64> {
        if arc.edge.kind != EdgeKind::Link {
            return None;
        }
        let event = self.graph.node(arc.destination())?.time?;
        let day = f64::from(SECONDS_PER_DAY);
        // Wall-clock time of day when the edge is relaxed.
        let now = (f64::from(self.departure_secs) + tentative) % day;
        let mut wait = f64::from(event) - now;
        if wait < 0.0 {
            // Departure already passed today; wait for tomorrow's.
            wait += day;
        }
        Some(wait)
    }
}

/// Restricts the search to edges usable by the query's modes and re-prices
/// shared edges whose fastest declared mode is not allowed.
pub struct MultiModalModule {
    modes: ModeSet,
}

impl MultiModalModule {
    pub fn new(modes: ModeSet) -> Self {
        Self { modes }
    }
}

impl CostModule for MultiModalModule {
    fn consider_edge(&self, arc: &Arc, _destination: Option<NodeId>) -> bool {
        let declared = arc.edge.modes;
        declared.is_empty() || declared.intersects(self.modes)
    }

    fn adjust_cost(&self, arc: &Arc, _tentative: f64) -> Option<f64> {
        let declared = arc.edge.modes;
        if declared.len() <= 1 {
            return None;
        }
        let fastest_allowed = declared.intersection(self.modes).fastest()?;
        let fastest_declared = declared.fastest()?;
        if fastest_allowed == fastest_declared {
            return None;
        }
        // Base costs assume the fastest declared mode; rescale to the
        // fastest mode the query may actually use.
        Some(arc.cost() * fastest_declared.speed_kmh() / fastest_allowed.speed_kmh())
    }
}
