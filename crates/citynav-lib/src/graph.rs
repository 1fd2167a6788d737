//! Road and transit network graph.
//!
//! Nodes carry optional coordinates and, for timed transit nodes, a seconds
//! since midnight event time. Edges are directed, non-negative-cost travel
//! durations tagged with the transportation modes that may use them. The
//! reverse view shares the forward adjacency storage instead of duplicating
//! every edge.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub type NodeId = usize;
pub type EdgeId = usize;

/// Seconds in a day, used to wrap schedule times around midnight.
pub const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Mean earth radius in metres, used by the crow-flies distance.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fastest speed any road vehicle reaches, in km/h. Dividing a crow-flies
/// distance by this yields an admissible travel-time lower bound.
pub const MAXIMAL_ROAD_SPEED_KMH: f64 = 200.0;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f32,
    pub lon: f32,
}

impl GeoPoint {
    pub fn new(lat: f32, lon: f32) -> Self {
        Self { lat, lon }
    }

    /// Equirectangular approximation of the distance to `other` in metres.
    /// Accurate enough at city scale and much cheaper than haversine.
    pub fn distance_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = f64::from(self.lat).to_radians();
        let lat2 = f64::from(other.lat).to_radians();
        let lon1 = f64::from(self.lon).to_radians();
        let lon2 = f64::from(other.lon).to_radians();
        let x = (lon2 - lon1) * ((lat1 + lat2) / 2.0).cos();
        let y = lat2 - lat1;
        x.hypot(y) * EARTH_RADIUS_M
    }
}

/// Converts km/h to m/s.
pub fn kmh_to_ms(kmh: f64) -> f64 {
    kmh / 3.6
}

/// Travel time in seconds over `distance_m` metres at `speed_kmh`.
pub fn travel_time_secs(distance_m: f64, speed_kmh: f64) -> f64 {
    distance_m / kmh_to_ms(speed_kmh)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Car,
    Tram,
    Bike,
    Foot,
}

impl TransportMode {
    pub const ALL: [TransportMode; 4] = [
        TransportMode::Car,
        TransportMode::Tram,
        TransportMode::Bike,
        TransportMode::Foot,
    ];

    /// Average speed assumed for the mode, in km/h.
    pub fn speed_kmh(self) -> f64 {
        match self {
            TransportMode::Car => 100.0,
            TransportMode::Tram => 40.0,
            TransportMode::Bike => 14.0,
            TransportMode::Foot => 5.0,
        }
    }

    fn bit(self) -> u8 {
        match self {
            TransportMode::Car => 1,
            TransportMode::Tram => 1 << 1,
            TransportMode::Bike => 1 << 2,
            TransportMode::Foot => 1 << 3,
        }
    }
}

/// Compact set of transportation modes. An empty set on an edge means the
/// edge carries no mode restriction at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeSet(u8);

impl ModeSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn single(mode: TransportMode) -> Self {
        Self(mode.bit())
    }

    /// Car, bike and foot, the modes that use road edges.
    pub fn all_road() -> Self {
        Self::single(TransportMode::Car)
            .with(TransportMode::Bike)
            .with(TransportMode::Foot)
    }

    #[must_use]
    pub fn with(self, mode: TransportMode) -> Self {
        Self(self.0 | mode.bit())
    }

    pub fn contains(self, mode: TransportMode) -> bool {
        self.0 & mode.bit() != 0
    }

    pub fn intersection(self, other: ModeSet) -> ModeSet {
        Self(self.0 & other.0)
    }

    pub fn intersects(self, other: ModeSet) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = TransportMode> {
        TransportMode::ALL
            .into_iter()
            .filter(move |mode| self.contains(*mode))
    }

    /// The fastest mode in the set, if any.
    pub fn fastest(self) -> Option<TransportMode> {
        self.iter()
            .max_by(|a, b| a.speed_kmh().total_cmp(&b.speed_kmh()))
    }
}

impl FromIterator<TransportMode> for ModeSet {
    fn from_iter<I: IntoIterator<Item = TransportMode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), ModeSet::with)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Street segment usable by road modes.
    Road,
    /// Vehicle movement between two timed transit nodes.
    Transit,
    /// Zero-or-waiting-cost connector, e.g. road node to transit departure.
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub position: Option<GeoPoint>,
    /// For timed transit nodes, the scheduled event time in seconds since
    /// midnight.
    pub time: Option<u32>,
}

impl Node {
    pub fn plain(id: NodeId) -> Self {
        Self {
            id,
            position: None,
            time: None,
        }
    }

    pub fn road(id: NodeId, lat: f32, lon: f32) -> Self {
        Self {
            id,
            position: Some(GeoPoint::new(lat, lon)),
            time: None,
        }
    }

    pub fn transit(id: NodeId, lat: f32, lon: f32, time: u32) -> Self {
        Self {
            id,
            position: Some(GeoPoint::new(lat, lon)),
            time: Some(time % SECONDS_PER_DAY),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub destination: NodeId,
    /// Travel duration in seconds, never negative.
    pub cost: f64,
    pub modes: ModeSet,
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source: NodeId,
        destination: NodeId,
        cost: f64,
        modes: ModeSet,
        kind: EdgeKind,
    ) -> Self {
        Self {
            id,
            source,
            destination,
            cost,
            modes,
            kind,
        }
    }

    pub fn road(id: EdgeId, source: NodeId, destination: NodeId, cost: f64) -> Self {
        Self::new(id, source, destination, cost, ModeSet::all_road(), EdgeKind::Road)
    }

    pub fn transit(id: EdgeId, source: NodeId, destination: NodeId, cost: f64) -> Self {
        Self::new(
            id,
            source,
            destination,
            cost,
            ModeSet::single(TransportMode::Tram),
            EdgeKind::Transit,
        )
    }

    /// Link edges start out free; the transit cost module replaces their
    /// cost with the waiting time at relaxation.
    pub fn link(id: EdgeId, source: NodeId, destination: NodeId) -> Self {
        Self::new(id, source, destination, 0.0, ModeSet::empty(), EdgeKind::Link)
    }
}

/// An edge viewed in a traversal direction. On the reverse view the
/// endpoints swap without the underlying edge being rewritten.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arc {
    pub edge: Edge,
    reversed: bool,
}

impl Arc {
    pub fn source(&self) -> NodeId {
        if self.reversed {
            self.edge.destination
        } else {
            self.edge.source
        }
    }

    pub fn destination(&self) -> NodeId {
        if self.reversed {
            self.edge.source
        } else {
            self.edge.destination
        }
    }

    pub fn cost(&self) -> f64 {
        self.edge.cost
    }
}

/// Outgoing arcs of a node under a fixed orientation.
pub struct ArcIter<'a> {
    inner: std::slice::Iter<'a, Edge>,
    reversed: bool,
}

impl Iterator for ArcIter<'_> {
    type Item = Arc;

    fn next(&mut self) -> Option<Arc> {
        self.inner.next().map(|edge| Arc {
            edge: *edge,
            reversed: self.reversed,
        })
    }
}

/// Read access shared by the forward graph and its reverse view, so the
/// search algorithms run unchanged in either direction.
pub trait GraphView {
    fn contains(&self, node: NodeId) -> bool;
    fn node(&self, id: NodeId) -> Option<&Node>;
    fn node_ids(&self) -> Box<dyn Iterator<Item = NodeId> + '_>;
    fn arcs_from(&self, node: NodeId) -> ArcIter<'_>;
    fn node_count(&self) -> usize;
}

#[derive(Debug, Default, Clone)]
pub struct Graph {
    nodes: HashMap<NodeId, Node>,
    outgoing: HashMap<NodeId, Vec<Edge>>,
    incoming: HashMap<NodeId, Vec<Edge>>,
    edge_count: usize,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, returning `false` if the id is already present. Existing
    /// nodes are never overwritten.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            return false;
        }
        self.nodes.insert(node.id, node);
        true
    }

    /// Adds a directed edge. Both endpoints must already be part of the
    /// graph and the cost must be non-negative.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        if edge.cost < 0.0 || edge.cost.is_nan() {
            return Err(Error::NegativeEdgeCost { cost: edge.cost });
        }
        for endpoint in [edge.source, edge.destination] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(Error::MissingEndpoint { id: endpoint });
            }
        }
        self.outgoing.entry(edge.source).or_default().push(edge);
        self.incoming.entry(edge.destination).or_default().push(edge);
        self.edge_count += 1;
        Ok(())
    }

    pub fn outgoing_edges(&self, node: NodeId) -> &[Edge] {
        self.outgoing.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn incoming_edges(&self, node: NodeId) -> &[Edge] {
        self.incoming.get(&node).map_or(&[], Vec::as_slice)
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Borrowing view with every edge flipped. No edges are copied.
    pub fn reversed(&self) -> ReversedGraph<'_> {
        ReversedGraph { inner: self }
    }
}

impl GraphView for Graph {
    fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn node_ids(&self) -> Box<dyn Iterator<Item = NodeId> + '_> {
        Box::new(self.nodes.keys().copied())
    }

    fn arcs_from(&self, node: NodeId) -> ArcIter<'_> {
        ArcIter {
            inner: self.outgoing_edges(node).iter(),
            reversed: false,
        }
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

pub struct ReversedGraph<'a> {
    inner: &'a Graph,
}

impl GraphView for ReversedGraph<'_> {
    fn contains(&self, node: NodeId) -> bool {
        self.inner.contains(node)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.inner.node(id)
    }

    fn node_ids(&self) -> Box<dyn Iterator<Item = NodeId> + '_> {
        self.inner.node_ids()
    }

    fn arcs_from(&self, node: NodeId) -> ArcIter<'_> {
        ArcIter {
            inner: self.inner.incoming_edges(node).iter(),
            reversed: true,
        }
    }

    fn node_count(&self) -> usize {
        self.inner.node_count()
    }
}
