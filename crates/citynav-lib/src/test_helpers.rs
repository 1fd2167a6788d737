//! Shared fixtures for unit tests.

use crate::graph::{travel_time_secs, Edge, Graph, GraphView, Node, TransportMode};
use crate::timetable::{Connection, Stop, Timetable};

/// Nodes `0..n` chained by unit-cost road edges, forward direction only.
pub fn line_graph(n: usize) -> Graph {
    let mut graph = Graph::new();
    for id in 0..n {
        graph.add_node(Node::plain(id));
    }
    for id in 0..n.saturating_sub(1) {
        graph
            .add_edge(Edge::road(id, id, id + 1, 1.0))
            .expect("line edge");
    }
    graph
}

/// Two routes from 0 to 3: an expensive one over 1 and a cheap one over 2.
pub fn diamond_graph() -> Graph {
    let mut graph = Graph::new();
    for id in 0..4 {
        graph.add_node(Node::plain(id));
    }
    graph.add_edge(Edge::road(0, 0, 1, 2.0)).expect("edge");
    graph.add_edge(Edge::road(1, 0, 2, 1.0)).expect("edge");
    graph.add_edge(Edge::road(2, 1, 3, 5.0)).expect("edge");
    graph.add_edge(Edge::road(3, 2, 3, 2.0)).expect("edge");
    graph
}

/// A `width` by `height` grid of road nodes with coordinates, connected to
/// their four neighbors in both directions. Edge costs are car travel times
/// over the crow-flies distance, so every crow-flies estimate stays
/// admissible.
pub fn spatial_grid_graph(width: usize, height: usize) -> Graph {
    let mut graph = Graph::new();
    let node_id = |row: usize, col: usize| row * width + col;
    for row in 0..height {
        for col in 0..width {
            let lat = 48.0 + 0.01 * row as f32;
            let lon = 11.0 + 0.01 * col as f32;
            graph.add_node(Node::road(node_id(row, col), lat, lon));
        }
    }
    let mut next_edge = 0;
    let mut connect = |graph: &mut Graph, a: usize, b: usize| {
        let distance = graph
            .node(a)
            .and_then(|node| node.position)
            .zip(graph.node(b).and_then(|node| node.position))
            .map(|(p, q)| p.distance_m(&q))
            .expect("grid nodes have positions");
        let cost = travel_time_secs(distance, TransportMode::Car.speed_kmh());
        graph.add_edge(Edge::road(next_edge, a, b, cost)).expect("grid edge");
        next_edge += 1;
        graph.add_edge(Edge::road(next_edge, b, a, cost)).expect("grid edge");
        next_edge += 1;
    };
    for row in 0..height {
        for col in 0..width {
            if col + 1 < width {
                connect(&mut graph, node_id(row, col), node_id(row, col + 1));
            }
            if row + 1 < height {
                connect(&mut graph, node_id(row, col), node_id(row + 1, col));
            }
        }
    }
    graph
}

pub fn connection(
    trip: usize,
    sequence_index: usize,
    dep_stop: usize,
    arr_stop: usize,
    dep_time: u32,
    arr_time: u32,
) -> Connection {
    Connection {
        trip,
        sequence_index,
        dep_stop,
        arr_stop,
        dep_time,
        arr_time,
    }
}

/// Three stops on a diagonal and one two-leg trip across them, departing
/// stop 0 at 100 and reaching stop 2 at 150.
pub fn sample_timetable() -> Timetable {
    let mut table = Timetable::new();
    table.add_stop(Stop::new(0, 48.0, 11.0));
    table.add_stop(Stop::new(1, 48.1, 11.1));
    table.add_stop(Stop::new(2, 48.2, 11.2));
    table
        .add_connections([
            connection(1, 0, 0, 1, 100, 120),
            connection(1, 1, 1, 2, 130, 150),
        ])
        .expect("sample connections");
    table
}
