//! Error types shared across the routing engine.

use thiserror::Error;

use crate::graph::NodeId;
use crate::timetable::StopId;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Edge costs are travel durations and must never be negative.
    #[error("edge cost {cost} is negative")]
    NegativeEdgeCost { cost: f64 },

    /// An edge was added before both of its endpoints.
    #[error("edge endpoint {id} is not part of the graph")]
    MissingEndpoint { id: NodeId },

    /// A query referenced a node the graph does not contain.
    #[error("unknown node id {id}")]
    UnknownNode { id: NodeId },

    /// A node without coordinates cannot be translated to a transit stop.
    #[error("node {id} carries no coordinates")]
    NonSpatialNode { id: NodeId },

    /// A connection referenced a stop the timetable does not contain.
    #[error("unknown stop id {id}")]
    UnknownStop { id: StopId },

    /// Connections must not arrive before they depart.
    #[error("connection of trip {trip} arrives at {arrival} before departing at {departure}")]
    InvalidConnection {
        trip: usize,
        departure: u32,
        arrival: u32,
    },

    /// A query must name at least one source.
    #[error("query contains no source nodes")]
    EmptyQuery,

    /// Translation needs a timetable with at least one stop.
    #[error("timetable has no stops to translate to")]
    NoStopAvailable,

    /// Departure timestamps must be representable as a wall-clock time.
    #[error("departure timestamp {epoch_ms} ms is out of range")]
    InvalidDepartureTime { epoch_ms: i64 },

    /// An engine cannot be built over an empty road graph.
    #[error("road graph is empty")]
    EmptyGraph,
}
