//! Transit timetable: stops, trip connections and footpaths.
//!
//! Connections are kept in one list sorted by departure time, which is what
//! the connection scan consumes. Times are seconds since midnight; queries
//! close to midnight iterate the list with wraparound, revisiting the early
//! connections as next-day departures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::graph::GeoPoint;

pub type StopId = usize;
pub type TripId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub position: GeoPoint,
}

impl Stop {
    pub fn new(id: StopId, lat: f32, lon: f32) -> Self {
        Self {
            id,
            position: GeoPoint::new(lat, lon),
        }
    }
}

/// One vehicle movement between two consecutive stops of a trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub trip: TripId,
    /// Position of this connection within its trip, starting at zero.
    pub sequence_index: usize,
    pub dep_stop: StopId,
    pub arr_stop: StopId,
    /// Seconds since midnight.
    pub dep_time: u32,
    pub arr_time: u32,
}

/// A fixed-duration walk between two stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Footpath {
    pub dep_stop: StopId,
    pub arr_stop: StopId,
    /// Walking duration in seconds.
    pub duration: u32,
}

#[derive(Debug, Default, Clone)]
pub struct Timetable {
    stops: HashMap<StopId, Stop>,
    /// Sorted by departure time.
    connections: Vec<Connection>,
    /// Per trip, connections sorted by sequence index.
    trips: HashMap<TripId, Vec<Connection>>,
    footpaths: HashMap<StopId, Vec<Footpath>>,
    greatest_stop_id: Option<StopId>,
    greatest_trip_id: Option<TripId>,
}

impl Timetable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stop(&mut self, stop: Stop) {
        self.greatest_stop_id = Some(self.greatest_stop_id.map_or(stop.id, |id| id.max(stop.id)));
        self.stops.insert(stop.id, stop);
    }

    /// Adds connections in bulk and re-sorts the scan list once.
    pub fn add_connections<I>(&mut self, connections: I) -> Result<()>
    where
        I: IntoIterator<Item = Connection>,
    {
        for connection in connections {
            self.add_connection_unsorted(connection)?;
        }
        self.connections.sort_by_key(|c| (c.dep_time, c.arr_time));
        for trip in self.trips.values_mut() {
            trip.sort_by_key(|c| c.sequence_index);
        }
        Ok(())
    }

    fn add_connection_unsorted(&mut self, connection: Connection) -> Result<()> {
        for stop in [connection.dep_stop, connection.arr_stop] {
            if !self.stops.contains_key(&stop) {
                return Err(Error::UnknownStop { id: stop });
            }
        }
        if connection.arr_time < connection.dep_time {
            return Err(Error::InvalidConnection {
                trip: connection.trip,
                departure: connection.dep_time,
                arrival: connection.arr_time,
            });
        }
        self.greatest_trip_id = Some(
            self.greatest_trip_id
                .map_or(connection.trip, |id| id.max(connection.trip)),
        );
        self.trips.entry(connection.trip).or_default().push(connection);
        self.connections.push(connection);
        Ok(())
    }

    pub fn add_footpath(&mut self, footpath: Footpath) -> Result<()> {
        for stop in [footpath.dep_stop, footpath.arr_stop] {
            if !self.stops.contains_key(&stop) {
                return Err(Error::UnknownStop { id: stop });
            }
        }
        self.footpaths
            .entry(footpath.dep_stop)
            .or_default()
            .push(footpath);
        Ok(())
    }

    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.get(&id)
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// The connection of `trip` at `sequence_index`.
    pub fn trip_connection(&self, trip: TripId, sequence_index: usize) -> Option<&Connection> {
        self.trips.get(&trip)?.get(sequence_index)
    }

    pub fn outgoing_footpaths(&self, stop: StopId) -> &[Footpath] {
        self.footpaths.get(&stop).map_or(&[], Vec::as_slice)
    }

    /// Largest stop id seen so far; arrival arrays are sized by this.
    pub fn greatest_stop_id(&self) -> Option<StopId> {
        self.greatest_stop_id
    }

    pub fn greatest_trip_id(&self) -> Option<TripId> {
        self.greatest_trip_id
    }

    /// All connections departing at or after `time`, then the earlier ones
    /// as next-day departures. Every connection is yielded exactly once.
    pub fn connections_starting_since(
        &self,
        time: u32,
    ) -> impl Iterator<Item = &Connection> + '_ {
        let split = self.connections.partition_point(|c| c.dep_time < time);
        self.connections[split..]
            .iter()
            .chain(self.connections[..split].iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{connection, sample_timetable};

    #[test]
    fn connections_are_sorted_by_departure() {
        let table = sample_timetable();
        let times: Vec<u32> = table
            .connections_starting_since(0)
            .map(|c| c.dep_time)
            .collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted);
    }

    #[test]
    fn starting_since_wraps_around_midnight() {
        let table = sample_timetable();
        let all: Vec<u32> = table
            .connections_starting_since(0)
            .map(|c| c.dep_time)
            .collect();
        let wrapped: Vec<u32> = table
            .connections_starting_since(125)
            .map(|c| c.dep_time)
            .collect();
        assert_eq!(wrapped.len(), all.len());
        // Departures before 125 come last, as next-day services.
        assert!(wrapped[0] >= 125);
        assert_eq!(*wrapped.last().unwrap(), *all.first().unwrap());
    }

    #[test]
    fn connection_with_unknown_stop_is_rejected() {
        let mut table = Timetable::new();
        table.add_stop(Stop::new(0, 48.0, 11.0));
        let err = table
            .add_connections([connection(0, 0, 0, 99, 10, 20)])
            .unwrap_err();
        assert!(matches!(err, Error::UnknownStop { id: 99 }));
    }

    #[test]
    fn connection_arriving_before_departing_is_rejected() {
        let mut table = Timetable::new();
        table.add_stop(Stop::new(0, 48.0, 11.0));
        table.add_stop(Stop::new(1, 48.0, 11.1));
        let err = table
            .add_connections([connection(3, 0, 0, 1, 50, 40)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidConnection {
                trip: 3,
                departure: 50,
                arrival: 40,
            }
        ));
    }

    #[test]
    fn trip_connections_are_indexed_by_sequence() {
        let table = sample_timetable();
        let first = table.trip_connection(1, 0).unwrap();
        let second = table.trip_connection(1, 1).unwrap();
        assert_eq!(first.arr_stop, second.dep_stop);
        assert!(first.sequence_index < second.sequence_index);
        assert!(table.trip_connection(1, 9).is_none());
    }

    #[test]
    fn greatest_ids_track_inserts() {
        let table = sample_timetable();
        assert_eq!(table.greatest_stop_id(), Some(2));
        assert_eq!(table.greatest_trip_id(), Some(1));
    }
}
