//! Earliest-arrival queries over a timetable via the Connection Scan
//! Algorithm.
//!
//! One linear pass over the departure-sorted connection list, no priority
//! queue. Per stop the scan keeps the best known arrival and a journey
//! pointer (enter connection, exit connection, final footpath) from which
//! the route is rebuilt afterwards. Times near midnight wrap: connections
//! departing before the query time are treated as next-day services.

use std::collections::HashMap;

use tracing::trace;

use crate::graph::{Edge, EdgeKind, ModeSet, TransportMode, SECONDS_PER_DAY};
use crate::path::{Path, PathSegment};
use crate::timetable::{Connection, Footpath, StopId, Timetable};

const UNREACHED: u32 = u32::MAX;

/// A departure location and time for a timetable query, seconds since
/// midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitQuery {
    pub stop: StopId,
    pub time: u32,
}

impl TransitQuery {
    pub fn new(stop: StopId, time: u32) -> Self {
        Self {
            stop,
            time: time % SECONDS_PER_DAY,
        }
    }
}

/// How the scan reached a stop: board `enter`, leave the vehicle at `exit`,
/// then take `footpath`. A reflexive zero-duration footpath marks a stop
/// reached directly by the exit connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JourneyPointer {
    pub enter: Connection,
    pub exit: Connection,
    pub footpath: Footpath,
}

/// Arrival times and journey pointers produced by one scan.
pub struct ScanResult {
    reference: u32,
    arrival: Vec<u32>,
    journeys: Vec<Option<JourneyPointer>>,
}

impl ScanResult {
    /// Arrival at `stop`, normalized so next-day arrivals exceed
    /// [`SECONDS_PER_DAY`]. `None` when unreachable.
    pub fn arrival_time(&self, stop: StopId) -> Option<u32> {
        match self.arrival.get(stop) {
            Some(&time) if time != UNREACHED => Some(time),
            _ => None,
        }
    }

    /// Travel duration in seconds from the earliest query time.
    pub fn duration(&self, stop: StopId) -> Option<u32> {
        self.arrival_time(stop).map(|time| time - self.reference)
    }

    fn journey(&self, stop: StopId) -> Option<&JourneyPointer> {
        self.journeys.get(stop)?.as_ref()
    }
}

pub struct ConnectionScan<'a> {
    table: &'a Timetable,
}

impl<'a> ConnectionScan<'a> {
    pub fn new(table: &'a Timetable) -> Self {
        Self { table }
    }

    /// Scans from `sources`; with a destination the scan stops as soon as
    /// no remaining connection can improve it.
    pub fn earliest_arrival(
        &self,
        sources: &[TransitQuery],
        destination: Option<StopId>,
    ) -> ScanResult {
        let stops = self.table.greatest_stop_id().map_or(0, |id| id + 1);
        let trips = self.table.greatest_trip_id().map_or(0, |id| id + 1);
        // A destination outside the timetable can never be reached; without
        // the early break the scan just runs to the end.
        let destination = destination.filter(|&goal| goal < stops);
        let mut arrival = vec![UNREACHED; stops];
        let mut journeys: Vec<Option<JourneyPointer>> = vec![None; stops];
        let mut boarded: Vec<Option<Connection>> = vec![None; trips];

        let Some(reference) = sources.iter().map(|source| source.time).min() else {
            return ScanResult {
                reference: 0,
                arrival,
                journeys,
            };
        };

        for source in sources {
            if source.stop >= stops {
                continue;
            }
            arrival[source.stop] = arrival[source.stop].min(source.time);
            for footpath in self.table.outgoing_footpaths(source.stop) {
                let reached = source.time + footpath.duration;
                if reached < arrival[footpath.arr_stop] {
                    arrival[footpath.arr_stop] = reached;
                }
            }
        }

        let mut scanned = 0_usize;
        for connection in self.table.connections_starting_since(reference) {
            let dep = normalize(connection.dep_time, reference);
            let arr = dep + (connection.arr_time - connection.dep_time);

            if let Some(goal) = destination {
                if arrival[goal] <= dep {
                    break;
                }
            }
            scanned += 1;

            let enter = match boarded[connection.trip] {
                Some(enter) => enter,
                None => {
                    if arrival[connection.dep_stop] > dep {
                        continue;
                    }
                    boarded[connection.trip] = Some(*connection);
                    *connection
                }
            };

            if arr < arrival[connection.arr_stop] {
                arrival[connection.arr_stop] = arr;
                journeys[connection.arr_stop] = Some(JourneyPointer {
                    enter,
                    exit: *connection,
                    footpath: reflexive(connection.arr_stop),
                });
                for footpath in self.table.outgoing_footpaths(connection.arr_stop) {
                    let reached = arr + footpath.duration;
                    if reached < arrival[footpath.arr_stop] {
                        arrival[footpath.arr_stop] = reached;
                        journeys[footpath.arr_stop] = Some(JourneyPointer {
                            enter,
                            exit: *connection,
                            footpath: *footpath,
                        });
                    }
                }
            }
        }
        trace!(scanned, "connection scan finished");

        ScanResult {
            reference,
            arrival,
            journeys,
        }
    }

    /// The journey behind the earliest arrival, rebuilt from the pointer
    /// chain into a stop-id path of tram and footpath segments.
    pub fn shortest_path(&self, sources: &[TransitQuery], destination: StopId) -> Option<Path> {
        let result = self.earliest_arrival(sources, Some(destination));
        let arrival_at = result.arrival_time(destination)?;
        let reference = result.reference;

        if result.journey(destination).is_none() {
            if sources.iter().any(|source| source.stop == destination) {
                return Some(Path::empty(destination));
            }
            // Reached by an initial footpath alone.
            let (source, footpath) = sources.iter().find_map(|source| {
                self.table
                    .outgoing_footpaths(source.stop)
                    .iter()
                    .find(|fp| fp.arr_stop == destination && source.time + fp.duration == arrival_at)
                    .map(|fp| (source, fp))
            })?;
            let edge = foot_edge(0, source.stop, destination);
            return Path::from_segments(
                vec![PathSegment::new(edge, f64::from(footpath.duration))],
                true,
            );
        }

        let mut segments = Vec::new();
        let mut next_id = 0;
        let mut current_stop = destination;
        let mut current_time = arrival_at;

        while let Some(pointer) = result.journey(current_stop).copied() {
            let exit_arr = {
                let dep = normalize(pointer.exit.dep_time, reference);
                dep + (pointer.exit.arr_time - pointer.exit.dep_time)
            };
            if pointer.footpath.dep_stop != pointer.footpath.arr_stop
                || pointer.footpath.duration > 0
            {
                let edge = foot_edge(next_id, pointer.exit.arr_stop, current_stop);
                next_id += 1;
                segments.push(PathSegment::new(edge, f64::from(current_time - exit_arr)));
            }

            let trip = pointer.exit.trip;
            let mut time = exit_arr;
            let mut sequence = pointer.exit.sequence_index;
            loop {
                let connection = self.table.trip_connection(trip, sequence)?;
                let dep = normalize(connection.dep_time, reference);
                let edge = tram_edge(next_id, connection);
                next_id += 1;
                segments.push(PathSegment::new(edge, f64::from(time - dep)));
                time = dep;
                if sequence == pointer.enter.sequence_index {
                    break;
                }
                sequence -= 1;
            }

            current_stop = pointer.enter.dep_stop;
            current_time = time;
        }

        Path::from_segments(segments, true)
    }

    /// Duration in seconds of the fastest journey.
    pub fn shortest_path_cost(&self, sources: &[TransitQuery], destination: StopId) -> Option<f64> {
        self.earliest_arrival(sources, Some(destination))
            .duration(destination)
            .map(f64::from)
    }

    /// Travel durations to every reachable stop.
    pub fn costs_reachable(&self, sources: &[TransitQuery]) -> HashMap<StopId, f64> {
        let result = self.earliest_arrival(sources, None);
        (0..result.arrival.len())
            .filter_map(|stop| result.duration(stop).map(|d| (stop, f64::from(d))))
            .collect()
    }
}

/// Treats times before the scan's starting time as belonging to the next
/// day.
fn normalize(time: u32, reference: u32) -> u32 {
    if time < reference {
        time + SECONDS_PER_DAY
    } else {
        time
    }
}

fn reflexive(stop: StopId) -> Footpath {
    Footpath {
        dep_stop: stop,
        arr_stop: stop,
        duration: 0,
    }
}

fn foot_edge(id: usize, source: StopId, destination: StopId) -> Edge {
    Edge::new(
        id,
        source,
        destination,
        0.0,
        ModeSet::single(TransportMode::Foot),
        EdgeKind::Transit,
    )
}

fn tram_edge(id: usize, connection: &Connection) -> Edge {
    Edge::new(
        id,
        connection.dep_stop,
        connection.arr_stop,
        0.0,
        ModeSet::single(TransportMode::Tram),
        EdgeKind::Transit,
    )
}
