//! Public domain types for stations, routes, and lines.
//!
//! These mirror the network-layout feed. Identity is the ID: two values
//! with the same ID are the same entity, whatever their other attributes.

use netmon_core::{LineId, RouteId, StationId};

/// A network station.
#[derive(Clone, Debug)]
pub struct Station {
    pub id: StationId,
    pub name: String,
}

impl PartialEq for Station {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Station {}

/// A single possible journey across a set of stops in a specified
/// direction.
///
/// Well formed when: `stops` has at least 2 entries, `stops` starts with
/// `start_station_id` and ends with `end_station_id`, no stop repeats, and
/// `id` is unique across all routes of all lines.
#[derive(Clone, Debug)]
pub struct Route {
    pub id: RouteId,
    pub direction: String,
    pub line_id: LineId,
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub stops: Vec<StationId>,
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Route {}

/// A line: a named collection of routes sharing identity.
#[derive(Clone, Debug)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub routes: Vec<Route>,
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Line {}
