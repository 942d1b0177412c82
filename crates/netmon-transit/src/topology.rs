//! Serde types for the network-layout JSON document.
//!
//! Top level: `stations`, `lines` (each with `routes`, each route with
//! `route_stops`), and `travel_times`.

use netmon_core::{LineId, RouteId, StationId};
use serde::{Deserialize, Serialize};

use crate::model::{Line, Route, Station};

/// The whole topology document.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TopologyDoc {
    pub stations: Vec<StationDoc>,
    pub lines: Vec<LineDoc>,
    pub travel_times: Vec<TravelTimeDoc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StationDoc {
    pub station_id: StationId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineDoc {
    pub line_id: LineId,
    pub name: String,
    pub routes: Vec<RouteDoc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RouteDoc {
    pub route_id: RouteId,
    pub direction: String,
    pub line_id: LineId,
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub route_stops: Vec<StationId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TravelTimeDoc {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub travel_time: u32,
}

impl From<StationDoc> for Station {
    fn from(doc: StationDoc) -> Self {
        Self {
            id: doc.station_id,
            name: doc.name,
        }
    }
}

impl From<RouteDoc> for Route {
    fn from(doc: RouteDoc) -> Self {
        Self {
            id: doc.route_id,
            direction: doc.direction,
            line_id: doc.line_id,
            start_station_id: doc.start_station_id,
            end_station_id: doc.end_station_id,
            stops: doc.route_stops,
        }
    }
}

impl From<LineDoc> for Line {
    fn from(doc: LineDoc) -> Self {
        Self {
            id: doc.line_id,
            name: doc.name,
            routes: doc.routes.into_iter().map(Route::from).collect(),
        }
    }
}
