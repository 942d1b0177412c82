//! Travel route query results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{LineId, RouteId, StationId};

/// One leg of a journey: a hop between two adjacent stations on a specific
/// line route.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelStep {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub line_id: LineId,
    pub route_id: RouteId,
    pub travel_time: u32,
}

/// A travel plan between two stations.
///
/// If the start and end station are the same, `steps` contains exactly one
/// self-step with zero travel time and empty line/route IDs. If there is no
/// valid route between the two stations, or either station is unknown,
/// `steps` is empty and `total_travel_time` is zero.
///
/// `total_travel_time` includes route-change penalties, so it may exceed the
/// sum of the per-step times.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelRoute {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
    pub total_travel_time: u32,
    pub steps: Vec<TravelStep>,
}

impl TravelRoute {
    /// The no-path encoding: empty steps, zero total.
    #[must_use]
    pub fn no_path(start: StationId, end: StationId) -> Self {
        Self {
            start_station_id: start,
            end_station_id: end,
            total_travel_time: 0,
            steps: Vec::new(),
        }
    }

    /// The same-station encoding: a single zero-time self-step.
    #[must_use]
    pub fn self_step(station: StationId) -> Self {
        Self {
            start_station_id: station.clone(),
            end_station_id: station.clone(),
            total_travel_time: 0,
            steps: vec![TravelStep {
                start_station_id: station.clone(),
                end_station_id: station,
                line_id: LineId::default(),
                route_id: RouteId::default(),
                travel_time: 0,
            }],
        }
    }

    /// Whether this route encodes "no path found".
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Display for TravelRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_path_is_empty() {
        let route = TravelRoute::no_path(StationId::from("a"), StationId::from("b"));
        assert!(route.is_empty());
        assert_eq!(route.total_travel_time, 0);
    }

    #[test]
    fn self_step_has_one_zero_step() {
        let route = TravelRoute::self_step(StationId::from("a"));
        assert_eq!(route.steps.len(), 1);
        assert_eq!(route.steps[0].travel_time, 0);
        assert_eq!(route.steps[0].start_station_id, route.steps[0].end_station_id);
        assert!(route.steps[0].line_id.is_empty());
        assert!(route.steps[0].route_id.is_empty());
    }

    #[test]
    fn serialize_matches_wire_format() {
        let route = TravelRoute {
            start_station_id: StationId::from("a"),
            end_station_id: StationId::from("c"),
            total_travel_time: 20,
            steps: vec![TravelStep {
                start_station_id: StationId::from("a"),
                end_station_id: StationId::from("b"),
                line_id: LineId::from("l1"),
                route_id: RouteId::from("r1"),
                travel_time: 10,
            }],
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["start_station_id"], "a");
        assert_eq!(json["total_travel_time"], 20);
        assert_eq!(json["steps"][0]["line_id"], "l1");
        assert_eq!(json["steps"][0]["travel_time"], 10);
    }

    #[test]
    fn json_roundtrip() {
        let route = TravelRoute {
            start_station_id: StationId::from("a"),
            end_station_id: StationId::from("b"),
            total_travel_time: 7,
            steps: vec![TravelStep {
                start_station_id: StationId::from("a"),
                end_station_id: StationId::from("b"),
                line_id: LineId::from("l1"),
                route_id: RouteId::from("r1"),
                travel_time: 7,
            }],
        };
        let json = serde_json::to_string(&route).unwrap();
        let back: TravelRoute = serde_json::from_str(&json).unwrap();
        assert_eq!(back, route);
    }

    #[test]
    fn display_emits_json() {
        let route = TravelRoute::no_path(StationId::from("a"), StationId::from("b"));
        let text = route.to_string();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["steps"], serde_json::json!([]));
    }
}
