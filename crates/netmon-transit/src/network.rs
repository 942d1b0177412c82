//! The transport network graph.
//!
//! Nodes, edges, routes, and lines live in arenas and reference each other
//! by index, so the graph has no ownership cycles and Dijkstra scans dense
//! memory. The structure is built once from the topology document; only
//! the per-node passenger counters mutate afterwards.

use std::collections::HashMap;

use netmon_core::{EventKind, LineId, PassengerEvent, RouteId, StationId, TravelRoute};
use tracing::debug;

use crate::error::NetworkError;
use crate::model::{Line, Route, Station};
use crate::routing;
use crate::topology::TopologyDoc;

/// Minutes added when a journey continues on a different route than the
/// one it arrived on.
pub const DEFAULT_ROUTE_CHANGE_PENALTY: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct NodeIx(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct EdgeIx(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct RouteIx(pub(crate) u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct LineIx(pub(crate) u32);

/// A station in the graph.
#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) id: StationId,
    pub(crate) name: String,
    /// May go negative: event capture can begin mid-day, recording more
    /// exits than entries.
    pub(crate) passenger_count: i64,
    /// Edges leaving this station, one per route passing through.
    pub(crate) edges: Vec<EdgeIx>,
}

/// A directed connection between two adjacent stops, owned by one route.
#[derive(Debug)]
pub(crate) struct Edge {
    pub(crate) route: RouteIx,
    pub(crate) to: NodeIx,
    pub(crate) travel_time: u32,
}

#[derive(Debug)]
pub(crate) struct RouteRecord {
    pub(crate) id: RouteId,
    pub(crate) line: LineIx,
    pub(crate) stops: Vec<NodeIx>,
}

#[derive(Debug)]
pub(crate) struct LineRecord {
    pub(crate) id: LineId,
    pub(crate) name: String,
    pub(crate) routes: Vec<RouteIx>,
}

/// The live transport network.
#[derive(Debug)]
pub struct TransportNetwork {
    pub(crate) nodes: Vec<Node>,
    pub(crate) edges: Vec<Edge>,
    pub(crate) routes: Vec<RouteRecord>,
    pub(crate) lines: Vec<LineRecord>,
    station_index: HashMap<StationId, NodeIx>,
    line_index: HashMap<LineId, LineIx>,
    route_index: HashMap<RouteId, RouteIx>,
    /// Routes terminating at a node. A terminal stop has no departing edge
    /// for its route, so `routes_serving_station` needs this reverse index.
    terminal_routes: HashMap<NodeIx, Vec<RouteIx>>,
    pub(crate) route_change_penalty: u32,
}

impl TransportNetwork {
    /// An empty network with the default route-change penalty.
    #[must_use]
    pub fn new() -> Self {
        Self::with_route_change_penalty(DEFAULT_ROUTE_CHANGE_PENALTY)
    }

    /// An empty network with a custom route-change penalty in minutes.
    #[must_use]
    pub fn with_route_change_penalty(penalty: u32) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            routes: Vec::new(),
            lines: Vec::new(),
            station_index: HashMap::new(),
            line_index: HashMap::new(),
            route_index: HashMap::new(),
            terminal_routes: HashMap::new(),
            route_change_penalty: penalty,
        }
    }

    /// Populate the network from a topology document: stations, then
    /// lines, then travel times.
    ///
    /// Returns `Ok(false)` if stations and lines were ingested but some
    /// travel times could not be applied (e.g. a travel time between
    /// non-adjacent stations).
    pub fn populate(&mut self, doc: &TopologyDoc) -> Result<bool, NetworkError> {
        for station in &doc.stations {
            self.insert_station(station.clone().into())?;
        }
        for line in &doc.lines {
            self.insert_line(&line.clone().into())?;
        }
        let mut complete = true;
        for tt in &doc.travel_times {
            let applied =
                self.set_travel_time(&tt.start_station_id, &tt.end_station_id, tt.travel_time);
            if !applied {
                debug!(
                    start = %tt.start_station_id,
                    end = %tt.end_station_id,
                    "travel time not applied: stations are not adjacent"
                );
                complete = false;
            }
        }
        Ok(complete)
    }

    /// Add a station. Fails if the ID is already present.
    pub fn add_station(&mut self, station: Station) -> bool {
        self.insert_station(station).is_ok()
    }

    /// Add a line and all its routes. All-or-nothing: if any route is
    /// invalid, the network is left untouched.
    pub fn add_line(&mut self, line: &Line) -> bool {
        self.insert_line(line).is_ok()
    }

    /// Record a passenger event. Fails only if the station is unknown.
    pub fn record_passenger_event(&mut self, event: &PassengerEvent) -> bool {
        let Some(&node) = self.station_index.get(&event.station_id) else {
            return false;
        };
        let node = &mut self.nodes[node.0 as usize];
        match event.kind {
            EventKind::In => node.passenger_count += 1,
            EventKind::Out => node.passenger_count -= 1,
        }
        true
    }

    /// The number of passengers currently recorded at a station. The count
    /// can be negative.
    pub fn passenger_count(&self, station: &StationId) -> Result<i64, NetworkError> {
        let node = self
            .station_index
            .get(station)
            .ok_or_else(|| NetworkError::UnknownStation(station.clone()))?;
        Ok(self.nodes[node.0 as usize].passenger_count)
    }

    /// The display name of a station.
    #[must_use]
    pub fn station_name(&self, station: &StationId) -> Option<&str> {
        let node = self.station_index.get(station)?;
        Some(&self.nodes[node.0 as usize].name)
    }

    /// The display name of a line.
    #[must_use]
    pub fn line_name(&self, line: &LineId) -> Option<&str> {
        let ix = self.line_index.get(line)?;
        Some(&self.lines[ix.0 as usize].name)
    }

    /// The routes belonging to a line, in layout order.
    #[must_use]
    pub fn line_routes(&self, line: &LineId) -> Vec<RouteId> {
        let Some(ix) = self.line_index.get(line) else {
            return Vec::new();
        };
        self.lines[ix.0 as usize]
            .routes
            .iter()
            .map(|&route| self.routes[route.0 as usize].id.clone())
            .collect()
    }

    /// All routes serving a station: routes departing from it plus routes
    /// terminating at it. Empty if the station is unknown or unserved.
    #[must_use]
    pub fn routes_serving_station(&self, station: &StationId) -> Vec<RouteId> {
        let Some(&node) = self.station_index.get(station) else {
            return Vec::new();
        };
        let mut routes: Vec<RouteId> = self.nodes[node.0 as usize]
            .edges
            .iter()
            .map(|&edge| self.routes[self.edges[edge.0 as usize].route.0 as usize].id.clone())
            .collect();
        if let Some(terminal) = self.terminal_routes.get(&node) {
            routes.extend(
                terminal
                    .iter()
                    .map(|&route| self.routes[route.0 as usize].id.clone()),
            );
        }
        routes
    }

    /// Set the travel time between two adjacent stations. The value is
    /// written to every edge directly connecting the pair, in both
    /// directions, across all parallel routes. Fails if no such edge
    /// exists.
    pub fn set_travel_time(&mut self, a: &StationId, b: &StationId, minutes: u32) -> bool {
        let (Some(&node_a), Some(&node_b)) =
            (self.station_index.get(a), self.station_index.get(b))
        else {
            return false;
        };
        let mut found = false;
        for (from, to) in [(node_a, node_b), (node_b, node_a)] {
            for edge in self.nodes[from.0 as usize].edges.clone() {
                if self.edges[edge.0 as usize].to == to {
                    self.edges[edge.0 as usize].travel_time = minutes;
                    found = true;
                }
            }
        }
        found
    }

    /// The travel time between two adjacent stations, the same in both
    /// directions across all routes. Returns 0 if the stations are not
    /// adjacent, unknown, or the same station.
    #[must_use]
    pub fn travel_time(&self, a: &StationId, b: &StationId) -> u32 {
        let (Some(&node_a), Some(&node_b)) =
            (self.station_index.get(a), self.station_index.get(b))
        else {
            return 0;
        };
        for (from, to) in [(node_a, node_b), (node_b, node_a)] {
            for &edge in &self.nodes[from.0 as usize].edges {
                if self.edges[edge.0 as usize].to == to {
                    return self.edges[edge.0 as usize].travel_time;
                }
            }
        }
        0
    }

    /// The cumulative travel time between two stations along a specific
    /// route, walking the stop sequence from the first occurrence of `a`.
    /// Returns 0 if either station is absent from the route or appears in
    /// reverse order.
    #[must_use]
    pub fn travel_time_on_route(
        &self,
        line: &LineId,
        route: &RouteId,
        a: &StationId,
        b: &StationId,
    ) -> u32 {
        let Some(route_ix) = self.find_route(line, route) else {
            return 0;
        };
        let (Some(&node_a), Some(&node_b)) =
            (self.station_index.get(a), self.station_index.get(b))
        else {
            return 0;
        };

        let mut total = 0;
        let mut found_a = false;
        for &stop in &self.routes[route_ix.0 as usize].stops {
            if stop == node_a {
                found_a = true;
            }
            if stop == node_b {
                return total;
            }
            if found_a {
                let Some(edge) = self.edge_for_route(stop, route_ix) else {
                    return 0;
                };
                total += self.edges[edge.0 as usize].travel_time;
            }
        }
        0
    }

    /// The fastest travel route from `a` to `b`, minimising travel time
    /// with the route-change penalty applied at every route switch.
    #[must_use]
    pub fn fastest_travel_route(&self, a: &StationId, b: &StationId) -> TravelRoute {
        let (Some(&node_a), Some(&node_b)) =
            (self.station_index.get(a), self.station_index.get(b))
        else {
            return TravelRoute::no_path(a.clone(), b.clone());
        };
        if node_a == node_b {
            return TravelRoute::self_step(a.clone());
        }
        match routing::fastest(self, node_a, node_b) {
            Some(path) => routing::to_travel_route(self, a.clone(), b.clone(), &path),
            None => TravelRoute::no_path(a.clone(), b.clone()),
        }
    }

    /// A quiet alternative to the fastest route.
    ///
    /// Explores up to `max_n_paths` simple paths whose travel time stays
    /// within `1 + max_slowdown_pc` of the fastest, and returns the least
    /// crowded one — but only when its crowding undercuts the fastest
    /// path's by at least `min_quietness_pc`. Otherwise the fastest route
    /// is returned unchanged.
    #[must_use]
    pub fn quiet_travel_route(
        &self,
        a: &StationId,
        b: &StationId,
        max_slowdown_pc: f64,
        min_quietness_pc: f64,
        max_n_paths: usize,
    ) -> TravelRoute {
        let (Some(&node_a), Some(&node_b)) =
            (self.station_index.get(a), self.station_index.get(b))
        else {
            return TravelRoute::no_path(a.clone(), b.clone());
        };
        if node_a == node_b {
            return TravelRoute::self_step(a.clone());
        }
        let selected = routing::quiet(
            self,
            node_a,
            node_b,
            max_slowdown_pc,
            min_quietness_pc,
            max_n_paths,
        );
        match selected {
            Some(path) => routing::to_travel_route(self, a.clone(), b.clone(), &path),
            None => TravelRoute::no_path(a.clone(), b.clone()),
        }
    }

    // ── Internal construction ───────────────────────────────────────────

    fn insert_station(&mut self, station: Station) -> Result<(), NetworkError> {
        if self.station_index.contains_key(&station.id) {
            return Err(NetworkError::DuplicateStation(station.id));
        }
        let ix = NodeIx(self.nodes.len() as u32);
        self.station_index.insert(station.id.clone(), ix);
        self.nodes.push(Node {
            id: station.id,
            name: station.name,
            passenger_count: 0,
            edges: Vec::new(),
        });
        Ok(())
    }

    fn insert_line(&mut self, line: &Line) -> Result<(), NetworkError> {
        if self.line_index.contains_key(&line.id) {
            return Err(NetworkError::DuplicateLine(line.id.clone()));
        }

        // Validate every route before touching the graph, so a bad route
        // cannot leave a partially added line behind.
        let mut resolved: Vec<(&Route, Vec<NodeIx>)> = Vec::with_capacity(line.routes.len());
        for route in &line.routes {
            let duplicate = self.route_index.contains_key(&route.id)
                || resolved.iter().any(|(seen, _)| seen.id == route.id);
            if duplicate {
                return Err(NetworkError::DuplicateRoute(route.id.clone()));
            }
            if route.line_id != line.id {
                return Err(NetworkError::ForeignRoute {
                    route: route.id.clone(),
                    line: line.id.clone(),
                });
            }
            let mut stops = Vec::with_capacity(route.stops.len());
            for stop in &route.stops {
                let node = self.station_index.get(stop).ok_or_else(|| {
                    NetworkError::UnknownRouteStop {
                        route: route.id.clone(),
                        station: stop.clone(),
                    }
                })?;
                stops.push(*node);
            }
            resolved.push((route, stops));
        }

        let line_ix = LineIx(self.lines.len() as u32);
        let mut route_ixs = Vec::with_capacity(resolved.len());
        for (route, stops) in resolved {
            let route_ix = RouteIx(self.routes.len() as u32);
            for pair in stops.windows(2) {
                let edge_ix = EdgeIx(self.edges.len() as u32);
                self.edges.push(Edge {
                    route: route_ix,
                    to: pair[1],
                    travel_time: 0,
                });
                self.nodes[pair[0].0 as usize].edges.push(edge_ix);
            }
            if let Some(&last) = stops.last() {
                self.terminal_routes.entry(last).or_default().push(route_ix);
            }
            self.route_index.insert(route.id.clone(), route_ix);
            self.routes.push(RouteRecord {
                id: route.id.clone(),
                line: line_ix,
                stops,
            });
            route_ixs.push(route_ix);
        }
        self.line_index.insert(line.id.clone(), line_ix);
        self.lines.push(LineRecord {
            id: line.id.clone(),
            name: line.name.clone(),
            routes: route_ixs,
        });
        Ok(())
    }

    fn find_route(&self, line: &LineId, route: &RouteId) -> Option<RouteIx> {
        let line_ix = self.line_index.get(line)?;
        let route_ix = self.route_index.get(route)?;
        (self.routes[route_ix.0 as usize].line == *line_ix).then_some(*route_ix)
    }

    /// The edge leaving `node` on `route`, if any.
    pub(crate) fn edge_for_route(&self, node: NodeIx, route: RouteIx) -> Option<EdgeIx> {
        self.nodes[node.0 as usize]
            .edges
            .iter()
            .copied()
            .find(|&edge| self.edges[edge.0 as usize].route == route)
    }
}

impl Default for TransportNetwork {
    fn default() -> Self {
        Self::new()
    }
}
