//! Pathfinding over the transport network.
//!
//! Both algorithms share one search state: a [`PathStop`] is a node plus
//! the edge used to reach it. Keying on the pair is essential — the
//! route-change penalty makes an edge's effective weight depend on the
//! previous edge's route, so node-keyed relaxation would be unsound.

mod dijkstra;
mod quiet;

use std::collections::HashSet;

use netmon_core::{StationId, TravelRoute, TravelStep};

use crate::network::{EdgeIx, NodeIx, TransportNetwork};

pub(crate) use quiet::quiet;

/// A stop on a path: the node and the edge taken to get there. The path
/// origin has no incoming edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct PathStop {
    pub(crate) node: NodeIx,
    pub(crate) edge: Option<EdgeIx>,
}

/// A path through the graph with its total travel time, route-change
/// penalties included.
#[derive(Clone, Debug)]
pub(crate) struct Path {
    /// Stops from origin to destination, origin first.
    pub(crate) stops: Vec<PathStop>,
    pub(crate) total_time: u32,
}

/// The fastest path between two distinct nodes, or `None` when no path
/// exists.
pub(crate) fn fastest(net: &TransportNetwork, from: NodeIx, to: NodeIx) -> Option<Path> {
    dijkstra::shortest_path(
        net,
        PathStop { node: from, edge: None },
        0,
        to,
        &HashSet::new(),
        &HashSet::new(),
    )
}

/// Convert an internal path to the public travel-route form. Step times
/// are raw edge weights; the total additionally carries the route-change
/// penalties.
pub(crate) fn to_travel_route(
    net: &TransportNetwork,
    start: StationId,
    end: StationId,
    path: &Path,
) -> TravelRoute {
    let mut steps = Vec::with_capacity(path.stops.len().saturating_sub(1));
    for pair in path.stops.windows(2) {
        let Some(edge_ix) = pair[1].edge else {
            continue;
        };
        let edge = &net.edges[edge_ix.0 as usize];
        let route = &net.routes[edge.route.0 as usize];
        let line = &net.lines[route.line.0 as usize];
        steps.push(TravelStep {
            start_station_id: net.nodes[pair[0].node.0 as usize].id.clone(),
            end_station_id: net.nodes[pair[1].node.0 as usize].id.clone(),
            line_id: line.id.clone(),
            route_id: route.id.clone(),
            travel_time: edge.travel_time,
        });
    }
    TravelRoute {
        start_station_id: start,
        end_station_id: end,
        total_travel_time: path.total_time,
        steps,
    }
}

/// Travel time along a stop sequence, applying the route-change penalty
/// at every switch of owning route.
pub(crate) fn path_time(net: &TransportNetwork, stops: &[PathStop]) -> u32 {
    let mut total = 0;
    for pair in stops.windows(2) {
        let Some(edge_ix) = pair[1].edge else {
            continue;
        };
        let edge = &net.edges[edge_ix.0 as usize];
        total += edge.travel_time;
        if let Some(prev_edge) = pair[0].edge {
            if net.edges[prev_edge.0 as usize].route != edge.route {
                total += net.route_change_penalty;
            }
        }
    }
    total
}

/// Crowding of a path: the sum of passenger counts over its intermediate
/// stops. Endpoints do not contribute.
pub(crate) fn path_crowding(net: &TransportNetwork, path: &Path) -> i64 {
    if path.stops.len() < 3 {
        return 0;
    }
    path.stops[1..path.stops.len() - 1]
        .iter()
        .map(|stop| net.nodes[stop.node.0 as usize].passenger_count)
        .sum()
}
