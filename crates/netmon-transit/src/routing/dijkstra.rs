//! Dijkstra's algorithm over `(node, incoming edge)` states.
//!
//! Differences from the textbook version, both forced by the route-change
//! penalty:
//!
//! - Distance and predecessor maps are keyed on [`PathStop`], not on the
//!   node. The same node reached via different routes has different
//!   onward costs.
//! - Popping the goal does not end the search, and a state is re-queued
//!   whenever a shorter distance is found for it: a better predecessor
//!   (e.g. one avoiding a route change) can surface after the goal was
//!   first seen, and everything downstream must be re-relaxed.
//!
//! Supports warm starts (a non-zero starting distance and a preset
//! incoming edge) and banned node/edge sets so the k-shortest-paths
//! search can reuse it for spur paths.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::network::{EdgeIx, NodeIx, TransportNetwork};

use super::{Path, PathStop};

struct QueueEntry {
    dist: u32,
    /// Insertion sequence; makes ties pop in discovery order.
    seq: u64,
    stop: PathStop,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: reversed on distance, then on discovery order.
        other
            .dist
            .cmp(&self.dist)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The shortest path from `start` (at distance `start_dist`, arriving via
/// `start.edge`) to any state at `goal`, avoiding banned nodes and edges.
pub(crate) fn shortest_path(
    net: &TransportNetwork,
    start: PathStop,
    start_dist: u32,
    goal: NodeIx,
    banned_nodes: &HashSet<NodeIx>,
    banned_edges: &HashSet<EdgeIx>,
) -> Option<Path> {
    let mut dist: HashMap<PathStop, u32> = HashMap::new();
    let mut prev: HashMap<PathStop, PathStop> = HashMap::new();
    let mut queue = BinaryHeap::new();
    let mut seq = 0u64;

    dist.insert(start, start_dist);
    queue.push(QueueEntry {
        dist: start_dist,
        seq,
        stop: start,
    });

    while let Some(entry) = queue.pop() {
        // Stale entry: a shorter distance was queued after this one.
        if dist.get(&entry.stop).is_some_and(|&d| d < entry.dist) {
            continue;
        }
        // Do not expand past the goal; paths through it are not simple
        // improvements. The queue may still hold better routes to it.
        if entry.stop.node == goal {
            continue;
        }

        for &edge_ix in &net.nodes[entry.stop.node.0 as usize].edges {
            if banned_edges.contains(&edge_ix) {
                continue;
            }
            let edge = &net.edges[edge_ix.0 as usize];
            if banned_nodes.contains(&edge.to) {
                continue;
            }

            let mut weight = edge.travel_time;
            if let Some(incoming) = entry.stop.edge {
                if net.edges[incoming.0 as usize].route != edge.route {
                    weight += net.route_change_penalty;
                }
            }

            let neighbor = PathStop {
                node: edge.to,
                edge: Some(edge_ix),
            };
            let candidate = entry.dist + weight;
            if dist.get(&neighbor).is_none_or(|&d| candidate < d) {
                dist.insert(neighbor, candidate);
                prev.insert(neighbor, entry.stop);
                seq += 1;
                queue.push(QueueEntry {
                    dist: candidate,
                    seq,
                    stop: neighbor,
                });
            }
        }
    }

    // The goal may have been reached via several incoming edges; pick the
    // cheapest, breaking ties on edge index for determinism.
    let (&best_stop, &best_dist) = dist
        .iter()
        .filter(|(stop, _)| stop.node == goal)
        .min_by_key(|(stop, &d)| (d, stop.edge))?;

    // Walk predecessors back to the start, then flip.
    let mut stops = vec![best_stop];
    let mut cursor = best_stop;
    while cursor != start {
        cursor = prev[&cursor];
        stops.push(cursor);
    }
    stops.reverse();

    Some(Path {
        stops,
        total_time: best_dist,
    })
}
