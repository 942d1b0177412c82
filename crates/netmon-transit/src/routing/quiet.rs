//! Quiet-route search: bounded k-shortest simple paths, then crowding
//! selection.
//!
//! Candidate paths come from Yen's deviation-prefix scheme: each new
//! candidate is the cheapest path that follows a prefix of an already
//! accepted path and then deviates, never reusing a deviation edge already
//! taken at that prefix. Deviations slower than the configured bound are
//! pruned, and enumeration stops at `max_n_paths` candidates.
//!
//! Selection: the candidate with the lowest crowding wins, but only if it
//! undercuts the fastest path's crowding by the quietness threshold;
//! otherwise the fastest path is returned unchanged. Ties prefer the
//! earlier-discovered path.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::network::{NodeIx, TransportNetwork};

use super::{dijkstra, fastest, path_crowding, path_time, Path, PathStop};

struct Candidate {
    time: u32,
    /// Discovery sequence; ties pop in discovery order.
    seq: u64,
    path: Path,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (time, discovery order).
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Select the quiet path from `from` to `to`, or `None` when no path
/// exists at all.
pub(crate) fn quiet(
    net: &TransportNetwork,
    from: NodeIx,
    to: NodeIx,
    max_slowdown_pc: f64,
    min_quietness_pc: f64,
    max_n_paths: usize,
) -> Option<Path> {
    let candidates = collect_candidates(net, from, to, max_slowdown_pc, max_n_paths.max(1))?;

    let baseline_crowding = path_crowding(net, &candidates[0]);
    let (quietest_ix, quietest_crowding) = candidates
        .iter()
        .enumerate()
        .map(|(ix, path)| (ix, path_crowding(net, path)))
        .min_by_key(|&(ix, crowding)| (crowding, ix))?;

    let threshold = baseline_crowding as f64 * (1.0 - min_quietness_pc);
    let selected = if quietest_crowding as f64 <= threshold {
        quietest_ix
    } else {
        0
    };
    candidates.into_iter().nth(selected)
}

/// Enumerate up to `max_n_paths` simple paths within the slowdown bound,
/// fastest first.
fn collect_candidates(
    net: &TransportNetwork,
    from: NodeIx,
    to: NodeIx,
    max_slowdown_pc: f64,
    max_n_paths: usize,
) -> Option<Vec<Path>> {
    let best = fastest(net, from, to)?;
    let bound = best.total_time as f64 * (1.0 + max_slowdown_pc);

    let mut seen: HashSet<Vec<PathStop>> = HashSet::new();
    seen.insert(best.stops.clone());
    let mut accepted = vec![best];
    let mut frontier: BinaryHeap<Candidate> = BinaryHeap::new();
    let mut seq = 0u64;

    while accepted.len() < max_n_paths {
        let prev = &accepted[accepted.len() - 1];

        // Deviate at every stop of the newest accepted path except the
        // destination.
        for spur_ix in 0..prev.stops.len() - 1 {
            let spur = prev.stops[spur_ix];
            let root = &prev.stops[..=spur_ix];
            let root_time = path_time(net, root);

            // Never retake a deviation edge an accepted path already uses
            // after this exact prefix.
            let banned_edges = accepted
                .iter()
                .filter(|path| path.stops.len() > spur_ix + 1 && path.stops[..=spur_ix] == *root)
                .filter_map(|path| path.stops[spur_ix + 1].edge)
                .collect();

            // Keep paths simple: the root before the spur is off limits.
            let banned_nodes = root[..spur_ix].iter().map(|stop| stop.node).collect();

            let Some(spur_path) =
                dijkstra::shortest_path(net, spur, root_time, to, &banned_nodes, &banned_edges)
            else {
                continue;
            };
            if spur_path.total_time as f64 > bound {
                continue;
            }

            let mut stops = root[..spur_ix].to_vec();
            stops.extend(spur_path.stops);
            if seen.insert(stops.clone()) {
                frontier.push(Candidate {
                    time: spur_path.total_time,
                    seq,
                    path: Path {
                        stops,
                        total_time: spur_path.total_time,
                    },
                });
                seq += 1;
            }
        }

        match frontier.pop() {
            Some(candidate) => accepted.push(candidate.path),
            None => break,
        }
    }

    Some(accepted)
}
