//! # netmon-transit
//!
//! The in-memory transport network: stations, lines, routes, live crowding
//! counters, and the pathfinding engine.
//!
//! - [`TransportNetwork`] — directed multigraph over arena-allocated nodes
//!   and edges, built once from a topology document and structurally
//!   immutable afterwards; only passenger counts mutate at runtime
//! - [`topology`] — serde types for the network-layout JSON document
//! - Fastest routes via Dijkstra keyed on `(node, incoming edge)` with a
//!   route-change penalty; quiet routes via bounded k-shortest-paths plus
//!   crowding selection

#![deny(unsafe_code)]

pub mod error;
pub mod model;
pub mod topology;

mod network;
mod routing;

pub use error::NetworkError;
pub use model::{Line, Route, Station};
pub use network::{TransportNetwork, DEFAULT_ROUTE_CHANGE_PENALTY};
