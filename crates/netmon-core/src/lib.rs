//! # netmon-core
//!
//! Foundation types for the live transport network monitor.
//!
//! This crate provides the shared vocabulary that all other netmon crates
//! depend on:
//!
//! - **Branded IDs**: `StationId`, `LineId`, `RouteId` as newtypes for type
//!   safety
//! - **Passenger events**: `PassengerEvent` with its wire-format JSON rules
//! - **Travel routes**: `TravelRoute` / `TravelStep` query results
//! - **Logging**: `init_subscriber` for the `tracing` subscriber

#![deny(unsafe_code)]

pub mod event;
pub mod ids;
pub mod logging;
pub mod travel;

pub use event::{EventKind, PassengerEvent};
pub use ids::{LineId, RouteId, StationId};
pub use logging::init_subscriber;
pub use travel::{TravelRoute, TravelStep};
