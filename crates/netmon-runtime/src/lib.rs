//! # netmon-runtime
//!
//! The orchestrator: binds the upstream STOMP client, the downstream STOMP
//! server, and the transport network around a single event loop.
//!
//! - [`MonitorConfig`] — the one configuration record, resolved from
//!   defaults, an optional JSON file, and `NETMON_*` environment overrides
//! - [`layout`] — network-layout acquisition from a file or an HTTPS URL
//! - [`Monitor`] — startup wiring, the serial event loop, and the flat
//!   error taxonomy in [`MonitorError`]

#![deny(unsafe_code)]

pub mod config;
pub mod layout;

mod error;
mod orchestrator;

pub use config::MonitorConfig;
pub use error::MonitorError;
pub use orchestrator::{Monitor, MonitorHandle, QuietRouteRequest};
