//! # netmon-server
//!
//! The downstream STOMP 1.2 server: accepts transports, walks each session
//! through the `Pending → Connected` handshake, records subscriptions, and
//! surfaces inbound SEND frames to the orchestrator. Replies are targeted
//! by session ID and serialised as MESSAGE frames with monotonically
//! increasing message IDs.

#![deny(unsafe_code)]

mod error;
mod server;
mod session;

pub use error::ServerError;
pub use server::{AcceptAll, LoginPolicy, ServerEvent, SessionId, StompServer};
