//! # netmon-client
//!
//! A long-lived STOMP 1.2 client session over a single transport.
//!
//! [`StompClient::connect`] performs the transport dial and the STOMP
//! handshake, then hands back a command handle plus an event stream. All
//! I/O runs on one session task; inbound messages and the disconnect
//! notification are *posted* to the event channel, never delivered from
//! the reader's stack, so the owner may freely call back into
//! [`StompClient::send`] while handling an event.

#![deny(unsafe_code)]

mod client;
mod error;

pub use client::{
    ClientEvent, DisconnectReason, StompClient, StompClientConfig, SubscriptionId,
};
pub use error::ClientError;
