//! # netmon-stomp
//!
//! STOMP 1.2 framing for the network monitor.
//!
//! - [`Frame`] — zero-copy parsed frame owning its backing buffer
//! - [`FrameBuilder`] — validated wire-form serialization
//! - [`StompCodec`] — `tokio_util` codec locating frame boundaries in a
//!   byte stream
//! - [`Connector`] / [`Acceptor`] — capability traits for the underlying
//!   transport, with TCP providers and in-memory test providers
//!
//! The codec is purely syntactic: it enforces frame structure, header
//! vocabulary, body rules, and required headers per command. Protocol
//! semantics (handshakes, subscriptions) live in the client and server
//! crates.

#![deny(unsafe_code)]

pub mod codec;
pub mod frame;
pub mod testing;
pub mod transport;

pub use codec::{CodecError, StompCodec};
pub use frame::{Command, Frame, FrameBuilder, FrameError, Header};
pub use transport::{Acceptor, Connector, TcpAcceptor, TcpConnector, Transport};
