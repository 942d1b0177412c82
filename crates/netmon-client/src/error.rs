//! Client session failures.

use netmon_stomp::{Command, FrameError};
use thiserror::Error;

/// Errors surfaced by the STOMP client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The transport could not be established or broke mid-operation.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
    /// A frame could not be built or an inbound frame could not be parsed.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
    /// The inbound byte stream did not decode to STOMP frames.
    #[error("codec error: {0}")]
    Codec(#[from] netmon_stomp::CodecError),
    /// The server answered the handshake with an ERROR frame.
    #[error("server rejected the session: {0}")]
    Rejected(String),
    /// The server answered the handshake with something other than
    /// CONNECTED.
    #[error("expected CONNECTED, received {0}")]
    UnexpectedReply(Command),
    /// The transport closed before the expected reply arrived.
    #[error("connection closed during the handshake")]
    ConnectionClosed,
    /// The operation was abandoned because the session is no longer
    /// connected.
    #[error("operation aborted: session is not connected")]
    OperationAborted,
}
