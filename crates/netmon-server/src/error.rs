//! Server-side failures.

use netmon_stomp::FrameError;
use thiserror::Error;

use crate::server::SessionId;

/// Errors surfaced by the STOMP server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// No session with this ID is connected.
    #[error("unknown session: {0}")]
    UnknownSession(SessionId),
    /// The session's outbound queue is closed or full.
    #[error("session {0} is not accepting messages")]
    SessionUnavailable(SessionId),
    /// An outbound frame could not be built.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}
