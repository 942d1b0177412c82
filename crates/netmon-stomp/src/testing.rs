//! In-memory transports for tests.
//!
//! A [`MemoryDialer`] / [`MemoryAcceptor`] pair behaves like a loopback
//! network: every dial creates a fresh duplex stream whose peer half pops
//! out of the acceptor. Used across the client, server, and runtime test
//! suites in place of real sockets.

use std::io;

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;

use crate::transport::{Acceptor, Connector};

const PIPE_CAPACITY: usize = 64 * 1024;

/// Create a connected dialer/acceptor pair.
#[must_use]
pub fn memory_endpoint() -> (MemoryDialer, MemoryAcceptor) {
    let (tx, rx) = mpsc::channel(16);
    (MemoryDialer { tx }, MemoryAcceptor { rx })
}

/// Dials in-memory connections; the peer half arrives at the paired
/// [`MemoryAcceptor`].
#[derive(Clone)]
pub struct MemoryDialer {
    tx: mpsc::Sender<DuplexStream>,
}

#[async_trait]
impl Connector for MemoryDialer {
    type Transport = DuplexStream;

    async fn connect(&self) -> io::Result<DuplexStream> {
        let (local, peer) = tokio::io::duplex(PIPE_CAPACITY);
        self.tx
            .send(peer)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::ConnectionRefused, "acceptor closed"))?;
        Ok(local)
    }
}

/// Accepts the peer halves created by the paired [`MemoryDialer`].
pub struct MemoryAcceptor {
    rx: mpsc::Receiver<DuplexStream>,
}

#[async_trait]
impl Acceptor for MemoryAcceptor {
    type Transport = DuplexStream;

    async fn accept(&mut self) -> io::Result<DuplexStream> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "all dialers closed"))
    }
}
