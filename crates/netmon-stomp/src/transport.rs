//! Transport capability traits.
//!
//! The monitor treats its transports as external collaborators: a byte
//! stream with connect / send / receive / close, nothing more. TLS and
//! WebSocket layers plug in behind these traits; the providers here are
//! plain TCP for production wiring and the in-memory pair in
//! [`crate::testing`] for tests.

use std::io;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

/// A bidirectional byte stream a STOMP session can run over.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Transport for T {}

/// Dials the upstream endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport;

    async fn connect(&self) -> io::Result<Self::Transport>;
}

/// Accepts downstream connections.
#[async_trait]
pub trait Acceptor: Send + 'static {
    type Transport: Transport;

    async fn accept(&mut self) -> io::Result<Self::Transport>;
}

/// Plain TCP connector.
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpStream;

    async fn connect(&self) -> io::Result<TcpStream> {
        TcpStream::connect((self.host.as_str(), self.port)).await
    }
}

/// Plain TCP acceptor.
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Bind to the given address and port.
    pub async fn bind(ip: &str, port: u16) -> io::Result<Self> {
        let listener = TcpListener::bind((ip, port)).await?;
        Ok(Self { listener })
    }

    /// The locally bound address (useful with port 0).
    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait]
impl Acceptor for TcpAcceptor {
    type Transport = TcpStream;

    async fn accept(&mut self) -> io::Result<TcpStream> {
        self.listener.accept().await.map(|(stream, _)| stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn tcp_connector_reaches_tcp_acceptor() {
        let mut acceptor = TcpAcceptor::bind("127.0.0.1", 0).await.unwrap();
        let port = acceptor.local_addr().unwrap().port();
        let connector = TcpConnector::new("127.0.0.1", port);

        let accepted = tokio::spawn(async move { acceptor.accept().await.unwrap() });
        let mut client = connector.connect().await.unwrap();
        let mut server = accepted.await.unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn tcp_connector_to_unbound_port_fails() {
        // Bind then drop to obtain a port that is very likely closed.
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let connector = TcpConnector::new("127.0.0.1", port);
        assert!(connector.connect().await.is_err());
    }
}
