//! The flat error taxonomy at the orchestrator boundary.

use netmon_client::ClientError;
use netmon_core::StationId;
use netmon_transit::NetworkError;
use thiserror::Error;

/// Everything that can go wrong in the monitor, flattened to one
/// enumeration. Startup errors are fatal; hot-path errors are recorded as
/// the last error and skipped.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The configured CA certificate file does not exist.
    #[error("CA certificate file not found: {0}")]
    MissingCaCertFile(String),
    /// No network layout file was configured, or the configured file does
    /// not exist.
    #[error("network layout file not found: {0}")]
    MissingNetworkLayoutFile(String),
    /// The network layout could not be downloaded.
    #[error("failed to download the network layout: {0}")]
    FailedNetworkLayoutFileDownload(String),
    /// The network layout was fetched but is not a valid topology
    /// document.
    #[error("failed to parse the network layout: {0}")]
    FailedNetworkLayoutFileParsing(String),
    /// The topology document was structurally invalid.
    #[error("failed to construct the transport network: {0}")]
    FailedTransportNetworkConstruction(#[from] NetworkError),
    /// The upstream STOMP session could not be established.
    #[error("could not connect to the STOMP broker: {0}")]
    CouldNotConnectToStompClient(ClientError),
    /// The passenger-events subscription failed.
    #[error("could not subscribe to passenger events: {0}")]
    CouldNotSubscribeToPassengerEvents(ClientError),
    /// The upstream STOMP session dropped.
    #[error("the STOMP broker session disconnected")]
    StompClientDisconnected,
    /// The downstream listener could not be started.
    #[error("could not start the STOMP server: {0}")]
    CouldNotStartStompServer(std::io::Error),
    /// The downstream server stopped unexpectedly.
    #[error("the STOMP server stopped")]
    StompServerDisconnected,
    /// A downstream client session dropped.
    #[error("a STOMP server client disconnected")]
    StompServerClientDisconnected,
    /// An inbound passenger event was not valid JSON.
    #[error("could not parse a passenger event: {0}")]
    CouldNotParsePassengerEvent(String),
    /// A passenger event referenced a station outside the network.
    #[error("could not record a passenger event at station {0}")]
    CouldNotRecordPassengerEvent(StationId),
    /// A quiet-route request body was not valid JSON.
    #[error("could not parse a quiet-route request: {0}")]
    CouldNotParseQuietRouteRequest(String),
}
