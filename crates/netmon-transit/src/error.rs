//! Typed failures for network construction and queries.

use netmon_core::{LineId, RouteId, StationId};
use thiserror::Error;

/// Transport network errors.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The station is not in the network.
    #[error("station not found: {0}")]
    UnknownStation(StationId),
    /// A station with this ID is already in the network.
    #[error("station already in the network: {0}")]
    DuplicateStation(StationId),
    /// A line with this ID is already in the network.
    #[error("line already in the network: {0}")]
    DuplicateLine(LineId),
    /// A route with this ID is already in the network. Route IDs are
    /// unique across all lines.
    #[error("route already in the network: {0}")]
    DuplicateRoute(RouteId),
    /// A route stop references a station that is not in the network.
    #[error("route {route} references unknown station {station}")]
    UnknownRouteStop { route: RouteId, station: StationId },
    /// A route is tagged with a line ID other than its containing line.
    #[error("route {route} does not belong to line {line}")]
    ForeignRoute { route: RouteId, line: LineId },
}
