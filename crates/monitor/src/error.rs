// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2015-2026 Nautech Systems Pty Ltd. All rights reserved.
//  https://nautechsystems.io
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

use thiserror::Error;

/// The flat error taxonomy the monitor exposes to its embedder.
///
/// Session-fatal errors latch into `NetworkMonitor::last_error`; the only
/// benign outcome is a query client disconnecting, which ends that session
/// without counting as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The monitor configuration is unusable.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The network layout document failed to load.
    #[error("Invalid network layout: {0}")]
    LayoutInvalid(String),

    /// Resolving or connecting a session failed.
    #[error("Could not connect: {0}")]
    ConnectFailed(String),

    /// A TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshakeFailed(String),

    /// A WebSocket upgrade failed.
    #[error("WebSocket handshake failed: {0}")]
    WebSocketHandshakeFailed(String),

    /// The feed or a query client presented wrong credentials.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// A STOMP frame failed to parse on a session where that is fatal.
    #[error("Frame parse error: {0}")]
    FrameParseError(String),

    /// A session broke the STOMP protocol.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The upstream feed dropped the ingest session.
    #[error("Ingest client disconnected")]
    IngestClientDisconnected,

    /// A query client disconnected; benign.
    #[error("Query server client disconnected")]
    QueryServerClientDisconnected,

    /// A request referenced a station not in the network.
    #[error("Unknown station: {0}")]
    StationUnknown(String),

    /// No itinerary connects the requested stations.
    #[error("No route found: {0}")]
    NoRouteFound(String),

    /// An invariant failed inside the monitor.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MonitorError {
    /// Whether this outcome is an accepted way for a session to end.
    #[must_use]
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::QueryServerClientDisconnected)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_only_query_client_disconnect_is_benign() {
        assert!(MonitorError::QueryServerClientDisconnected.is_benign());
        assert!(!MonitorError::IngestClientDisconnected.is_benign());
        assert!(!MonitorError::ConnectFailed("refused".to_string()).is_benign());
        assert!(!MonitorError::Internal("bug".to_string()).is_benign());
    }
}
