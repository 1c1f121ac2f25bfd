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

use std::time::Duration;

use thiserror::Error;

/// Error type for transport operations.
///
/// Each variant maps to one phase of the connection sequence, so the layers
/// above can report which step of resolve → connect → TLS → upgrade failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SocketError {
    /// Host name resolution failed or produced no addresses.
    #[error("Could not resolve '{host}': {reason}")]
    Resolve { host: String, reason: String },

    /// The TCP connection did not complete within the allowed time.
    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// The TCP connection or bind failed.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// The WebSocket upgrade failed.
    #[error("WebSocket handshake failed: {0}")]
    WsHandshake(String),

    /// A write on an open session failed.
    #[error("Send failed: {0}")]
    Send(String),

    /// A read on an open session failed.
    #[error("Read failed: {0}")]
    Read(String),

    /// The session is already closed.
    #[error("Socket closed")]
    Closed,
}
