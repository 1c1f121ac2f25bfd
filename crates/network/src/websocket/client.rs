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

//! Outbound WebSocket-over-TLS client.

use std::{sync::Arc, time::Duration};

use rustls::{ClientConfig, pki_types::ServerName};
use tokio::net::TcpStream;
use tokio_rustls::{TlsConnector, client::TlsStream};
use tokio_tungstenite::client_async;

use crate::{
    error::SocketError,
    websocket::session::{MessageReader, WebSocketSession},
};

/// The timeout only applies to opening the TCP socket; later phases carry
/// their own protocol-level timeouts.
const TCP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a WebSocket server over TLS.
///
/// Construction does not initiate a connection; `connect` drives the full
/// resolve → TCP → TLS → WebSocket upgrade sequence and returns the open
/// session together with its inbound event reader.
#[derive(Clone, Debug)]
pub struct WebSocketClient {
    host: String,
    port: u16,
    path: String,
    tls: Arc<ClientConfig>,
}

impl WebSocketClient {
    /// Creates a new client for `wss://host:port path`.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>, tls: Arc<ClientConfig>) -> Self {
        let host = host.into();
        let path = path.into();
        tracing::info!("New WebSocket client for {host}:{port}{path}");
        Self {
            host,
            port,
            path,
            tls,
        }
    }

    /// Connects to the server and upgrades to a text-mode WebSocket.
    pub async fn connect(
        &self,
    ) -> Result<(WebSocketSession<TlsStream<TcpStream>>, MessageReader), SocketError> {
        tracing::info!("Attempting to resolve {}:{}", self.host, self.port);
        let mut addrs = tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| SocketError::Resolve {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;
        let addr = addrs.next().ok_or_else(|| SocketError::Resolve {
            host: self.host.clone(),
            reason: "no addresses returned".to_string(),
        })?;

        tracing::info!("Attempting connection to {addr}");
        let tcp = tokio::time::timeout(TCP_CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| SocketError::ConnectTimeout(TCP_CONNECT_TIMEOUT))?
            .map_err(|e| SocketError::Connect(e.to_string()))?;

        let domain = ServerName::try_from(self.host.as_str())
            .map_err(|_| SocketError::TlsHandshake(format!("invalid server name '{}'", self.host)))?
            .to_owned();
        let connector = TlsConnector::from(Arc::clone(&self.tls));
        let tls_stream = connector
            .connect(domain, tcp)
            .await
            .map_err(|e| SocketError::TlsHandshake(e.to_string()))?;
        tracing::info!("TLS handshake completed");

        let url = format!("wss://{}:{}{}", self.host, self.port, self.path);
        let (ws, _response) = client_async(url, tls_stream)
            .await
            .map_err(|e| SocketError::WsHandshake(e.to_string()))?;
        tracing::info!("WebSocket handshake completed");

        Ok(WebSocketSession::from_websocket(ws))
    }
}
