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

//! Listening WebSocket-over-TLS server.

use std::{net::SocketAddr, sync::Arc};

use rustls::ServerConfig;
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::{TlsAcceptor, server::TlsStream};
use tokio_tungstenite::accept_async;

use crate::{
    error::SocketError,
    websocket::session::{MessageReader, WebSocketSession},
};

/// Accepts WebSocket clients over TLS, one at a time.
pub struct WebSocketServer {
    listener: TcpListener,
    acceptor: TlsAcceptor,
}

impl std::fmt::Debug for WebSocketServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(WebSocketServer))
            .field("local_addr", &self.listener.local_addr().ok())
            .finish()
    }
}

impl WebSocketServer {
    /// Binds the listening socket.
    pub async fn bind(host: &str, port: u16, tls: Arc<ServerConfig>) -> Result<Self, SocketError> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        tracing::info!("WebSocket server listening on {host}:{port}");
        Ok(Self {
            listener,
            acceptor: TlsAcceptor::from(tls),
        })
    }

    /// The bound local address (useful when binding port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.listener
            .local_addr()
            .map_err(|e| SocketError::Connect(e.to_string()))
    }

    /// Accepts the next client: TCP accept → TLS handshake → WebSocket
    /// upgrade. The returned session has the same semantics as an outbound
    /// client session.
    pub async fn accept(
        &self,
    ) -> Result<(WebSocketSession<TlsStream<TcpStream>>, MessageReader), SocketError> {
        let (tcp, peer) = self
            .listener
            .accept()
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;
        tracing::info!("Accepted TCP connection from {peer}");

        let tls_stream = self
            .acceptor
            .accept(tcp)
            .await
            .map_err(|e| SocketError::TlsHandshake(e.to_string()))?;
        tracing::info!("TLS handshake completed with {peer}");

        let ws = accept_async(tls_stream)
            .await
            .map_err(|e| SocketError::WsHandshake(e.to_string()))?;
        tracing::info!("WebSocket handshake completed with {peer}");

        Ok(WebSocketSession::from_websocket(ws))
    }
}
