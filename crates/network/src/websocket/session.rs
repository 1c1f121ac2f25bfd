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

//! The duplex WebSocket session shared by the client and server transports.
//!
//! A session owns the write half of an upgraded WebSocket stream and spawns a
//! read pump that forwards inbound text frames, in arrival order, to an
//! unbounded channel. Writes are serialized behind a mutex so a second send
//! never overlaps one in flight. A locally initiated close suppresses the
//! close notification the pump would otherwise deliver.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::Mutex,
};
use tokio_tungstenite::{WebSocketStream, tungstenite::Message};

use crate::error::SocketError;

/// An inbound event on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// One received text frame; ownership of the payload moves to the receiver.
    Message(String),
    /// The peer closed the stream (`None`) or an unrecoverable read error
    /// occurred (`Some`). Never delivered after a local close.
    Closed(Option<SocketError>),
}

/// Ordered stream of inbound session events.
pub type MessageReader = tokio::sync::mpsc::UnboundedReceiver<SocketEvent>;

type Writer<S> = Arc<Mutex<SplitSink<WebSocketStream<S>, Message>>>;

/// One open WebSocket connection in text mode.
pub struct WebSocketSession<S> {
    writer: Writer<S>,
    closed: Arc<AtomicBool>,
}

impl<S> std::fmt::Debug for WebSocketSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(WebSocketSession))
            .field("closed", &self.closed.load(Ordering::Acquire))
            .finish()
    }
}

impl<S> Clone for WebSocketSession<S> {
    fn clone(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<S> WebSocketSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wraps an upgraded WebSocket stream and starts its read pump.
    #[must_use]
    pub fn from_websocket(ws: WebSocketStream<S>) -> (Self, MessageReader) {
        let (sink, stream) = ws.split();
        let writer = Arc::new(Mutex::new(sink));
        let closed = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(read_pump(
            stream,
            Arc::clone(&writer),
            Arc::clone(&closed),
            event_tx,
        ));

        (Self { writer, closed }, event_rx)
    }

    /// Sends one text frame. Writes are serialized in enqueue order.
    pub async fn send_text(&self, payload: String) -> Result<(), SocketError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SocketError::Closed);
        }
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))
    }

    /// Initiates an orderly close.
    ///
    /// After this call the session delivers no further close event; the read
    /// pump drains the closing handshake silently.
    pub async fn close(&self) -> Result<(), SocketError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!("Closing WebSocket session");
        let mut writer = self.writer.lock().await;
        writer
            .send(Message::Close(None))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))
    }

    /// Whether `close` has been called on this session.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

async fn read_pump<S>(
    mut stream: SplitStream<WebSocketStream<S>>,
    writer: Writer<S>,
    closed: Arc<AtomicBool>,
    events: tokio::sync::mpsc::UnboundedSender<SocketEvent>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                tracing::trace!("Received {}-byte message", text.len());
                if events.send(SocketEvent::Message(text.to_string())).is_err() {
                    break;
                }
            }
            Some(Ok(Message::Ping(payload))) => {
                let mut writer = writer.lock().await;
                if let Err(e) = writer.send(Message::Pong(payload)).await {
                    tracing::warn!("Failed to send pong frame: {e}");
                }
            }
            Some(Ok(Message::Close(_))) | None => {
                if !closed.load(Ordering::Acquire) {
                    let _ = events.send(SocketEvent::Closed(None));
                }
                break;
            }
            Some(Ok(_)) => {
                // Binary, pong, and raw frames are ignored in text mode.
            }
            Some(Err(e)) => {
                if !closed.load(Ordering::Acquire) {
                    let _ = events.send(SocketEvent::Closed(Some(SocketError::Read(
                        e.to_string(),
                    ))));
                }
                break;
            }
        }
    }
    tracing::debug!("WebSocket read loop terminated");
}
