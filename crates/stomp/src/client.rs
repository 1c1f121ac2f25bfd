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

//! STOMP 1.2 client state machine.
//!
//! The client runs on an already-open WebSocket session. `connect` performs
//! the STOMP login; after that, subscriptions and sends are receipted, and
//! `MESSAGE` frames are demultiplexed by their `subscription` header.
//! `MESSAGE` frames that arrive while a receipt is awaited are queued and
//! replayed by `next_message`.

use std::{collections::VecDeque, time::Duration};

use ahash::{AHashMap, AHashSet};
use metronet_network::{MessageReader, SocketError, SocketEvent, WebSocketSession};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::frame::{FrameError, StompCommand, StompFrame};

const DISCONNECT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Error type for STOMP client operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StompClientError {
    /// The login handshake did not complete.
    #[error("Could not connect: {0}")]
    CouldNotConnect(String),

    /// The underlying transport handshake failed.
    #[error("Handshake failed: {0}")]
    BadHandshake(String),

    /// A frame could not be encoded or decoded.
    #[error("Could not create a valid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    /// A `MESSAGE` frame carried an unsupported content type.
    #[error("Unexpected message content type '{0}'")]
    UnexpectedContentType(String),

    /// A `MESSAGE` frame referenced a subscription this client never made.
    #[error("Message for unknown subscription '{0}'")]
    SubscriptionMismatch(String),

    /// The server reported an error frame.
    #[error("Server error: {0}")]
    Server(String),

    /// The server closed the connection.
    #[error("Server disconnected")]
    Disconnected,
}

impl From<SocketError> for StompClientError {
    fn from(error: SocketError) -> Self {
        match error {
            SocketError::Resolve { .. }
            | SocketError::ConnectTimeout(_)
            | SocketError::Connect(_) => Self::CouldNotConnect(error.to_string()),
            SocketError::TlsHandshake(_) | SocketError::WsHandshake(_) => {
                Self::BadHandshake(error.to_string())
            }
            SocketError::Send(_) | SocketError::Read(_) | SocketError::Closed => Self::Disconnected,
        }
    }
}

/// One demultiplexed `MESSAGE` frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompMessage {
    pub destination: String,
    pub payload: String,
}

/// A logged-in STOMP session from the client side.
#[derive(Debug)]
pub struct StompClient<S> {
    session: WebSocketSession<S>,
    reader: MessageReader,
    /// Subscription id → destination.
    subscriptions: AHashMap<String, String>,
    /// Messages that arrived while a receipt was awaited.
    queue: VecDeque<StompMessage>,
    /// Receipts that arrived ahead of their awaiter.
    receipts: AHashSet<String>,
    subscription_seq: u64,
    receipt_seq: u64,
    heartbeat: Option<CancellationToken>,
}

impl<S> StompClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Logs in over an open WebSocket session.
    ///
    /// Sends `CONNECT` with `accept-version:1.2` and the credentials, then
    /// awaits `CONNECTED` (or `ERROR`). `heartbeat_ms` is the interval this
    /// client offers to send heartbeats at; 0 disables them.
    pub async fn connect(
        session: WebSocketSession<S>,
        reader: MessageReader,
        host: &str,
        login: &str,
        passcode: &str,
        heartbeat_ms: u64,
    ) -> Result<Self, StompClientError> {
        let connect = StompFrame::new(StompCommand::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("login", login)
            .with_header("passcode", passcode)
            .with_header("heart-beat", format!("{heartbeat_ms},0"));
        session.send_text(connect.encode()).await?;

        let mut client = Self {
            session,
            reader,
            subscriptions: AHashMap::new(),
            queue: VecDeque::new(),
            receipts: AHashSet::new(),
            subscription_seq: 0,
            receipt_seq: 0,
            heartbeat: None,
        };

        let frame = client.read_frame().await?;
        match frame.command {
            StompCommand::Connected => {
                tracing::info!("STOMP session established");
                client.start_heartbeat(heartbeat_ms, frame.header("heart-beat"));
                Ok(client)
            }
            StompCommand::Error => Err(StompClientError::Server(error_message(&frame))),
            other => Err(StompClientError::CouldNotConnect(format!(
                "unexpected {other} frame during login",
            ))),
        }
    }

    /// Subscribes to a destination and awaits the receipt.
    ///
    /// Returns the fresh subscription id.
    pub async fn subscribe(&mut self, destination: &str) -> Result<String, StompClientError> {
        let id = format!("sub-{}", self.subscription_seq);
        self.subscription_seq += 1;
        let receipt = self.next_receipt_id();

        let frame = StompFrame::new(StompCommand::Subscribe)
            .with_header("id", id.as_str())
            .with_header("destination", destination)
            .with_header("ack", "auto")
            .with_header("receipt", receipt.as_str());
        self.session.send_text(frame.encode()).await?;
        self.subscriptions.insert(id.clone(), destination.to_string());

        self.await_receipt(&receipt).await?;
        tracing::debug!("Subscribed to {destination} as {id}");
        Ok(id)
    }

    /// Sends a JSON payload to a destination and awaits the receipt.
    pub async fn send(&mut self, destination: &str, payload: String) -> Result<(), StompClientError> {
        let receipt = self.next_receipt_id();

        let frame = StompFrame::new(StompCommand::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_header("content-length", payload.len().to_string())
            .with_header("receipt", receipt.as_str())
            .with_body(payload);
        self.session.send_text(frame.encode()).await?;

        self.await_receipt(&receipt).await
    }

    /// Returns the next `MESSAGE`, queued or freshly read.
    pub async fn next_message(&mut self) -> Result<StompMessage, StompClientError> {
        if let Some(message) = self.queue.pop_front() {
            return Ok(message);
        }
        loop {
            let frame = self.read_frame().await?;
            match frame.command {
                StompCommand::Message => return self.decode_message(frame),
                StompCommand::Receipt => self.stash_receipt(&frame)?,
                StompCommand::Error => return Err(StompClientError::Server(error_message(&frame))),
                other => {
                    return Err(StompClientError::Server(format!(
                        "unexpected {other} frame",
                    )));
                }
            }
        }
    }

    /// Sends `DISCONNECT`, waits (bounded) for its receipt, then closes the
    /// transport.
    pub async fn disconnect(mut self) -> Result<(), StompClientError> {
        if let Some(token) = self.heartbeat.take() {
            token.cancel();
        }
        let receipt = self.next_receipt_id();
        let frame = StompFrame::new(StompCommand::Disconnect).with_header("receipt", receipt.as_str());
        self.session.send_text(frame.encode()).await?;

        if tokio::time::timeout(DISCONNECT_RECEIPT_TIMEOUT, self.await_receipt(&receipt))
            .await
            .is_err()
        {
            tracing::warn!("Timed out waiting for DISCONNECT receipt");
        }
        self.session.close().await.ok();
        Ok(())
    }

    fn next_receipt_id(&mut self) -> String {
        let id = format!("receipt-{}", self.receipt_seq);
        self.receipt_seq += 1;
        id
    }

    async fn await_receipt(&mut self, receipt: &str) -> Result<(), StompClientError> {
        if self.receipts.remove(receipt) {
            return Ok(());
        }
        loop {
            let frame = self.read_frame().await?;
            match frame.command {
                StompCommand::Receipt => {
                    let id = frame
                        .header("receipt-id")
                        .ok_or_else(|| FrameError::MissingHeader("receipt-id".to_string()))?;
                    if id == receipt {
                        return Ok(());
                    }
                    self.receipts.insert(id.to_string());
                }
                StompCommand::Message => {
                    let message = self.decode_message(frame)?;
                    self.queue.push_back(message);
                }
                StompCommand::Error => return Err(StompClientError::Server(error_message(&frame))),
                other => {
                    return Err(StompClientError::Server(format!(
                        "unexpected {other} frame while awaiting receipt",
                    )));
                }
            }
        }
    }

    fn stash_receipt(&mut self, frame: &StompFrame) -> Result<(), StompClientError> {
        let id = frame
            .header("receipt-id")
            .ok_or_else(|| FrameError::MissingHeader("receipt-id".to_string()))?;
        self.receipts.insert(id.to_string());
        Ok(())
    }

    fn decode_message(&self, frame: StompFrame) -> Result<StompMessage, StompClientError> {
        if let Some(content_type) = frame.header("content-type") {
            if content_type != "application/json" {
                return Err(StompClientError::UnexpectedContentType(
                    content_type.to_string(),
                ));
            }
        }
        let subscription = frame
            .header("subscription")
            .ok_or_else(|| FrameError::MissingHeader("subscription".to_string()))?;
        let destination = self
            .subscriptions
            .get(subscription)
            .cloned()
            .ok_or_else(|| StompClientError::SubscriptionMismatch(subscription.to_string()))?;
        Ok(StompMessage {
            destination,
            payload: frame.body,
        })
    }

    /// Reads the next frame, skipping heartbeat EOLs. A transport close maps
    /// to `Disconnected`.
    async fn read_frame(&mut self) -> Result<StompFrame, StompClientError> {
        loop {
            match self.reader.recv().await {
                Some(SocketEvent::Message(payload)) => {
                    if payload.bytes().all(|b| b == b'\n' || b == b'\r') {
                        continue;
                    }
                    return Ok(StompFrame::parse(&payload)?);
                }
                Some(SocketEvent::Closed(_)) | None => return Err(StompClientError::Disconnected),
            }
        }
    }

    /// Starts the outgoing heartbeat ticker when both sides agreed on one.
    fn start_heartbeat(&mut self, offered_ms: u64, negotiated: Option<&str>) {
        let Some(value) = negotiated else { return };
        let Some((_, server_wants)) = value.split_once(',') else {
            return;
        };
        let server_wants: u64 = server_wants.trim().parse().unwrap_or(0);
        if offered_ms == 0 || server_wants == 0 {
            return;
        }

        let interval = Duration::from_millis(offered_ms.max(server_wants));
        let session = self.session.clone();
        let token = CancellationToken::new();
        let task_token = token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = task_token.cancelled() => break,
                    () = tokio::time::sleep(interval) => {
                        if session.send_text("\n".to_string()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.heartbeat = Some(token);
        tracing::debug!("Heartbeat ticker started at {interval:?}");
    }
}

impl<S> Drop for StompClient<S> {
    fn drop(&mut self) {
        if let Some(token) = self.heartbeat.take() {
            token.cancel();
        }
    }
}

fn error_message(frame: &StompFrame) -> String {
    frame
        .header("message")
        .map(str::to_string)
        .unwrap_or_else(|| frame.body.clone())
}
