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

//! STOMP 1.2 server state machine, one concurrent session.
//!
//! The server authenticates `CONNECT` against a single configured credential
//! pair, tracks the session's subscriptions, and hands decoded `SEND` frames
//! to its embedder, which replies with `MESSAGE` frames to the subscription
//! paired with the request destination.

use metronet_network::{MessageReader, SocketError, SocketEvent, WebSocketSession};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use uuid::Uuid;

use crate::frame::{FrameError, StompCommand, StompFrame};

/// Error type for STOMP server operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StompServerError {
    /// The client presented wrong credentials.
    #[error("Authentication rejected")]
    AuthRejected,

    /// A client frame failed to parse; session-fatal.
    #[error("Frame parse error: {0}")]
    FrameParse(#[from] FrameError),

    /// The client broke the protocol (for example a transaction command on
    /// this server); session-fatal.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The client disconnected; a benign end of session.
    #[error("Client disconnected")]
    ClientDisconnected,

    /// No subscription of the session matches the response destination.
    #[error("No subscriber for destination '{0}'")]
    NoSubscriber(String),

    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] SocketError),
}

/// A decoded `SEND` from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompRequest {
    pub destination: String,
    pub payload: String,
    /// Receipt id to acknowledge once side effects complete.
    pub receipt: Option<String>,
}

/// Server configuration: the accepted credential pair and the advertised
/// server name.
#[derive(Debug, Clone)]
pub struct StompServer {
    login: String,
    passcode: String,
    server_name: String,
}

impl StompServer {
    #[must_use]
    pub fn new(
        login: impl Into<String>,
        passcode: impl Into<String>,
        server_name: impl Into<String>,
    ) -> Self {
        Self {
            login: login.into(),
            passcode: passcode.into(),
            server_name: server_name.into(),
        }
    }

    /// Runs the `CONNECT` handshake on a freshly accepted transport session.
    ///
    /// On wrong credentials the client receives an `ERROR` frame, the
    /// transport is closed, and `AuthRejected` is returned.
    pub async fn accept_session<S>(
        &self,
        transport: WebSocketSession<S>,
        mut reader: MessageReader,
    ) -> Result<StompServerSession<S>, StompServerError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let frame = read_frame(&mut reader).await?;
        if !matches!(frame.command, StompCommand::Connect | StompCommand::Stomp) {
            let error = StompFrame::new(StompCommand::Error)
                .with_header("message", "expected CONNECT frame");
            transport.send_text(error.encode()).await.ok();
            transport.close().await.ok();
            return Err(StompServerError::ProtocolViolation(format!(
                "expected CONNECT, got {}",
                frame.command,
            )));
        }

        let login = frame.header("login").unwrap_or("");
        let passcode = frame.header("passcode").unwrap_or("");
        // Bitwise-and keeps the comparison constant-time over both fields.
        if !(constant_time_eq(login, &self.login) & constant_time_eq(passcode, &self.passcode)) {
            tracing::warn!("Rejected STOMP login for user '{login}'");
            let error = StompFrame::new(StompCommand::Error)
                .with_header("message", "authentication failed");
            transport.send_text(error.encode()).await.ok();
            transport.close().await.ok();
            return Err(StompServerError::AuthRejected);
        }

        let session_id = Uuid::new_v4().to_string();
        let connected = StompFrame::new(StompCommand::Connected)
            .with_header("version", "1.2")
            .with_header("session", session_id.as_str())
            .with_header("server", self.server_name.as_str())
            .with_header("heart-beat", "0,0");
        transport.send_text(connected.encode()).await?;
        tracing::info!("STOMP session {session_id} established for user '{login}'");

        Ok(StompServerSession {
            transport,
            reader,
            session_id,
            subscriptions: Vec::new(),
            message_seq: 0,
        })
    }
}

/// One authenticated STOMP session from the server side.
#[derive(Debug)]
pub struct StompServerSession<S> {
    transport: WebSocketSession<S>,
    reader: MessageReader,
    session_id: String,
    /// `(subscription id, destination)` in subscription order.
    subscriptions: Vec<(String, String)>,
    message_seq: u64,
}

impl<S> StompServerSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Reads frames until the next `SEND` request.
    ///
    /// `SUBSCRIBE`/`UNSUBSCRIBE` maintain the subscription table and are
    /// receipted immediately. `DISCONNECT` is receipted, the transport is
    /// closed, and the benign `ClientDisconnected` is returned. Transaction
    /// and ack commands are unsupported on this server and are session-fatal.
    pub async fn next_request(&mut self) -> Result<StompRequest, StompServerError> {
        loop {
            let frame = read_frame(&mut self.reader).await?;
            match frame.command {
                StompCommand::Subscribe => {
                    let id = require_header(&frame, "id")?;
                    let destination = require_header(&frame, "destination")?;
                    if !self.subscriptions.iter().any(|(i, _)| i == &id) {
                        tracing::debug!("Session {} subscribed {id} -> {destination}", self.session_id);
                        self.subscriptions.push((id, destination));
                    }
                    self.acknowledge(&frame).await?;
                }
                StompCommand::Unsubscribe => {
                    let id = require_header(&frame, "id")?;
                    self.subscriptions.retain(|(i, _)| i != &id);
                    self.acknowledge(&frame).await?;
                }
                StompCommand::Disconnect => {
                    self.acknowledge(&frame).await.ok();
                    self.transport.close().await.ok();
                    tracing::info!("Session {} disconnected", self.session_id);
                    return Err(StompServerError::ClientDisconnected);
                }
                StompCommand::Send => {
                    let destination = require_header(&frame, "destination")?;
                    let receipt = frame.header("receipt").map(str::to_string);
                    return Ok(StompRequest {
                        destination,
                        payload: frame.body,
                        receipt,
                    });
                }
                other => {
                    let error = StompFrame::new(StompCommand::Error)
                        .with_header("message", format!("unsupported command {other}"));
                    self.transport.send_text(error.encode()).await.ok();
                    return Err(StompServerError::ProtocolViolation(format!(
                        "unsupported command {other}",
                    )));
                }
            }
        }
    }

    /// Sends a `MESSAGE` to the client subscription paired with `destination`.
    pub async fn send_message(
        &mut self,
        destination: &str,
        body: String,
    ) -> Result<(), StompServerError> {
        let subscription = self
            .subscriptions
            .iter()
            .find(|(_, d)| d == destination)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| StompServerError::NoSubscriber(destination.to_string()))?;

        let message_id = format!("{}-{}", self.session_id, self.message_seq);
        self.message_seq += 1;

        let frame = StompFrame::new(StompCommand::Message)
            .with_header("subscription", subscription)
            .with_header("message-id", message_id)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_header("content-length", body.len().to_string())
            .with_body(body);
        self.transport.send_text(frame.encode()).await?;
        Ok(())
    }

    /// Sends the `RECEIPT` for a request once its side effects completed.
    pub async fn send_receipt(&mut self, receipt_id: &str) -> Result<(), StompServerError> {
        let frame = StompFrame::new(StompCommand::Receipt).with_header("receipt-id", receipt_id);
        self.transport.send_text(frame.encode()).await?;
        Ok(())
    }

    /// Sends an `ERROR` frame without terminating the session.
    pub async fn send_error(&mut self, message: &str) -> Result<(), StompServerError> {
        let frame = StompFrame::new(StompCommand::Error).with_header("message", message);
        self.transport.send_text(frame.encode()).await?;
        Ok(())
    }

    /// Closes the session transport.
    pub async fn close(&mut self) -> Result<(), StompServerError> {
        self.transport.close().await?;
        Ok(())
    }

    /// Receipts any frame that asked for one.
    async fn acknowledge(&mut self, frame: &StompFrame) -> Result<(), StompServerError> {
        if let Some(receipt) = frame.header("receipt") {
            let receipt = receipt.to_string();
            self.send_receipt(&receipt).await?;
        }
        Ok(())
    }
}

fn require_header(frame: &StompFrame, name: &str) -> Result<String, StompServerError> {
    frame
        .header(name)
        .map(str::to_string)
        .ok_or_else(|| StompServerError::FrameParse(FrameError::MissingHeader(name.to_string())))
}

/// Reads the next frame, skipping heartbeat EOLs. An orderly peer close maps
/// to the benign `ClientDisconnected`; a read error surfaces the transport
/// error.
async fn read_frame(reader: &mut MessageReader) -> Result<StompFrame, StompServerError> {
    loop {
        match reader.recv().await {
            Some(SocketEvent::Message(payload)) => {
                if payload.bytes().all(|b| b == b'\n' || b == b'\r') {
                    continue;
                }
                return Ok(StompFrame::parse(&payload)?);
            }
            Some(SocketEvent::Closed(Some(error))) => {
                return Err(StompServerError::Transport(error));
            }
            Some(SocketEvent::Closed(None)) | None => {
                return Err(StompServerError::ClientDisconnected);
            }
        }
    }
}

/// Constant-time equality over the byte representations.
///
/// Scans `max(a.len(), b.len())` bytes unconditionally and folds length
/// disagreement into the accumulator, so the comparison never
/// short-circuits on length.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::equal("password", "password", true)]
    #[case::different("password", "passw0rd", false)]
    #[case::length_mismatch("password", "pass", false)]
    #[case::empty("", "", true)]
    fn test_constant_time_eq(#[case] a: &str, #[case] b: &str, #[case] expected: bool) {
        assert_eq!(constant_time_eq(a, b), expected);
    }
}
