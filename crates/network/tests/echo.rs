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

//! Session round-trip tests over an in-memory duplex stream.

use futures_util::{SinkExt, StreamExt};
use metronet_network::{SocketEvent, WebSocketSession};
use tokio_tungstenite::{accept_async, client_async, tungstenite::Message};

async fn run_echo_server(stream: tokio::io::DuplexStream) {
    let mut ws = accept_async(stream).await.expect("server handshake");
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => {
                if ws.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            Message::Ping(payload) => {
                let _ = ws.send(Message::Pong(payload)).await;
            }
            Message::Close(_) => {
                let _ = ws.close(None).await;
                break;
            }
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_echo_round_trip_and_clean_close() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let server = tokio::spawn(run_echo_server(server_io));

    let (ws, _response) = client_async("ws://localhost/echo", client_io)
        .await
        .expect("client handshake");
    let (session, mut reader) = WebSocketSession::from_websocket(ws);
    let connected = true;

    session
        .send_text("Hello WebSocket".to_string())
        .await
        .expect("send");
    let message_sent = true;

    let event = reader.recv().await.expect("echo event");
    assert_eq!(event, SocketEvent::Message("Hello WebSocket".to_string()));
    let message_received = true;

    session.close().await.expect("close");
    // A locally initiated close must not surface a close event; the event
    // stream simply ends.
    assert_eq!(reader.recv().await, None);
    let disconnected = true;

    assert!(connected && message_sent && message_received && disconnected);
    server.await.expect("echo server");
}

#[tokio::test]
async fn test_peer_close_is_reported() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let server = tokio::spawn(async move {
        let mut ws = accept_async(server_io).await.expect("server handshake");
        ws.close(None).await.expect("server close");
    });

    let (ws, _response) = client_async("ws://localhost/echo", client_io)
        .await
        .expect("client handshake");
    let (_session, mut reader) = WebSocketSession::from_websocket(ws);

    assert_eq!(reader.recv().await, Some(SocketEvent::Closed(None)));
    server.await.expect("server task");
}

#[tokio::test]
async fn test_send_after_close_is_rejected() {
    let (client_io, server_io) = tokio::io::duplex(4096);
    let server = tokio::spawn(run_echo_server(server_io));

    let (ws, _response) = client_async("ws://localhost/echo", client_io)
        .await
        .expect("client handshake");
    let (session, _reader) = WebSocketSession::from_websocket(ws);

    session.close().await.expect("close");
    let result = session.send_text("late".to_string()).await;

    assert!(result.is_err());
    server.await.expect("echo server");
}
