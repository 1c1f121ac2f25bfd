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

//! End-to-end STOMP client/server session tests over in-memory WebSockets.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use metronet_network::{MessageReader, WebSocketSession};
use metronet_stomp::{
    StompClient, StompClientError, StompCommand, StompFrame, StompServer, StompServerError,
};
use tokio::io::DuplexStream;
use tokio_tungstenite::{WebSocketStream, accept_async, client_async, tungstenite::Message};

const LOGIN: &str = "monitor";
const PASSCODE: &str = "super-secret";

fn server() -> StompServer {
    StompServer::new(LOGIN, PASSCODE, "metronet/0.1.0")
}

type SessionHalf = (WebSocketSession<DuplexStream>, MessageReader);

/// An upgraded in-memory WebSocket pair: (client half, server half).
async fn session_pair() -> (SessionHalf, SessionHalf) {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);
    let (server_ws, client_ws) = tokio::join!(
        accept_async(server_io),
        client_async("ws://localhost/quiet-route", client_io),
    );
    let server_ws = server_ws.expect("server handshake");
    let (client_ws, _response) = client_ws.expect("client handshake");
    (
        WebSocketSession::from_websocket(client_ws),
        WebSocketSession::from_websocket(server_ws),
    )
}

async fn read_text(ws: &mut WebSocketStream<DuplexStream>) -> String {
    loop {
        match ws.next().await.expect("stream open").expect("read") {
            Message::Text(text) => return text.to_string(),
            _ => continue,
        }
    }
}

async fn send_frame(ws: &mut WebSocketStream<DuplexStream>, frame: StompFrame) {
    ws.send(Message::Text(frame.encode().into()))
        .await
        .expect("send");
}

#[tokio::test]
async fn test_login_subscribe_and_query_dispatch() {
    let ((client_ws, client_rx), (server_ws, server_rx)) = session_pair().await;

    let server_task = tokio::spawn(async move {
        let mut session = server()
            .accept_session(server_ws, server_rx)
            .await
            .expect("accept");
        let request = session.next_request().await.expect("request");
        assert_eq!(request.destination, "/quiet-route");
        assert_eq!(request.payload, "{\"start_station_id\":\"a\"}");
        session
            .send_message("/quiet-route", "{\"total_travel_time\":6}".to_string())
            .await
            .expect("respond");
        if let Some(receipt) = &request.receipt {
            session.send_receipt(receipt).await.expect("receipt");
        }
    });

    let mut client = StompClient::connect(client_ws, client_rx, "localhost", LOGIN, PASSCODE, 0)
        .await
        .expect("login");
    client.subscribe("/quiet-route").await.expect("subscribe");
    client
        .send("/quiet-route", "{\"start_station_id\":\"a\"}".to_string())
        .await
        .expect("send");

    let message = client.next_message().await.expect("message");
    assert_eq!(message.destination, "/quiet-route");
    assert_eq!(message.payload, "{\"total_travel_time\":6}");

    server_task.await.expect("server task");
}

#[tokio::test]
async fn test_wrong_passcode_is_rejected() {
    let ((client_ws, client_rx), (server_ws, server_rx)) = session_pair().await;

    let server_task = tokio::spawn(async move {
        server().accept_session(server_ws, server_rx).await
    });

    let result =
        StompClient::connect(client_ws, client_rx, "localhost", LOGIN, "wrong", 0).await;

    assert_eq!(
        result.err(),
        Some(StompClientError::Server("authentication failed".to_string())),
    );
    assert!(matches!(
        server_task.await.expect("server task"),
        Err(StompServerError::AuthRejected),
    ));
}

#[tokio::test]
async fn test_sequential_sends_each_receive_their_receipt() {
    let ((client_ws, client_rx), (server_ws, server_rx)) = session_pair().await;

    let server_task = tokio::spawn(async move {
        let mut session = server()
            .accept_session(server_ws, server_rx)
            .await
            .expect("accept");
        for _ in 0..2 {
            let request = session.next_request().await.expect("request");
            let receipt = request.receipt.expect("receipt requested");
            session.send_receipt(&receipt).await.expect("receipt");
        }
    });

    let mut client = StompClient::connect(client_ws, client_rx, "localhost", LOGIN, PASSCODE, 0)
        .await
        .expect("login");
    client
        .send("/quiet-route", "{\"id\":7}".to_string())
        .await
        .expect("first send");
    client
        .send("/quiet-route", "{\"id\":8}".to_string())
        .await
        .expect("second send");

    server_task.await.expect("server task");
}

#[tokio::test]
async fn test_out_of_order_receipts_are_correlated() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    let server_task = tokio::spawn(async move {
        let mut ws = accept_async(server_io).await.expect("server handshake");
        let connect = StompFrame::parse(&read_text(&mut ws).await).expect("connect frame");
        assert_eq!(connect.command, StompCommand::Connect);
        send_frame(
            &mut ws,
            StompFrame::new(StompCommand::Connected)
                .with_header("version", "1.2")
                .with_header("heart-beat", "0,0"),
        )
        .await;

        let subscribe = StompFrame::parse(&read_text(&mut ws).await).expect("subscribe frame");
        assert_eq!(subscribe.command, StompCommand::Subscribe);
        let receipt = subscribe.header("receipt").expect("receipt header").to_string();

        // A receipt for an unrelated operation lands first; the client must
        // stash it and keep waiting for its own.
        send_frame(
            &mut ws,
            StompFrame::new(StompCommand::Receipt).with_header("receipt-id", "receipt-99"),
        )
        .await;
        send_frame(
            &mut ws,
            StompFrame::new(StompCommand::Receipt).with_header("receipt-id", receipt),
        )
        .await;
    });

    let (client_ws, _response) = client_async("ws://localhost/feed", client_io)
        .await
        .expect("client handshake");
    let (session, reader) = WebSocketSession::from_websocket(client_ws);
    let mut client = StompClient::connect(session, reader, "localhost", LOGIN, PASSCODE, 0)
        .await
        .expect("login");

    client.subscribe("/passengers").await.expect("subscribe");
    server_task.await.expect("server task");
}

#[tokio::test]
async fn test_message_for_unknown_subscription_is_rejected() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    let server_task = tokio::spawn(async move {
        let mut ws = accept_async(server_io).await.expect("server handshake");
        let _connect = read_text(&mut ws).await;
        send_frame(
            &mut ws,
            StompFrame::new(StompCommand::Connected)
                .with_header("version", "1.2")
                .with_header("heart-beat", "0,0"),
        )
        .await;
        send_frame(
            &mut ws,
            StompFrame::new(StompCommand::Message)
                .with_header("subscription", "sub-99")
                .with_header("message-id", "m-1")
                .with_header("destination", "/passengers")
                .with_header("content-type", "application/json")
                .with_body("{}"),
        )
        .await;
    });

    let (client_ws, _response) = client_async("ws://localhost/feed", client_io)
        .await
        .expect("client handshake");
    let (session, reader) = WebSocketSession::from_websocket(client_ws);
    let mut client = StompClient::connect(session, reader, "localhost", LOGIN, PASSCODE, 0)
        .await
        .expect("login");

    let result = client.next_message().await;

    assert_eq!(
        result.err(),
        Some(StompClientError::SubscriptionMismatch("sub-99".to_string())),
    );
    server_task.await.expect("server task");
}

#[tokio::test]
async fn test_send_without_subscription_gets_error_frame() {
    let ((client_ws, client_rx), (server_ws, server_rx)) = session_pair().await;

    let server_task = tokio::spawn(async move {
        let mut session = server()
            .accept_session(server_ws, server_rx)
            .await
            .expect("accept");
        let request = session.next_request().await.expect("request");
        let result = session
            .send_message(&request.destination, "{}".to_string())
            .await;
        assert!(matches!(result, Err(StompServerError::NoSubscriber(_))));
        session
            .send_error("no subscription for '/quiet-route' responses")
            .await
            .expect("error frame");
    });

    let mut client = StompClient::connect(client_ws, client_rx, "localhost", LOGIN, PASSCODE, 0)
        .await
        .expect("login");
    // No subscribe: the pending send resolves with the server's ERROR frame.
    let result = client
        .send("/quiet-route", "{\"start_station_id\":\"a\"}".to_string())
        .await;

    assert!(matches!(result, Err(StompClientError::Server(_))));
    server_task.await.expect("server task");
}

#[tokio::test]
async fn test_client_disconnect_is_benign_on_server() {
    let ((client_ws, client_rx), (server_ws, server_rx)) = session_pair().await;

    let server_task = tokio::spawn(async move {
        let mut session = server()
            .accept_session(server_ws, server_rx)
            .await
            .expect("accept");
        session.next_request().await
    });

    let client = StompClient::connect(client_ws, client_rx, "localhost", LOGIN, PASSCODE, 0)
        .await
        .expect("login");
    client.disconnect().await.expect("disconnect");

    assert!(matches!(
        server_task.await.expect("server task"),
        Err(StompServerError::ClientDisconnected),
    ));
}

#[tokio::test]
async fn test_heartbeat_ticker_sends_eol_frames() {
    let (client_io, server_io) = tokio::io::duplex(16 * 1024);

    let server_task = tokio::spawn(async move {
        let mut ws = accept_async(server_io).await.expect("server handshake");
        let _connect = read_text(&mut ws).await;
        send_frame(
            &mut ws,
            StompFrame::new(StompCommand::Connected)
                .with_header("version", "1.2")
                .with_header("heart-beat", "0,50"),
        )
        .await;

        let beat = tokio::time::timeout(Duration::from_secs(2), read_text(&mut ws))
            .await
            .expect("heartbeat in time");
        assert!(beat.bytes().all(|b| b == b'\n' || b == b'\r'));
    });

    let (client_ws, _response) = client_async("ws://localhost/feed", client_io)
        .await
        .expect("client handshake");
    let (session, reader) = WebSocketSession::from_websocket(client_ws);
    let _client = StompClient::connect(session, reader, "localhost", LOGIN, PASSCODE, 40)
        .await
        .expect("login");

    server_task.await.expect("server task");
}
