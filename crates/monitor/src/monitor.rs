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

//! The network-monitor orchestrator.
//!
//! `run` drives three cooperating pieces: the ingest session task (STOMP
//! client subscribed to the passenger feed), the query server task (STOMP
//! server answering one client session at a time), and the central loop that
//! owns the graph. Both session tasks talk to the central loop over channels,
//! so graph access stays on one task. Session-fatal errors arrive on a fault
//! channel and latch into `last_error`; the benign query-client disconnect is
//! remembered only while nothing worse has happened.

use std::{sync::Arc, time::Duration};

use metronet_network::{
    SocketError, WebSocketClient, WebSocketServer,
    tls::{create_client_tls_config, create_server_tls_config, install_crypto_provider},
};
use metronet_stomp::{StompClient, StompClientError, StompServer, StompServerError, StompServerSession};
use metronet_transit::{
    CrowdingCounts, NetworkLayout, PassengerEvent, PassengerEventEnvelope, PlannerConfig,
    QuietRouteRequest, StationId, TransitError, TransportNetwork, find_quiet_route,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{mpsc::UnboundedSender, oneshot},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::MonitorConfig,
    error::MonitorError,
    messages::{QuietRouteQuery, QuietRouteResponse},
};

/// Destination of the upstream passenger event subscription.
pub const INGEST_DESTINATION: &str = "/passengers";
/// Destination registered on the query server.
pub const QUERY_DESTINATION: &str = "/quiet-route";

const SERVER_NAME: &str = concat!("metronet/", env!("CARGO_PKG_VERSION"));

/// A decoded query forwarded to the central loop, with its reply channel.
#[derive(Debug)]
struct QueryJob {
    payload: String,
    reply: oneshot::Sender<String>,
}

/// The quiet-route monitor.
#[derive(Debug)]
pub struct NetworkMonitor {
    config: MonitorConfig,
    network: TransportNetwork,
    client_tls: Arc<rustls::ClientConfig>,
    server_tls: Arc<rustls::ServerConfig>,
    planner_config: PlannerConfig,
    last_error: Option<MonitorError>,
    shutdown: CancellationToken,
}

impl NetworkMonitor {
    /// Builds a monitor: TLS contexts first, then the network layout.
    pub fn configure(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        install_crypto_provider();

        let client_tls = create_client_tls_config(config.ca_file.as_deref())
            .map_err(|e| MonitorError::ConfigInvalid(format!("client TLS context: {e}")))?;
        let server_tls = create_server_tls_config(&config.query_cert_file, &config.query_key_file)
            .map_err(|e| MonitorError::ConfigInvalid(format!("server TLS context: {e}")))?;

        let layout_json = std::fs::read_to_string(&config.network_layout_file).map_err(|e| {
            MonitorError::ConfigInvalid(format!(
                "network layout {:?}: {e}",
                config.network_layout_file,
            ))
        })?;
        let layout = NetworkLayout::from_json(&layout_json)
            .map_err(|e| MonitorError::LayoutInvalid(e.to_string()))?;
        let network = TransportNetwork::from_layout(&layout)
            .map_err(|e| MonitorError::LayoutInvalid(e.to_string()))?;
        tracing::info!("Monitor configured with {} stations", network.station_count());

        Ok(Self {
            config,
            network,
            client_tls,
            server_tls,
            planner_config: PlannerConfig::default(),
            last_error: None,
            shutdown: CancellationToken::new(),
        })
    }

    /// The graph owned by this monitor.
    #[must_use]
    pub fn network(&self) -> &TransportNetwork {
        &self.network
    }

    /// Bulk-overrides the crowding state, for tooling and playground runs.
    pub fn set_network_crowding(&mut self, counts: &CrowdingCounts) {
        self.network.set_network_crowding(counts);
    }

    /// The most recent latched error, if any. Benign session ends are
    /// overwritten by any later non-benign error.
    #[must_use]
    pub fn last_error(&self) -> Option<&MonitorError> {
        self.last_error.as_ref()
    }

    /// Signals the running monitor to tear down both sessions.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Runs until `stop` is called or a non-recoverable error occurs.
    pub async fn run(&mut self) {
        self.shutdown = CancellationToken::new();
        self.execute().await;
    }

    /// Runs for a bounded duration, then tears both sessions down cleanly.
    pub async fn run_for(&mut self, duration: Duration) {
        self.shutdown = CancellationToken::new();
        let shutdown = self.shutdown.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            shutdown.cancel();
        });
        self.execute().await;
        timer.abort();
    }

    async fn execute(&mut self) {
        let shutdown = self.shutdown.clone();
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel::<PassengerEvent>();
        let (query_tx, mut query_rx) = tokio::sync::mpsc::unbounded_channel::<QueryJob>();
        let (fault_tx, mut fault_rx) = tokio::sync::mpsc::unbounded_channel::<MonitorError>();

        let ingest = tokio::spawn(run_ingest_session(
            self.config.clone(),
            Arc::clone(&self.client_tls),
            event_tx,
            fault_tx.clone(),
            shutdown.clone(),
        ));
        let query = tokio::spawn(run_query_server(
            self.config.clone(),
            Arc::clone(&self.server_tls),
            query_tx,
            fault_tx,
            shutdown.clone(),
        ));

        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                Some(event) = event_rx.recv() => {
                    if !self.network.record_passenger_event(&event) {
                        tracing::warn!("Passenger event for unknown station '{}'", event.station_id);
                    }
                }
                Some(job) = query_rx.recv() => {
                    let response = answer_query(
                        &self.network,
                        &self.planner_config,
                        &self.config,
                        &job.payload,
                    );
                    let _ = job.reply.send(response);
                }
                Some(fault) = fault_rx.recv() => {
                    if fault.is_benign() {
                        tracing::info!("Session ended: {fault}");
                        if self.last_error.as_ref().is_none_or(MonitorError::is_benign) {
                            self.last_error = Some(fault);
                        }
                    } else {
                        tracing::error!("Session fault: {fault}");
                        self.last_error = Some(fault);
                        shutdown.cancel();
                    }
                }
                else => break,
            }
        }

        shutdown.cancel();
        let _ = tokio::join!(ingest, query);
        tracing::info!("Monitor stopped");
    }
}

/// Resolves one query payload against the graph.
fn answer_query(
    network: &TransportNetwork,
    planner_config: &PlannerConfig,
    config: &MonitorConfig,
    payload: &str,
) -> String {
    let response = match serde_json::from_str::<QuietRouteQuery>(payload) {
        Ok(query) => {
            let request = QuietRouteRequest {
                start: query.start_station_id.clone(),
                end: query.end_station_id.clone(),
                max_slowdown: query.max_slowdown.unwrap_or(config.max_slowdown),
                min_quietness: query.min_quietness.unwrap_or(config.min_quietness),
                k_candidates: query.k_candidates.unwrap_or(config.k_candidates),
            };
            match find_quiet_route(network, &request, planner_config) {
                Ok(route) => QuietRouteResponse::from(route),
                Err(error) => {
                    let reported = match &error {
                        TransitError::StationUnknown(id) => {
                            MonitorError::StationUnknown(id.to_string())
                        }
                        TransitError::NoRouteFound { .. } => {
                            MonitorError::NoRouteFound(error.to_string())
                        }
                        TransitError::LayoutInvalid(message) => {
                            MonitorError::Internal(message.clone())
                        }
                    };
                    QuietRouteResponse::failure(
                        query.start_station_id,
                        query.end_station_id,
                        reported.to_string(),
                    )
                }
            }
        }
        Err(error) => QuietRouteResponse::failure(
            StationId::new(""),
            StationId::new(""),
            format!("invalid request: {error}"),
        ),
    };

    serde_json::to_string(&response).unwrap_or_else(|error| {
        tracing::error!("Could not serialize query response: {error}");
        "{\"error\":\"internal error\"}".to_string()
    })
}

// -- Ingest session --------------------------------------------------------------------------------

async fn run_ingest_session(
    config: MonitorConfig,
    tls: Arc<rustls::ClientConfig>,
    events: UnboundedSender<PassengerEvent>,
    faults: UnboundedSender<MonitorError>,
    shutdown: CancellationToken,
) {
    if let Err(error) = ingest_loop(&config, tls, &events, &shutdown).await {
        let _ = faults.send(error);
    }
}

async fn ingest_loop(
    config: &MonitorConfig,
    tls: Arc<rustls::ClientConfig>,
    events: &UnboundedSender<PassengerEvent>,
    shutdown: &CancellationToken,
) -> Result<(), MonitorError> {
    let client = WebSocketClient::new(
        config.server_host.clone(),
        config.server_port,
        config.server_path.clone(),
        tls,
    );
    let connected = tokio::select! {
        () = shutdown.cancelled() => return Ok(()),
        result = client.connect() => result.map_err(ingest_transport_error)?,
    };
    let (session, reader) = connected;

    let login = tokio::select! {
        () = shutdown.cancelled() => return Ok(()),
        result = StompClient::connect(
            session,
            reader,
            &config.server_host,
            &config.username,
            &config.password,
            0,
        ) => result,
    };
    let mut stomp = login.map_err(|e| ingest_stomp_error(e, true))?;

    let subscribed = tokio::select! {
        () = shutdown.cancelled() => None,
        result = stomp.subscribe(INGEST_DESTINATION) => Some(result),
    };
    let Some(result) = subscribed else {
        stomp.disconnect().await.ok();
        return Ok(());
    };
    result.map_err(|e| ingest_stomp_error(e, false))?;
    tracing::info!("Ingest session subscribed to {INGEST_DESTINATION}");

    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => None,
            result = stomp.next_message() => Some(result),
        };
        let Some(result) = next else {
            stomp.disconnect().await.ok();
            return Ok(());
        };
        let message = result.map_err(|e| ingest_stomp_error(e, false))?;

        // Parse failures are logged and dropped; they never kill the session.
        match serde_json::from_str::<PassengerEventEnvelope>(&message.payload) {
            Ok(envelope) => {
                if events.send(envelope.passenger_event).is_err() {
                    return Ok(());
                }
            }
            Err(error) => tracing::warn!("Dropping malformed passenger event: {error}"),
        }
    }
}

fn ingest_transport_error(error: SocketError) -> MonitorError {
    match error {
        SocketError::Resolve { .. } | SocketError::ConnectTimeout(_) | SocketError::Connect(_) => {
            MonitorError::ConnectFailed(error.to_string())
        }
        SocketError::TlsHandshake(_) => MonitorError::TlsHandshakeFailed(error.to_string()),
        SocketError::WsHandshake(_) => MonitorError::WebSocketHandshakeFailed(error.to_string()),
        SocketError::Send(_) | SocketError::Read(_) | SocketError::Closed => {
            MonitorError::IngestClientDisconnected
        }
    }
}

fn ingest_stomp_error(error: StompClientError, during_login: bool) -> MonitorError {
    match error {
        StompClientError::CouldNotConnect(message) => MonitorError::ConnectFailed(message),
        StompClientError::BadHandshake(message) => {
            MonitorError::WebSocketHandshakeFailed(message)
        }
        StompClientError::InvalidFrame(e) => MonitorError::FrameParseError(e.to_string()),
        StompClientError::UnexpectedContentType(_) | StompClientError::SubscriptionMismatch(_) => {
            MonitorError::ProtocolViolation(error.to_string())
        }
        StompClientError::Server(message) => {
            if during_login {
                MonitorError::AuthRejected(message)
            } else {
                MonitorError::ProtocolViolation(message)
            }
        }
        StompClientError::Disconnected => MonitorError::IngestClientDisconnected,
    }
}

// -- Query server ----------------------------------------------------------------------------------

async fn run_query_server(
    config: MonitorConfig,
    tls: Arc<rustls::ServerConfig>,
    queries: UnboundedSender<QueryJob>,
    faults: UnboundedSender<MonitorError>,
    shutdown: CancellationToken,
) {
    let server = match WebSocketServer::bind(&config.query_host, config.query_port, tls).await {
        Ok(server) => server,
        Err(error) => {
            let _ = faults.send(MonitorError::ConnectFailed(error.to_string()));
            return;
        }
    };
    let stomp = StompServer::new(&config.username, &config.password, SERVER_NAME);

    loop {
        let accepted = tokio::select! {
            () = shutdown.cancelled() => return,
            result = server.accept() => result,
        };
        let (transport, reader) = match accepted {
            Ok(pair) => pair,
            Err(error) => {
                tracing::warn!("Query client handshake failed: {error}");
                continue;
            }
        };
        let mut session = match stomp.accept_session(transport, reader).await {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!("Query session rejected: {error}");
                continue;
            }
        };

        match serve_query_session(&mut session, &queries, &shutdown).await {
            Ok(()) => return,
            Err(error) => {
                let _ = faults.send(query_session_error(error));
            }
        }
    }
}

/// Serves one authenticated query session until it ends or shutdown.
async fn serve_query_session<S>(
    session: &mut StompServerSession<S>,
    queries: &UnboundedSender<QueryJob>,
    shutdown: &CancellationToken,
) -> Result<(), StompServerError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        let next = tokio::select! {
            () = shutdown.cancelled() => None,
            result = session.next_request() => Some(result),
        };
        let Some(result) = next else {
            session.close().await.ok();
            return Ok(());
        };
        let request = result?;

        if request.destination != QUERY_DESTINATION {
            tracing::warn!("SEND to unregistered destination '{}'", request.destination);
            session
                .send_error(&format!("unknown destination '{}'", request.destination))
                .await
                .ok();
            continue;
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        if queries
            .send(QueryJob {
                payload: request.payload,
                reply: reply_tx,
            })
            .is_err()
        {
            return Ok(());
        }
        let Ok(response) = reply_rx.await else {
            return Ok(());
        };

        if let Err(error) = session.send_message(QUERY_DESTINATION, response).await {
            if matches!(error, StompServerError::NoSubscriber(_)) {
                session
                    .send_error(&format!(
                        "no subscription for '{QUERY_DESTINATION}' responses",
                    ))
                    .await
                    .ok();
            }
            return Err(error);
        }
        if let Some(receipt) = &request.receipt {
            session.send_receipt(receipt).await.ok();
        }
    }
}

fn query_session_error(error: StompServerError) -> MonitorError {
    match error {
        StompServerError::AuthRejected => MonitorError::AuthRejected("query client".to_string()),
        StompServerError::FrameParse(e) => MonitorError::FrameParseError(e.to_string()),
        StompServerError::ProtocolViolation(message) => MonitorError::ProtocolViolation(message),
        StompServerError::ClientDisconnected => MonitorError::QueryServerClientDisconnected,
        StompServerError::NoSubscriber(destination) => MonitorError::ProtocolViolation(format!(
            "SEND without a subscription to '{destination}'",
        )),
        StompServerError::Transport(e) => match e {
            SocketError::Send(_) | SocketError::Read(_) | SocketError::Closed => {
                MonitorError::QueryServerClientDisconnected
            }
            other => MonitorError::Internal(other.to_string()),
        },
    }
}

////////////////////////////////////////////////////////////////////////////////
// Tests
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use metronet_transit::{LineId, LineSpec, RouteId, RouteSpec, Station};
    use rstest::rstest;

    use super::*;

    fn small_network() -> TransportNetwork {
        let mut network = TransportNetwork::new();
        for id in ["a", "b", "c"] {
            network.add_station(Station {
                id: StationId::new(id),
                name: format!("Station {id}"),
            });
        }
        let line = LineSpec {
            line_id: LineId::new("line_1"),
            name: "Line 1".to_string(),
            routes: vec![RouteSpec {
                route_id: RouteId::new("route_1"),
                direction: "outbound".to_string(),
                line_id: LineId::new("line_1"),
                start_station_id: StationId::new("a"),
                end_station_id: StationId::new("c"),
                route_stops: vec![StationId::new("a"), StationId::new("b"), StationId::new("c")],
            }],
        };
        assert!(network.add_line(&line));
        network.set_travel_time(&StationId::new("a"), &StationId::new("b"), 60);
        network.set_travel_time(&StationId::new("b"), &StationId::new("c"), 60);
        network
    }

    fn answer(network: &TransportNetwork, payload: &str) -> QuietRouteResponse {
        let response = answer_query(
            network,
            &PlannerConfig::default(),
            &MonitorConfig::default(),
            payload,
        );
        serde_json::from_str(&response).unwrap()
    }

    #[rstest]
    fn test_answer_query_returns_itinerary() {
        let network = small_network();

        let response = answer(
            &network,
            r#"{"start_station_id": "a", "end_station_id": "c"}"#,
        );

        assert_eq!(response.error, None);
        assert_eq!(response.total_travel_time, 120);
        assert_eq!(response.steps.len(), 1);
        assert_eq!(response.steps[0].line_id.as_str(), "line_1");
    }

    #[rstest]
    fn test_answer_query_unknown_station_reports_error() {
        let network = small_network();

        let response = answer(
            &network,
            r#"{"start_station_id": "ghost", "end_station_id": "c"}"#,
        );

        assert!(response.steps.is_empty());
        assert!(response.error.expect("error field").contains("ghost"));
    }

    #[rstest]
    fn test_answer_query_malformed_payload_reports_error() {
        let network = small_network();

        let response = answer(&network, "not json at all");

        assert!(response.steps.is_empty());
        assert!(response.error.expect("error field").contains("invalid request"));
    }

    #[rstest]
    fn test_configure_fails_without_server_certificate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = MonitorConfig {
            query_cert_file: temp_dir.path().join("missing-cert.pem"),
            query_key_file: temp_dir.path().join("missing-key.pem"),
            ..Default::default()
        };

        assert!(matches!(
            NetworkMonitor::configure(config),
            Err(MonitorError::ConfigInvalid(_)),
        ));
    }
}
