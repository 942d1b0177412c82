//! The monitor: startup wiring and the serial event loop.
//!
//! One task owns the transport network and drives a single `select!` over
//! upstream passenger events, downstream quiet-route queries, and
//! cancellation. Serial dispatch is the concurrency contract: every graph
//! mutation and every query runs on this loop, in arrival order, so the
//! network needs no locks.

use std::sync::Arc;
use std::time::Duration;

use netmon_client::{ClientEvent, StompClient, StompClientConfig, SubscriptionId};
use netmon_core::{PassengerEvent, StationId};
use netmon_server::{AcceptAll, ServerEvent, SessionId, StompServer};
use netmon_stomp::{Acceptor, Connector};
use netmon_transit::TransportNetwork;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::layout::{self, LayoutSource};

/// A quiet-route query body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuietRouteRequest {
    pub start_station_id: StationId,
    pub end_station_id: StationId,
}

/// Cloneable handle for stopping a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    token: CancellationToken,
}

impl MonitorHandle {
    /// Cancel all outstanding work; `run` returns once the loop winds
    /// down.
    pub fn stop(&self) {
        self.token.cancel();
    }
}

enum LoopEvent {
    Stop,
    Client(Option<ClientEvent>),
    Server(Option<ServerEvent>),
}

/// The live transport network monitor.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    network: TransportNetwork,
    client: StompClient,
    client_events: mpsc::Receiver<ClientEvent>,
    server: StompServer,
    server_events: mpsc::Receiver<ServerEvent>,
    subscription: SubscriptionId,
    shutdown: CancellationToken,
    last_error: Option<MonitorError>,
}

impl Monitor {
    /// Wire up the whole monitor: validate the configuration, acquire and
    /// ingest the network layout, connect and subscribe upstream, and
    /// start the downstream server on `acceptor`.
    pub async fn new<C: Connector, A: Acceptor>(
        config: MonitorConfig,
        connector: &C,
        acceptor: A,
    ) -> Result<Self, MonitorError> {
        if let Some(ca_cert) = &config.ca_cert_file {
            if !ca_cert.exists() {
                return Err(MonitorError::MissingCaCertFile(
                    ca_cert.display().to_string(),
                ));
            }
        }

        let source = config
            .network_layout_file
            .as_deref()
            .map(LayoutSource::from_config_value)
            .ok_or_else(|| {
                MonitorError::MissingNetworkLayoutFile("no layout configured".into())
            })?;
        let doc = layout::load_topology(&source).await?;

        let mut network = TransportNetwork::with_route_change_penalty(config.route_change_penalty);
        let complete = network.populate(&doc)?;
        if !complete {
            warn!("some travel times in the network layout could not be applied");
        }

        let (mut client, client_events) = StompClient::connect(
            connector,
            StompClientConfig {
                host: config.network_events_url.clone(),
                login: config.network_events_username.clone(),
                passcode: config.network_events_password.clone(),
            },
        )
        .await
        .map_err(MonitorError::CouldNotConnectToStompClient)?;

        let subscription = client
            .subscribe(&config.passenger_events_destination)
            .await
            .map_err(MonitorError::CouldNotSubscribeToPassengerEvents)?;
        info!(
            destination = %config.passenger_events_destination,
            subscription, "subscribed to passenger events"
        );

        let (server, server_events) = StompServer::start(acceptor, Arc::new(AcceptAll));

        Ok(Self {
            config,
            network,
            client,
            client_events,
            server,
            server_events,
            subscription,
            shutdown: CancellationToken::new(),
            last_error: None,
        })
    }

    /// A handle that can stop this monitor from another task.
    #[must_use]
    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            token: self.shutdown.clone(),
        }
    }

    /// The network model, as updated by the event stream so far.
    #[must_use]
    pub fn network(&self) -> &TransportNetwork {
        &self.network
    }

    /// The most recent error observed by the loop, fatal or skipped.
    #[must_use]
    pub fn last_error(&self) -> Option<&MonitorError> {
        self.last_error.as_ref()
    }

    /// Run the event loop until [`MonitorHandle::stop`] or a fatal error.
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        self.run_inner(None).await
    }

    /// Run the event loop, stopping after `duration`.
    pub async fn run_for(&mut self, duration: Duration) -> Result<(), MonitorError> {
        self.run_inner(Some(duration)).await
    }

    async fn run_inner(&mut self, limit: Option<Duration>) -> Result<(), MonitorError> {
        let deadline = async {
            match limit {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);

        info!("monitor running");
        let result = loop {
            let event = tokio::select! {
                () = self.shutdown.cancelled() => LoopEvent::Stop,
                () = &mut deadline => LoopEvent::Stop,
                event = self.client_events.recv() => LoopEvent::Client(event),
                event = self.server_events.recv() => LoopEvent::Server(event),
            };

            match event {
                LoopEvent::Stop => break Ok(()),
                LoopEvent::Client(Some(ClientEvent::Message {
                    subscription, body, ..
                })) => {
                    if subscription != self.subscription {
                        debug!(subscription, "message on unexpected subscription");
                    }
                    self.on_passenger_event(&body);
                }
                LoopEvent::Client(Some(ClientEvent::Disconnected { reason })) => {
                    warn!(?reason, "upstream session disconnected, stopping");
                    self.last_error = Some(MonitorError::StompClientDisconnected);
                    break Err(MonitorError::StompClientDisconnected);
                }
                LoopEvent::Client(None) => {
                    self.last_error = Some(MonitorError::StompClientDisconnected);
                    break Err(MonitorError::StompClientDisconnected);
                }
                LoopEvent::Server(Some(ServerEvent::Send {
                    session,
                    destination,
                    body,
                })) => self.on_query(session, &destination, &body),
                LoopEvent::Server(Some(ServerEvent::Connected { session })) => {
                    debug!(session, "downstream client connected");
                }
                LoopEvent::Server(Some(ServerEvent::Disconnected { session })) => {
                    debug!(session, "downstream client disconnected");
                    self.last_error = Some(MonitorError::StompServerClientDisconnected);
                }
                LoopEvent::Server(None) => {
                    self.last_error = Some(MonitorError::StompServerDisconnected);
                    break Err(MonitorError::StompServerDisconnected);
                }
            }
        };

        self.client.close().await;
        self.server.stop();
        info!("monitor stopped");
        result
    }

    /// Apply one inbound passenger event to the network. Bad events are
    /// recorded and skipped; they never tear down the subscription.
    fn on_passenger_event(&mut self, body: &str) {
        let event: PassengerEvent = match serde_json::from_str(body) {
            Ok(event) => event,
            Err(error) => {
                warn!(%error, "skipping unparseable passenger event");
                self.last_error = Some(MonitorError::CouldNotParsePassengerEvent(
                    error.to_string(),
                ));
                return;
            }
        };
        if !self.network.record_passenger_event(&event) {
            warn!(station = %event.station_id, "passenger event for unknown station");
            self.last_error = Some(MonitorError::CouldNotRecordPassengerEvent(
                event.station_id,
            ));
        }
    }

    /// Answer one quiet-route query. Parse failures are reported back to
    /// the requesting client as a JSON error body; the session stays up.
    fn on_query(&mut self, session: SessionId, destination: &str, body: &str) {
        if destination != self.config.quiet_route_destination {
            debug!(session, destination, "ignoring send to unknown destination");
            return;
        }

        let reply = match serde_json::from_str::<QuietRouteRequest>(body) {
            Ok(request) => {
                let route = self.network.quiet_travel_route(
                    &request.start_station_id,
                    &request.end_station_id,
                    self.config.quiet_route_max_slowdown_pc,
                    self.config.quiet_route_min_quietness_pc,
                    self.config.quiet_route_max_n_paths,
                );
                debug!(
                    session,
                    start = %request.start_station_id,
                    end = %request.end_station_id,
                    total = route.total_travel_time,
                    "quiet route answered"
                );
                route.to_string()
            }
            Err(error) => {
                warn!(session, %error, "unparseable quiet-route request");
                self.last_error = Some(MonitorError::CouldNotParseQuietRouteRequest(
                    error.to_string(),
                ));
                serde_json::json!({
                    "error": format!("could not parse quiet-route request: {error}")
                })
                .to_string()
            }
        };

        if let Err(error) = self.server.send(
            session,
            &self.config.quiet_route_response_destination,
            reply,
        ) {
            warn!(session, %error, "could not deliver quiet-route response");
        }
    }
}
