//! The STOMP client session.
//!
//! One task owns the framed transport. Commands (subscribe, send, close)
//! arrive over a channel with oneshot completions; inbound MESSAGE frames
//! and the final disconnect are posted to the event channel. A malformed
//! inbound frame tears the session down with a parse-error reason.

use std::collections::HashMap;

use futures::{SinkExt, StreamExt};
use netmon_stomp::{Command, Connector, Frame, FrameBuilder, Header, StompCodec, Transport};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Identifies one subscription on a session. Allocated monotonically.
pub type SubscriptionId = u64;

/// Connection parameters for the upstream session.
#[derive(Clone, Debug)]
pub struct StompClientConfig {
    /// Value of the `host` header.
    pub host: String,
    pub login: String,
    pub passcode: String,
}

/// Events posted to the session owner.
#[derive(Debug)]
pub enum ClientEvent {
    /// A MESSAGE frame arrived on a subscription.
    Message {
        subscription: SubscriptionId,
        destination: String,
        body: String,
    },
    /// The session ended. Posted exactly once.
    Disconnected { reason: DisconnectReason },
}

/// Why the session ended.
#[derive(Debug)]
pub enum DisconnectReason {
    /// The session was closed locally.
    Closed,
    /// The transport reached end of stream.
    TransportClosed,
    /// An inbound frame failed to decode.
    ParseError(netmon_stomp::CodecError),
    /// The server sent an ERROR frame.
    ServerError(String),
}

enum SessionCommand {
    Subscribe {
        destination: String,
        id: SubscriptionId,
        receipt: String,
        done: oneshot::Sender<Result<(), ClientError>>,
    },
    Send {
        destination: String,
        body: String,
        done: oneshot::Sender<Result<(), ClientError>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Handle to a connected STOMP session.
#[derive(Debug)]
pub struct StompClient {
    commands: mpsc::Sender<SessionCommand>,
    next_subscription: u64,
    next_request: u64,
}

impl StompClient {
    /// Dial the transport and perform the STOMP handshake: send `STOMP`
    /// with `accept-version:1.2`, `host`, `login`, and `passcode`, then
    /// wait for `CONNECTED`. Any other reply fails the connect and closes
    /// the transport.
    ///
    /// On success returns the command handle and the event receiver.
    pub async fn connect<C: Connector>(
        connector: &C,
        config: StompClientConfig,
    ) -> Result<(Self, mpsc::Receiver<ClientEvent>), ClientError> {
        let transport = connector.connect().await?;
        let mut framed = Framed::new(transport, StompCodec);

        let hello = FrameBuilder::new(Command::Stomp)
            .header(Header::AcceptVersion, "1.2")
            .header(Header::Host, config.host.as_str())
            .header(Header::Login, config.login.as_str())
            .header(Header::Passcode, config.passcode.as_str())
            .build()?;
        framed.send(hello).await?;

        match framed.next().await {
            None => Err(ClientError::ConnectionClosed),
            Some(Err(err)) => Err(ClientError::Codec(err)),
            Some(Ok(frame)) => match frame.command() {
                Command::Connected => {
                    debug!(
                        version = frame.header(Header::Version).unwrap_or_default(),
                        session = frame.header(Header::Session).unwrap_or_default(),
                        "session connected"
                    );
                    let (command_tx, command_rx) = mpsc::channel(32);
                    let (event_tx, event_rx) = mpsc::channel(256);
                    tokio::spawn(run_session(framed, command_rx, event_tx));
                    Ok((
                        Self {
                            commands: command_tx,
                            next_subscription: 0,
                            next_request: 0,
                        },
                        event_rx,
                    ))
                }
                Command::Error => Err(ClientError::Rejected(describe_error(&frame))),
                other => Err(ClientError::UnexpectedReply(other)),
            },
        }
    }

    /// Subscribe to a destination. Resolves with the new subscription ID
    /// once the server acknowledges the receipt.
    pub async fn subscribe(&mut self, destination: &str) -> Result<SubscriptionId, ClientError> {
        let id = self.next_subscription;
        self.next_subscription += 1;
        let receipt = format!("receipt-{}", self.next_request);
        self.next_request += 1;

        let (done, wait) = oneshot::channel();
        self.commands
            .send(SessionCommand::Subscribe {
                destination: destination.to_owned(),
                id,
                receipt,
                done,
            })
            .await
            .map_err(|_| ClientError::OperationAborted)?;
        wait.await.map_err(|_| ClientError::OperationAborted)??;
        Ok(id)
    }

    /// Send a JSON body to a destination. Resolves with the request ID
    /// once the frame is on the wire.
    pub async fn send(
        &mut self,
        destination: &str,
        body: impl Into<String>,
    ) -> Result<u64, ClientError> {
        let request = self.next_request;
        self.next_request += 1;

        let (done, wait) = oneshot::channel();
        self.commands
            .send(SessionCommand::Send {
                destination: destination.to_owned(),
                body: body.into(),
                done,
            })
            .await
            .map_err(|_| ClientError::OperationAborted)?;
        wait.await.map_err(|_| ClientError::OperationAborted)??;
        Ok(request)
    }

    /// Send `DISCONNECT` and close the transport. Closing an already dead
    /// session is a no-op.
    pub async fn close(&mut self) {
        let (done, wait) = oneshot::channel();
        if self
            .commands
            .send(SessionCommand::Close { done })
            .await
            .is_ok()
        {
            let _ = wait.await;
        }
    }
}

async fn run_session<T: Transport>(
    mut framed: Framed<T, StompCodec>,
    mut commands: mpsc::Receiver<SessionCommand>,
    events: mpsc::Sender<ClientEvent>,
) {
    let mut pending_receipts: HashMap<String, oneshot::Sender<Result<(), ClientError>>> =
        HashMap::new();

    let reason = loop {
        tokio::select! {
            command = commands.recv() => match command {
                None => {
                    // Owner dropped the handle without close().
                    let _ = framed.close().await;
                    break DisconnectReason::Closed;
                }
                Some(SessionCommand::Subscribe { destination, id, receipt, done }) => {
                    let builder = FrameBuilder::new(Command::Subscribe)
                        .header(Header::Destination, destination)
                        .header(Header::Id, id.to_string())
                        .header(Header::Receipt, receipt.clone());
                    match send_frame(&mut framed, builder).await {
                        Ok(()) => {
                            pending_receipts.insert(receipt, done);
                        }
                        Err(err) => {
                            let _ = done.send(Err(err));
                            break DisconnectReason::TransportClosed;
                        }
                    }
                }
                Some(SessionCommand::Send { destination, body, done }) => {
                    let builder = FrameBuilder::new(Command::Send)
                        .header(Header::Destination, destination)
                        .header(Header::ContentType, "application/json")
                        .body(body);
                    match send_frame(&mut framed, builder).await {
                        Ok(()) => {
                            let _ = done.send(Ok(()));
                        }
                        Err(err) => {
                            let _ = done.send(Err(err));
                            break DisconnectReason::TransportClosed;
                        }
                    }
                }
                Some(SessionCommand::Close { done }) => {
                    let _ = send_frame(&mut framed, FrameBuilder::new(Command::Disconnect)).await;
                    let _ = framed.close().await;
                    let _ = done.send(());
                    break DisconnectReason::Closed;
                }
            },
            inbound = framed.next() => match inbound {
                None => break DisconnectReason::TransportClosed,
                Some(Err(err)) => {
                    warn!(error = %err, "malformed inbound frame, closing session");
                    break DisconnectReason::ParseError(err);
                }
                Some(Ok(frame)) => match frame.command() {
                    Command::Message => dispatch_message(&frame, &events).await,
                    Command::Receipt => {
                        let receipt_id = frame.header(Header::ReceiptId).unwrap_or_default();
                        match pending_receipts.remove(receipt_id) {
                            Some(done) => {
                                let _ = done.send(Ok(()));
                            }
                            None => warn!(receipt_id, "receipt for unknown request"),
                        }
                    }
                    Command::Error => break DisconnectReason::ServerError(describe_error(&frame)),
                    other => debug!(command = %other, "ignoring unexpected frame"),
                },
            },
        }
    };

    // Outstanding operations complete exactly once, as aborted.
    for (_, done) in pending_receipts {
        let _ = done.send(Err(ClientError::OperationAborted));
    }
    let _ = events.send(ClientEvent::Disconnected { reason }).await;
}

async fn send_frame<T: Transport>(
    framed: &mut Framed<T, StompCodec>,
    builder: FrameBuilder,
) -> Result<(), ClientError> {
    let wire = builder.build()?;
    framed.send(wire).await?;
    Ok(())
}

async fn dispatch_message(frame: &Frame, events: &mpsc::Sender<ClientEvent>) {
    // The codec guarantees the subscription header is present.
    let raw = frame.header(Header::Subscription).unwrap_or_default();
    let Ok(subscription) = raw.parse::<u64>() else {
        warn!(subscription = raw, "message with unparseable subscription id");
        return;
    };
    let destination = frame
        .header(Header::Destination)
        .unwrap_or_default()
        .to_owned();
    let _ = events
        .send(ClientEvent::Message {
            subscription,
            destination,
            body: frame.body().to_owned(),
        })
        .await;
}

fn describe_error(frame: &Frame) -> String {
    match frame.header(Header::Message) {
        Some(message) => message.to_owned(),
        None if frame.has_body() => frame.body().to_owned(),
        None => "unspecified error".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmon_stomp::testing::{memory_endpoint, MemoryAcceptor};
    use netmon_stomp::Acceptor;
    use tokio::io::DuplexStream;

    fn config() -> StompClientConfig {
        StompClientConfig {
            host: "transport.example".into(),
            login: "user".into(),
            passcode: "secret".into(),
        }
    }

    async fn accept(acceptor: &mut MemoryAcceptor) -> Framed<DuplexStream, StompCodec> {
        let transport = acceptor.accept().await.unwrap();
        Framed::new(transport, StompCodec)
    }

    /// Accept the dial and answer the handshake with CONNECTED. Returns
    /// the server-side framed stream and the client's STOMP frame.
    async fn accept_and_connect(
        acceptor: &mut MemoryAcceptor,
    ) -> (Framed<DuplexStream, StompCodec>, Frame) {
        let mut framed = accept(acceptor).await;
        let hello = framed.next().await.unwrap().unwrap();
        let reply = FrameBuilder::new(Command::Connected)
            .header(Header::Version, "1.2")
            .header(Header::Session, "sess-1")
            .build()
            .unwrap();
        framed.send(reply).await.unwrap();
        (framed, hello)
    }

    #[tokio::test]
    async fn connect_sends_stomp_handshake() {
        let (dialer, mut acceptor) = memory_endpoint();
        let server = tokio::spawn(async move { accept_and_connect(&mut acceptor).await });

        let (_client, _events) = StompClient::connect(&dialer, config()).await.unwrap();
        let (_framed, hello) = server.await.unwrap();

        assert_eq!(hello.command(), Command::Stomp);
        assert_eq!(hello.header(Header::AcceptVersion), Some("1.2"));
        assert_eq!(hello.header(Header::Host), Some("transport.example"));
        assert_eq!(hello.header(Header::Login), Some("user"));
        assert_eq!(hello.header(Header::Passcode), Some("secret"));
    }

    #[tokio::test]
    async fn connect_rejected_by_error_frame() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let mut framed = accept(&mut acceptor).await;
            let _ = framed.next().await;
            let reply = FrameBuilder::new(Command::Error)
                .header(Header::Message, "bad credentials")
                .build()
                .unwrap();
            framed.send(reply).await.unwrap();
        });

        let err = StompClient::connect(&dialer, config()).await.unwrap_err();
        match err {
            ClientError::Rejected(message) => assert_eq!(message, "bad credentials"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connect_with_unexpected_reply_fails() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let mut framed = accept(&mut acceptor).await;
            let _ = framed.next().await;
            let reply = FrameBuilder::new(Command::Receipt)
                .header(Header::ReceiptId, "1")
                .build()
                .unwrap();
            framed.send(reply).await.unwrap();
        });

        let err = StompClient::connect(&dialer, config()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedReply(Command::Receipt)
        ));
    }

    #[tokio::test]
    async fn connect_fails_when_transport_closes_early() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let mut framed = accept(&mut acceptor).await;
            let _ = framed.next().await;
            // Drop without replying.
        });

        let err = StompClient::connect(&dialer, config()).await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionClosed));
    }

    #[tokio::test]
    async fn subscribe_resolves_on_receipt_with_monotonic_ids() {
        let (dialer, mut acceptor) = memory_endpoint();
        let server = tokio::spawn(async move {
            let (mut framed, _) = accept_and_connect(&mut acceptor).await;
            for _ in 0..2 {
                let frame = framed.next().await.unwrap().unwrap();
                assert_eq!(frame.command(), Command::Subscribe);
                let receipt = frame.header(Header::Receipt).unwrap().to_owned();
                let ack = FrameBuilder::new(Command::Receipt)
                    .header(Header::ReceiptId, receipt)
                    .build()
                    .unwrap();
                framed.send(ack).await.unwrap();
            }
            framed
        });

        let (mut client, _events) = StompClient::connect(&dialer, config()).await.unwrap();
        let first = client.subscribe("/passengers").await.unwrap();
        let second = client.subscribe("/alerts").await.unwrap();
        assert_eq!(first, 0);
        assert_eq!(second, 1);
        let _ = server.await.unwrap();
    }

    #[tokio::test]
    async fn message_frames_are_dispatched_with_subscription() {
        let (dialer, mut acceptor) = memory_endpoint();
        let server = tokio::spawn(async move {
            let (mut framed, _) = accept_and_connect(&mut acceptor).await;
            let message = FrameBuilder::new(Command::Message)
                .header(Header::Destination, "/passengers")
                .header(Header::MessageId, "m-1")
                .header(Header::Subscription, "0")
                .body(r#"{"station_id":"s1"}"#)
                .build()
                .unwrap();
            framed.send(message).await.unwrap();
            framed
        });

        let (_client, mut events) = StompClient::connect(&dialer, config()).await.unwrap();
        match events.recv().await.unwrap() {
            ClientEvent::Message {
                subscription,
                destination,
                body,
            } => {
                assert_eq!(subscription, 0);
                assert_eq!(destination, "/passengers");
                assert_eq!(body, r#"{"station_id":"s1"}"#);
            }
            other => panic!("expected Message, got {other:?}"),
        }
        let _ = server.await.unwrap();
    }

    #[tokio::test]
    async fn send_emits_send_frame_with_json_content_type() {
        let (dialer, mut acceptor) = memory_endpoint();
        let server = tokio::spawn(async move {
            let (mut framed, _) = accept_and_connect(&mut acceptor).await;
            framed.next().await.unwrap().unwrap()
        });

        let (mut client, _events) = StompClient::connect(&dialer, config()).await.unwrap();
        let request = client.send("/quiet-route", r#"{"a":1}"#).await.unwrap();
        assert_eq!(request, 0);

        let frame = server.await.unwrap();
        assert_eq!(frame.command(), Command::Send);
        assert_eq!(frame.header(Header::Destination), Some("/quiet-route"));
        assert_eq!(frame.header(Header::ContentType), Some("application/json"));
        assert_eq!(frame.header(Header::ContentLength), Some("7"));
        assert_eq!(frame.body(), r#"{"a":1}"#);
    }

    #[tokio::test]
    async fn malformed_inbound_frame_disconnects() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let (mut framed, _) = accept_and_connect(&mut acceptor).await;
            framed.send("GIBBERISH\n\n\0".to_string()).await.unwrap();
            framed
        });

        let (_client, mut events) = StompClient::connect(&dialer, config()).await.unwrap();
        match events.recv().await.unwrap() {
            ClientEvent::Disconnected {
                reason: DisconnectReason::ParseError(_),
            } => {}
            other => panic!("expected parse-error disconnect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_frame_disconnects_with_server_error() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let (mut framed, _) = accept_and_connect(&mut acceptor).await;
            let error = FrameBuilder::new(Command::Error)
                .header(Header::Message, "subscription shed")
                .build()
                .unwrap();
            framed.send(error).await.unwrap();
            framed
        });

        let (_client, mut events) = StompClient::connect(&dialer, config()).await.unwrap();
        match events.recv().await.unwrap() {
            ClientEvent::Disconnected {
                reason: DisconnectReason::ServerError(message),
            } => assert_eq!(message, "subscription shed"),
            other => panic!("expected server-error disconnect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_sends_disconnect_frame() {
        let (dialer, mut acceptor) = memory_endpoint();
        let server = tokio::spawn(async move {
            let (mut framed, _) = accept_and_connect(&mut acceptor).await;
            framed.next().await.unwrap().unwrap()
        });

        let (mut client, mut events) = StompClient::connect(&dialer, config()).await.unwrap();
        client.close().await;

        let frame = server.await.unwrap();
        assert_eq!(frame.command(), Command::Disconnect);
        match events.recv().await.unwrap() {
            ClientEvent::Disconnected {
                reason: DisconnectReason::Closed,
            } => {}
            other => panic!("expected local-close disconnect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn operations_after_close_fail_fast() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let (framed, _) = accept_and_connect(&mut acceptor).await;
            // Keep the server half alive until the client is done.
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            drop(framed);
        });

        let (mut client, _events) = StompClient::connect(&dialer, config()).await.unwrap();
        client.close().await;

        let err = client.send("/quiet-route", "{}").await.unwrap_err();
        assert!(matches!(err, ClientError::OperationAborted));
        let err = client.subscribe("/passengers").await.unwrap_err();
        assert!(matches!(err, ClientError::OperationAborted));
    }

    #[tokio::test]
    async fn transport_drop_disconnects() {
        let (dialer, mut acceptor) = memory_endpoint();
        tokio::spawn(async move {
            let (framed, _) = accept_and_connect(&mut acceptor).await;
            drop(framed);
        });

        let (_client, mut events) = StompClient::connect(&dialer, config()).await.unwrap();
        match events.recv().await.unwrap() {
            ClientEvent::Disconnected {
                reason: DisconnectReason::TransportClosed,
            } => {}
            other => panic!("expected transport-closed disconnect, got {other:?}"),
        }
    }
}
