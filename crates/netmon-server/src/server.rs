//! The accept loop and the per-session protocol state machine.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use netmon_stomp::{Acceptor, Command, Frame, FrameBuilder, Header, StompCodec, Transport};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::session::{SessionHandle, SessionRegistry};

/// Identifies one downstream session. Allocated monotonically by the
/// server.
pub type SessionId = u64;

/// Validates the `login` / `passcode` pair of an incoming session.
pub trait LoginPolicy: Send + Sync + 'static {
    fn authorize(&self, login: Option<&str>, passcode: Option<&str>) -> bool;
}

/// The default policy: plaintext credentials are accepted as-is.
pub struct AcceptAll;

impl LoginPolicy for AcceptAll {
    fn authorize(&self, _login: Option<&str>, _passcode: Option<&str>) -> bool {
        true
    }
}

/// Events surfaced to the server owner.
#[derive(Debug)]
pub enum ServerEvent {
    /// A session completed the handshake.
    Connected { session: SessionId },
    /// A client sent a frame to a destination.
    Send {
        session: SessionId,
        destination: String,
        body: String,
    },
    /// A session ended (DISCONNECT, transport drop, or protocol error).
    Disconnected { session: SessionId },
}

/// The STOMP server: an accept loop plus one task per session.
#[derive(Debug)]
pub struct StompServer {
    registry: Arc<SessionRegistry>,
    shutdown: CancellationToken,
}

impl StompServer {
    /// Start accepting sessions. Returns the server handle and the event
    /// receiver.
    pub fn start<A: Acceptor>(
        acceptor: A,
        policy: Arc<dyn LoginPolicy>,
    ) -> (Self, mpsc::Receiver<ServerEvent>) {
        let registry = Arc::new(SessionRegistry::default());
        let shutdown = CancellationToken::new();
        let (event_tx, event_rx) = mpsc::channel(256);

        tokio::spawn(accept_loop(
            acceptor,
            registry.clone(),
            policy,
            event_tx,
            shutdown.clone(),
        ));

        (Self { registry, shutdown }, event_rx)
    }

    /// Deliver a MESSAGE frame with `body` on one session only. The frame
    /// carries a monotonically increasing `message-id` and the
    /// subscription id the session registered for `destination`.
    pub fn send(
        &self,
        session: SessionId,
        destination: &str,
        body: String,
    ) -> Result<(), ServerError> {
        let handle = self
            .registry
            .get(session)
            .ok_or(ServerError::UnknownSession(session))?;
        let subscription = handle
            .subscription_for(destination)
            .unwrap_or_else(|| "0".to_owned());
        let message_id = self.registry.allocate_message_id();
        let wire = FrameBuilder::new(Command::Message)
            .header(Header::Destination, destination)
            .header(Header::MessageId, message_id.to_string())
            .header(Header::Subscription, subscription)
            .body(body)
            .build()?;
        if handle.try_send(wire) {
            Ok(())
        } else {
            Err(ServerError::SessionUnavailable(session))
        }
    }

    /// Number of connected sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Stop accepting and close all sessions.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

async fn accept_loop<A: Acceptor>(
    mut acceptor: A,
    registry: Arc<SessionRegistry>,
    policy: Arc<dyn LoginPolicy>,
    events: mpsc::Sender<ServerEvent>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            accepted = acceptor.accept() => match accepted {
                Ok(transport) => {
                    let id = registry.allocate_session_id();
                    debug!(session = id, "transport accepted");
                    tokio::spawn(run_session(
                        transport,
                        id,
                        registry.clone(),
                        policy.clone(),
                        events.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(error) => {
                    warn!(%error, "accept failed, stopping listener");
                    break;
                }
            },
        }
    }
}

async fn run_session<T: Transport>(
    transport: T,
    id: SessionId,
    registry: Arc<SessionRegistry>,
    policy: Arc<dyn LoginPolicy>,
    events: mpsc::Sender<ServerEvent>,
    shutdown: CancellationToken,
) {
    let mut framed = Framed::new(transport, StompCodec);

    // Pending: the first frame must be a valid STOMP or CONNECT.
    let connect = tokio::select! {
        () = shutdown.cancelled() => return,
        inbound = framed.next() => match inbound {
            Some(Ok(frame)) => frame,
            Some(Err(error)) => {
                debug!(session = id, %error, "malformed frame during handshake");
                let _ = send_error(&mut framed, "malformed frame").await;
                return;
            }
            None => return,
        },
    };

    if !matches!(connect.command(), Command::Stomp | Command::Connect) {
        let _ = send_error(&mut framed, "expected STOMP or CONNECT").await;
        return;
    }
    let versions = connect.header(Header::AcceptVersion).unwrap_or_default();
    if !versions.split(',').any(|v| v.trim() == "1.2") {
        let _ = send_error(&mut framed, "only STOMP 1.2 is supported").await;
        return;
    }
    if !policy.authorize(
        connect.header(Header::Login),
        connect.header(Header::Passcode),
    ) {
        let _ = send_error(&mut framed, "login rejected").await;
        return;
    }

    let connected = FrameBuilder::new(Command::Connected)
        .header(Header::Version, "1.2")
        .header(Header::Session, id.to_string())
        .build();
    match connected {
        Ok(wire) => {
            if framed.send(wire).await.is_err() {
                return;
            }
        }
        Err(_) => return,
    }

    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(256);
    let handle = Arc::new(SessionHandle::new(id, outbound_tx));
    registry.insert(handle.clone());
    info!(session = id, "session connected");
    let _ = events.send(ServerEvent::Connected { session: id }).await;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            outbound = outbound_rx.recv() => match outbound {
                Some(wire) => {
                    if framed.send(wire).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = framed.next() => match inbound {
                None => break,
                Some(Err(error)) => {
                    debug!(session = id, %error, "malformed frame, closing session");
                    let _ = send_error(&mut framed, "malformed frame").await;
                    break;
                }
                Some(Ok(frame)) => {
                    if !handle_frame(&mut framed, &frame, &handle, id, &events).await {
                        break;
                    }
                }
            },
        }
    }

    registry.remove(id);
    info!(session = id, "session disconnected");
    let _ = events.send(ServerEvent::Disconnected { session: id }).await;
}

/// Dispatch one frame on a connected session. Returns `false` when the
/// session should end.
async fn handle_frame<T: Transport>(
    framed: &mut Framed<T, StompCodec>,
    frame: &Frame,
    handle: &SessionHandle,
    id: SessionId,
    events: &mpsc::Sender<ServerEvent>,
) -> bool {
    match frame.command() {
        Command::Subscribe => {
            // destination and id are codec-enforced.
            let destination = frame.header(Header::Destination).unwrap_or_default();
            let subscription = frame.header(Header::Id).unwrap_or_default();
            debug!(session = id, destination, subscription, "subscribe");
            handle.record_subscription(destination.to_owned(), subscription.to_owned());
            send_receipt_if_requested(framed, frame).await
        }
        Command::Unsubscribe => {
            let subscription = frame.header(Header::Id).unwrap_or_default();
            handle.remove_subscription(subscription);
            send_receipt_if_requested(framed, frame).await
        }
        Command::Send => {
            let destination = frame.header(Header::Destination).unwrap_or_default();
            let _ = events
                .send(ServerEvent::Send {
                    session: id,
                    destination: destination.to_owned(),
                    body: frame.body().to_owned(),
                })
                .await;
            true
        }
        Command::Disconnect => {
            let _ = send_receipt_if_requested(framed, frame).await;
            false
        }
        other => {
            debug!(session = id, command = %other, "unsupported command");
            let _ = send_error(framed, "unsupported command").await;
            false
        }
    }
}

async fn send_receipt_if_requested<T: Transport>(
    framed: &mut Framed<T, StompCodec>,
    frame: &Frame,
) -> bool {
    let Some(receipt) = frame.header(Header::Receipt) else {
        return true;
    };
    let built = FrameBuilder::new(Command::Receipt)
        .header(Header::ReceiptId, receipt)
        .build();
    match built {
        Ok(wire) => framed.send(wire).await.is_ok(),
        Err(_) => false,
    }
}

async fn send_error<T: Transport>(
    framed: &mut Framed<T, StompCodec>,
    message: &str,
) -> Result<(), netmon_stomp::CodecError> {
    let built = FrameBuilder::new(Command::Error).header(Header::Message, message);
    match built.build() {
        Ok(wire) => framed.send(wire).await,
        Err(_) => Ok(()),
    }
}
