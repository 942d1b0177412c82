//! Per-session state shared between the session task and the server
//! handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;

use crate::server::SessionId;

/// A connected downstream session.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    pub(crate) id: SessionId,
    /// Wire frames to the session's writer task.
    outbound: mpsc::Sender<String>,
    /// Subscription id by destination, as declared by the client.
    subscriptions: Mutex<HashMap<String, String>>,
}

impl SessionHandle {
    pub(crate) fn new(id: SessionId, outbound: mpsc::Sender<String>) -> Self {
        Self {
            id,
            outbound,
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    /// Queue a wire frame for delivery. Returns `false` if the session's
    /// channel is full or closed.
    pub(crate) fn try_send(&self, wire: String) -> bool {
        self.outbound.try_send(wire).is_ok()
    }

    pub(crate) fn record_subscription(&self, destination: String, subscription: String) {
        self.subscriptions.lock().insert(destination, subscription);
    }

    pub(crate) fn remove_subscription(&self, subscription: &str) {
        self.subscriptions
            .lock()
            .retain(|_, sub| sub != subscription);
    }

    /// The subscription id the client registered for a destination.
    pub(crate) fn subscription_for(&self, destination: &str) -> Option<String> {
        self.subscriptions.lock().get(destination).cloned()
    }
}

/// The bidirectional session registry, plus the server-wide counters.
#[derive(Default, Debug)]
pub(crate) struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
    next_session_id: AtomicU64,
    next_message_id: AtomicU64,
}

impl SessionRegistry {
    pub(crate) fn allocate_session_id(&self) -> SessionId {
        self.next_session_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn allocate_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, handle: Arc<SessionHandle>) {
        self.sessions.write().insert(handle.id, handle);
    }

    pub(crate) fn remove(&self, id: SessionId) {
        self.sessions.write().remove(&id);
    }

    pub(crate) fn get(&self, id: SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.read().get(&id).cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.sessions.read().len()
    }
}
