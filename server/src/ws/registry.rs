//! Subscriber registry: which live connections are watching which vendor.
//!
//! All mutation funnels through subscribe/unsubscribe; the broadcaster only
//! ever sees snapshots, so delivery never holds a map lock. Connections are
//! identified by a process-unique id minted at handshake, which makes
//! subscribe idempotent and lets the broadcaster and the connection actor
//! race on cleanup without double-removal problems.

use axum::extract::ws::{CloseFrame, Message};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::SendError;

use crate::ws::ConnectionSender;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one subscriber connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

/// Handle to one live subscriber connection.
///
/// Cloning shares the underlying channel; identity is the `id`, not the
/// channel, so a connection appears at most once per entity in the registry.
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub id: ConnectionId,
    tx: ConnectionSender,
}

impl Subscriber {
    pub fn new(tx: ConnectionSender) -> Self {
        Self {
            id: ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            tx,
        }
    }

    /// Enqueue a message for this subscriber's writer task.
    /// Fails only when the connection is already torn down.
    pub fn send(&self, msg: Message) -> Result<(), SendError<Message>> {
        self.tx.send(msg)
    }

    /// Best-effort close: ask the writer task to emit a close frame.
    /// On an already-dead connection this is a no-op.
    pub fn close(&self) {
        let _ = self.tx.send(Message::Close(Some(CloseFrame {
            code: 1001,
            reason: "connection dropped by server".into(),
        })));
    }
}

/// Registry of live subscriber connections per entity.
///
/// Cloneable — store in AppState. DashMap gives per-shard locking, so
/// subscribe/unsubscribe from connection tasks and snapshots from the
/// ingest path never serialize against each other globally.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<DashMap<String, Vec<Subscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Register a connection under an entity. Idempotent per connection id.
    pub fn subscribe(&self, entity_id: &str, subscriber: Subscriber) {
        let mut subscribers = self.inner.entry(entity_id.to_string()).or_default();
        if !subscribers.iter().any(|s| s.id == subscriber.id) {
            subscribers.push(subscriber);
        }
        let count = subscribers.len();
        drop(subscribers);

        tracing::debug!(entity_id = %entity_id, subscribers = count, "Subscriber registered");
    }

    /// Remove a connection from an entity's set. No-op if absent —
    /// the connection actor and the broadcaster may both try.
    pub fn unsubscribe(&self, entity_id: &str, connection_id: ConnectionId) {
        if let Some(mut subscribers) = self.inner.get_mut(entity_id) {
            subscribers.retain(|s| s.id != connection_id);
        }
        // Drop the entry once the last subscriber leaves. remove_if re-checks
        // under the shard lock, so a concurrent subscribe is not lost.
        self.inner.remove_if(entity_id, |_, subscribers| subscribers.is_empty());

        tracing::debug!(entity_id = %entity_id, "Subscriber unregistered");
    }

    /// Stable copy of the entity's current subscriber set, taken atomically
    /// with respect to concurrent subscribe/unsubscribe. Delivery iterates
    /// over this copy outside any registry lock.
    pub fn snapshot(&self, entity_id: &str) -> Vec<Subscriber> {
        self.inner
            .get(entity_id)
            .map(|subscribers| subscribers.clone())
            .unwrap_or_default()
    }

    /// Number of live subscribers for an entity.
    pub fn subscriber_count(&self, entity_id: &str) -> usize {
        self.inner.get(entity_id).map(|s| s.len()).unwrap_or(0)
    }

    /// Shutdown teardown: close every connection and clear the map.
    /// Returns how many connections were still registered.
    pub fn close_all(&self) -> usize {
        let mut closed = 0;
        for entry in self.inner.iter() {
            for subscriber in entry.value() {
                subscriber.close();
                closed += 1;
            }
        }
        self.inner.clear();
        closed
    }
}
