// crates/server/src/connections.rs
//! Live event connections per user.
//!
//! The map lock is held only to add, remove or snapshot entries. Writes
//! happen after it is released, each sink behind its own async mutex, so a
//! slow client delays broadcasts to its own user only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use serde::Serialize;
use tracing::{debug, warn};

use coach_observability::metrics::record_broadcast;

/// Write half of an event connection.
#[async_trait]
pub trait EventSink: Send + 'static {
    async fn send_text(&mut self, text: &str) -> Result<(), axum::Error>;
    async fn close(&mut self);
}

pub type WsSink = SplitSink<WebSocket, Message>;

#[async_trait]
impl EventSink for WsSink {
    async fn send_text(&mut self, text: &str) -> Result<(), axum::Error> {
        self.send(Message::Text(text.into())).await
    }

    async fn close(&mut self) {
        let _ = SinkExt::close(self).await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

struct Entry<S> {
    id: ConnectionId,
    sink: Arc<tokio::sync::Mutex<S>>,
}

pub struct ConnectionRegistry<S> {
    users: Mutex<HashMap<String, Vec<Entry<S>>>>,
    next_id: AtomicU64,
}

impl<S> Default for ConnectionRegistry<S> {
    fn default() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl<S: EventSink> ConnectionRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, user: &str, sink: S) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users.entry(user.to_string()).or_default().push(Entry {
            id,
            sink: Arc::new(tokio::sync::Mutex::new(sink)),
        });
        debug!(user, connection = id.0, "event connection added");
        id
    }

    /// Removes exactly `id`; no-op if it is already gone.
    pub fn remove(&self, user: &str, id: ConnectionId) -> bool {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = users.get_mut(user) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            users.remove(user);
        }
        removed
    }

    pub fn connection_count(&self, user: &str) -> usize {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        users.get(user).map_or(0, Vec::len)
    }

    /// Serialize `message` once and write it to every connection of `user`.
    ///
    /// Connections whose write fails are closed and removed. Never fails.
    pub async fn broadcast<M: Serialize + ?Sized>(&self, user: &str, message: &M) -> BroadcastReport {
        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                warn!(user, error = %e, "failed to serialize broadcast");
                return BroadcastReport::default();
            }
        };

        let targets: Vec<(ConnectionId, Arc<tokio::sync::Mutex<S>>)> = {
            let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
            users
                .get(user)
                .map(|entries| entries.iter().map(|e| (e.id, e.sink.clone())).collect())
                .unwrap_or_default()
        };

        if targets.is_empty() {
            debug!(user, "no event connections, dropping message");
            record_broadcast("dropped", 1);
            return BroadcastReport::default();
        }

        let mut report = BroadcastReport::default();
        for (id, sink) in targets {
            let mut sink = sink.lock().await;
            match sink.send_text(&text).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(user, connection = id.0, error = %e, "pruning event connection");
                    sink.close().await;
                    drop(sink);
                    self.remove(user, id);
                    report.pruned += 1;
                }
            }
        }

        record_broadcast("delivered", report.delivered as u64);
        record_broadcast("pruned", report.pruned as u64);
        report
    }
}
