//! In-memory registry of connected observers.
//!
//! Each WebSocket connection registers a bounded outbound queue and a set
//! of subscribed project names. Publishing never waits: a full queue drops
//! the frame for that observer and a closed queue removes the connection.
//! Nothing here is persisted; a reconnecting client resubscribes.

use crate::protocol::WireMessage;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Outbound frames buffered per connection before frames are dropped.
pub const QUEUE_DEPTH: usize = 64;

struct Connection {
    tx: mpsc::Sender<WireMessage>,
    subscriptions: HashSet<String>,
    last_seen: Instant,
}

#[derive(Default)]
pub struct Hub {
    connections: Mutex<HashMap<String, Connection>>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Connection>> {
        self.connections.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a connection; returns its id and the queue to drain.
    pub fn connect(&self) -> (String, mpsc::Receiver<WireMessage>) {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        self.lock().insert(
            id.clone(),
            Connection {
                tx,
                subscriptions: HashSet::new(),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(connection = %id, "observer connected");
        (id, rx)
    }

    /// Drop a connection and all its subscriptions.
    pub fn disconnect(&self, id: &str) {
        if self.lock().remove(id).is_some() {
            tracing::debug!(connection = %id, "observer disconnected");
        }
    }

    /// Returns false when the connection is unknown.
    pub fn subscribe(&self, id: &str, project: &str) -> bool {
        match self.lock().get_mut(id) {
            Some(conn) => {
                conn.subscriptions.insert(project.to_string());
                true
            }
            None => false,
        }
    }

    pub fn unsubscribe(&self, id: &str, project: &str) -> bool {
        match self.lock().get_mut(id) {
            Some(conn) => conn.subscriptions.remove(project),
            None => false,
        }
    }

    /// Record activity from the client.
    pub fn touch(&self, id: &str) {
        if let Some(conn) = self.lock().get_mut(id) {
            conn.last_seen = Instant::now();
        }
    }

    /// Deliver to one connection.
    pub fn send_to(&self, id: &str, msg: WireMessage) -> bool {
        let mut conns = self.lock();
        let Some(conn) = conns.get(id) else {
            return false;
        };
        match conn.tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(connection = %id, "outbound queue full; frame dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                conns.remove(id);
                false
            }
        }
    }

    /// Fan `msg` out to every subscriber of `project`. Returns the number of
    /// observers the frame was queued for.
    pub fn publish(&self, project: &str, msg: WireMessage) -> usize {
        let mut conns = self.lock();
        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, conn) in conns.iter() {
            if !conn.subscriptions.contains(project) {
                continue;
            }
            match conn.tx.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(connection = %id, project, "outbound queue full; frame dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => closed.push(id.clone()),
            }
        }
        for id in closed {
            conns.remove(&id);
        }
        delivered
    }

    /// Queue a ping for every connection.
    pub fn ping_all(&self) {
        let ids: Vec<String> = self.lock().keys().cloned().collect();
        for id in ids {
            self.send_to(&id, WireMessage::ping().with_session(id.clone()));
        }
    }

    /// Disconnect every observer silent for longer than `timeout`.
    pub fn reap_idle(&self, timeout: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut conns = self.lock();
        let idle: Vec<String> = conns
            .iter()
            .filter(|(_, c)| now.duration_since(c.last_seen) > timeout)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &idle {
            conns.remove(id);
        }
        idle
    }

    pub fn connection_count(&self) -> usize {
        self.lock().len()
    }

    pub fn subscriber_count(&self, project: &str) -> usize {
        self.lock()
            .values()
            .filter(|c| c.subscriptions.contains(project))
            .count()
    }

    /// Every project with at least one subscriber, sorted.
    pub fn subscribed_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .values()
            .flat_map(|c| c.subscriptions.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }
}
