//! Registry of connected WebSocket clients.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::observability::metrics;
use crate::ws::protocol::{Notification, ServerMessage};

/// Tracks live connections and fans messages out to them.
///
/// Each connection owns the receiving half of an unbounded channel; its socket
/// writer task ends when the sender is dropped here.
#[derive(Clone, Default)]
pub struct ConnectionManager {
    connections: Arc<DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection.
    pub fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.connections.insert(id, tx);

        let active = self.connections.len();
        metrics::record_ws_connections(active);
        tracing::info!(connection_id = %id, active, "WebSocket connected");
        (id, rx)
    }

    pub fn unregister(&self, id: Uuid) {
        if self.connections.remove(&id).is_some() {
            let active = self.connections.len();
            metrics::record_ws_connections(active);
            tracing::info!(connection_id = %id, active, "WebSocket disconnected");
        }
    }

    /// Send to one connection. Returns false if it is gone.
    pub fn send_to(&self, id: Uuid, message: ServerMessage) -> bool {
        match self.connections.get(&id) {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }

    /// Send to every connection, pruning closed ones. Returns the number of
    /// connections reached.
    pub fn broadcast(&self, message: ServerMessage) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        for entry in self.connections.iter() {
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                stale.push(*entry.key());
            }
        }

        for id in stale {
            self.unregister(id);
        }

        tracing::debug!(delivered, "Broadcast message");
        delivered
    }

    /// Broadcast a notification.
    pub fn notify(&self, notification: Notification) -> usize {
        tracing::info!(
            message_type = %notification.message_type,
            message = %notification.message,
            "Sending notification"
        );
        self.broadcast(ServerMessage::Notification { data: notification })
    }

    /// Drop every connection; their writer tasks close the sockets.
    pub fn close_all(&self) -> usize {
        let count = self.connections.len();
        self.connections.clear();
        metrics::record_ws_connections(0);
        count
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_everyone() {
        let manager = ConnectionManager::new();
        let (_a, mut rx_a) = manager.register();
        let (_b, mut rx_b) = manager.register();

        assert_eq!(manager.broadcast(ServerMessage::system("hello")), 2);
        assert_eq!(rx_a.recv().await, Some(ServerMessage::system("hello")));
        assert_eq!(rx_b.recv().await, Some(ServerMessage::system("hello")));
    }

    #[tokio::test]
    async fn test_broadcast_prunes_closed_connections() {
        let manager = ConnectionManager::new();
        let (_a, rx_a) = manager.register();
        let (b, mut rx_b) = manager.register();
        drop(rx_a);

        assert_eq!(manager.broadcast(ServerMessage::status(false)), 1);
        assert_eq!(manager.len(), 1);
        assert!(manager.send_to(b, ServerMessage::system("direct")));
        assert_eq!(rx_b.recv().await, Some(ServerMessage::status(false)));
        assert_eq!(rx_b.recv().await, Some(ServerMessage::system("direct")));
    }

    #[tokio::test]
    async fn test_close_all_ends_receivers() {
        let manager = ConnectionManager::new();
        let (id, mut rx) = manager.register();

        assert_eq!(manager.close_all(), 1);
        assert!(manager.is_empty());
        assert_eq!(rx.recv().await, None);
        assert!(!manager.send_to(id, ServerMessage::system("late")));
    }
}
