use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use tracing::trace;

use dearly_types::events::GatewayEvent;

/// An event addressed to one user.
#[derive(Debug, Clone)]
pub struct ScopedEvent {
    pub user_id: String,
    pub event: GatewayEvent,
}

/// Application-wide pub/sub for game and notification changes.
///
/// Handlers publish events for a user; every gateway connection of that
/// user receives them, nobody else does.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    /// Broadcast channel for gateway events; connections filter by user id
    broadcast_tx: broadcast::Sender<ScopedEvent>,

    /// Open gateway connections per user
    connections: RwLock<HashMap<String, usize>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(DispatcherInner {
                broadcast_tx,
                connections: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to all scoped events. Returns a broadcast receiver.
    pub fn subscribe(&self) -> broadcast::Receiver<ScopedEvent> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Publish an event to every connection of `user_id`.
    pub fn publish(&self, user_id: &str, event: GatewayEvent) {
        trace!("Publishing {:?} to {}", event, user_id);
        let _ = self.inner.broadcast_tx.send(ScopedEvent {
            user_id: user_id.to_string(),
            event,
        });
    }

    pub async fn connection_opened(&self, user_id: &str) {
        *self
            .inner
            .connections
            .write()
            .await
            .entry(user_id.to_string())
            .or_default() += 1;
    }

    pub async fn connection_closed(&self, user_id: &str) {
        let mut connections = self.inner.connections.write().await;
        if let Some(count) = connections.get_mut(user_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                connections.remove(user_id);
            }
        }
    }

    pub async fn is_connected(&self, user_id: &str) -> bool {
        self.inner.connections.read().await.contains_key(user_id)
    }

    /// Total number of open gateway connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_scoped_events() {
        let dispatcher = Dispatcher::new();
        let mut rx = dispatcher.subscribe();

        dispatcher.publish(
            "u1",
            GatewayEvent::GamesChanged {
                owner_id: "u1".into(),
            },
        );

        let scoped = rx.recv().await.unwrap();
        assert_eq!(scoped.user_id, "u1");
        assert_eq!(
            scoped.event,
            GatewayEvent::GamesChanged {
                owner_id: "u1".into()
            }
        );
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_fine() {
        let dispatcher = Dispatcher::new();
        dispatcher.publish("nobody", GatewayEvent::NotificationsChanged { unread_count: 0 });
    }

    #[tokio::test]
    async fn tracks_connections_per_user() {
        let dispatcher = Dispatcher::new();
        dispatcher.connection_opened("u1").await;
        dispatcher.connection_opened("u1").await;
        dispatcher.connection_opened("u2").await;
        assert_eq!(dispatcher.connection_count().await, 3);

        dispatcher.connection_closed("u1").await;
        assert!(dispatcher.is_connected("u1").await);
        dispatcher.connection_closed("u1").await;
        assert!(!dispatcher.is_connected("u1").await);
        dispatcher.connection_closed("u1").await;
        assert_eq!(dispatcher.connection_count().await, 1);
    }
}
