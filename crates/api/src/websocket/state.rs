//! Global WebSocket state management

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use trichat_shared::{Participant, ShopId};

use super::connection::Connection;
use super::room::{RoomKey, RoomManager};

/// WebSocket state shared across all connections
#[derive(Clone)]
pub struct WebSocketState {
    /// All active connections indexed by session_id
    pub connections: Arc<RwLock<HashMap<Uuid, Arc<Connection>>>>,

    pub rooms: Arc<RoomManager>,
}

impl WebSocketState {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(RwLock::new(HashMap::new())),
            rooms: Arc::new(RoomManager::new()),
        }
    }

    pub async fn add_connection(&self, conn: Connection) -> Arc<Connection> {
        let conn = Arc::new(conn);
        let mut connections = self.connections.write().await;
        connections.insert(conn.session_id, Arc::clone(&conn));

        tracing::info!(
            session_id = %conn.session_id,
            shop_id = %conn.shop_id,
            role = %conn.participant.role(),
            total_connections = connections.len(),
            "WebSocket connection added"
        );

        conn
    }

    /// Remove a connection and drop it from every room; returns the rooms
    /// it had been in
    pub async fn remove_connection(&self, session_id: &Uuid) -> Vec<RoomKey> {
        let mut connections = self.connections.write().await;
        let Some(conn) = connections.remove(session_id) else {
            return Vec::new();
        };
        let rooms = self.rooms.remove_connection(session_id).await;

        tracing::info!(
            session_id = %session_id,
            shop_id = %conn.shop_id,
            rooms_left = rooms.len(),
            remaining_connections = connections.len(),
            "WebSocket connection removed"
        );
        rooms
    }

    /// Whether the participant still has any open connection in the shop
    pub async fn is_participant_connected(
        &self,
        shop_id: &ShopId,
        participant: &Participant,
    ) -> bool {
        self.connections
            .read()
            .await
            .values()
            .any(|conn| &conn.shop_id == shop_id && &conn.participant == participant)
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn get_stats(&self) -> WebSocketStats {
        WebSocketStats {
            active_connections: self.connection_count().await,
            active_rooms: self.rooms.get_room_count().await,
        }
    }
}

impl Default for WebSocketState {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about WebSocket connections
#[derive(Debug, Clone, serde::Serialize)]
pub struct WebSocketStats {
    pub active_connections: usize,
    pub active_rooms: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_add_and_remove_connection() {
        let state = WebSocketState::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = state
            .add_connection(Connection::new(
                "shop1".into(),
                Participant::Customer("c1".into()),
                tx,
            ))
            .await;
        let key = RoomKey::new("shop1".into(), "conv1".into());
        state.rooms.join(&key, Arc::clone(&conn)).await;

        let stats = state.get_stats().await;
        assert_eq!(stats.active_connections, 1);
        assert_eq!(stats.active_rooms, 1);

        assert_eq!(state.remove_connection(&conn.session_id).await, vec![key]);
        assert_eq!(state.connection_count().await, 0);

        // Second removal is a no-op
        assert!(state.remove_connection(&conn.session_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_participant_connected_across_tabs() {
        let state = WebSocketState::new();
        let agent = Participant::Agent("a1".into());
        let (tx1, _rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        let first = state
            .add_connection(Connection::new("shop1".into(), agent.clone(), tx1))
            .await;
        let second = state
            .add_connection(Connection::new("shop1".into(), agent.clone(), tx2))
            .await;

        state.remove_connection(&first.session_id).await;
        assert!(state.is_participant_connected(&"shop1".into(), &agent).await);
        assert!(!state.is_participant_connected(&"shop2".into(), &agent).await);

        state.remove_connection(&second.session_id).await;
        assert!(!state.is_participant_connected(&"shop1".into(), &agent).await);
    }
}
