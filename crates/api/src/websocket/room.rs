//! Chat room management for pub/sub
//!
//! One room per (shop, conversation) pair.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use trichat_shared::{ConversationId, ShopId};

use super::connection::Connection;
use super::events::ServerEvent;

/// Identity of a chat room
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomKey {
    pub shop_id: ShopId,
    pub conversation_id: ConversationId,
}

impl RoomKey {
    pub fn new(shop_id: ShopId, conversation_id: ConversationId) -> Self {
        Self {
            shop_id,
            conversation_id,
        }
    }
}

impl fmt::Display for RoomKey {
    /// `{len}:{shop}:{conversation}`; the length prefix keeps ids containing
    /// `:` from colliding
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.shop_id.as_str().len(),
            self.shop_id,
            self.conversation_id
        )
    }
}

/// Manages chat rooms for broadcasting events
pub struct RoomManager {
    rooms: Arc<RwLock<HashMap<RoomKey, Vec<Arc<Connection>>>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a connection to a room. Returns `false` if it was already a member.
    pub async fn join(&self, key: &RoomKey, conn: Arc<Connection>) -> bool {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(key.clone()).or_default();
        if members.iter().any(|c| c.session_id == conn.session_id) {
            return false;
        }
        members.push(Arc::clone(&conn));

        tracing::debug!(
            room = %key,
            session_id = %conn.session_id,
            room_size = members.len(),
            "Connection joined chat room"
        );
        true
    }

    /// Remove a connection from a room. Returns `false` if it was not a member.
    pub async fn leave(&self, key: &RoomKey, session_id: &Uuid) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(conns) = rooms.get_mut(key) else {
            return false;
        };

        let before = conns.len();
        conns.retain(|c| c.session_id != *session_id);
        let removed = conns.len() < before;

        // Clean up empty rooms
        if conns.is_empty() {
            rooms.remove(key);
            tracing::debug!(room = %key, "Removed empty chat room");
        }
        removed
    }

    /// Send an event to every member of a room
    pub async fn broadcast(&self, key: &RoomKey, event: ServerEvent) -> usize {
        self.broadcast_filtered(key, event, None).await
    }

    /// Send an event to every member except `session_id`
    pub async fn broadcast_except(&self, key: &RoomKey, session_id: &Uuid, event: ServerEvent) -> usize {
        self.broadcast_filtered(key, event, Some(session_id)).await
    }

    /// Closed connections are skipped; they are removed on disconnect
    async fn broadcast_filtered(
        &self,
        key: &RoomKey,
        event: ServerEvent,
        exclude: Option<&Uuid>,
    ) -> usize {
        let rooms = self.rooms.read().await;
        let Some(conns) = rooms.get(key) else {
            tracing::debug!(room = %key, event = event.name(), "No subscribers in room");
            return 0;
        };

        let mut success_count = 0;
        let mut failed_count = 0;
        for conn in conns.iter().filter(|c| Some(&c.session_id) != exclude) {
            match conn.send(event.clone()) {
                Ok(()) => success_count += 1,
                Err(_) => {
                    failed_count += 1;
                    tracing::warn!(
                        session_id = %conn.session_id,
                        "Failed to send event to connection (likely closed)"
                    );
                }
            }
        }

        tracing::debug!(
            room = %key,
            event = event.name(),
            recipients = success_count,
            failed = failed_count,
            "Broadcast event to chat room"
        );
        success_count
    }

    /// Remove a connection from all rooms, returning the rooms it was in
    pub async fn remove_connection(&self, session_id: &Uuid) -> Vec<RoomKey> {
        let mut rooms = self.rooms.write().await;
        let mut removed_from = Vec::new();

        for (key, conns) in rooms.iter_mut() {
            let before_len = conns.len();
            conns.retain(|c| c.session_id != *session_id);
            if conns.len() < before_len {
                removed_from.push(key.clone());
            }
        }

        rooms.retain(|_, conns| !conns.is_empty());

        if !removed_from.is_empty() {
            tracing::debug!(
                session_id = %session_id,
                room_count = removed_from.len(),
                "Removed connection from rooms"
            );
        }
        removed_from
    }

    pub async fn get_room_size(&self, key: &RoomKey) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(key).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn get_room_count(&self) -> usize {
        let rooms = self.rooms.read().await;
        rooms.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::new()
    }
}
