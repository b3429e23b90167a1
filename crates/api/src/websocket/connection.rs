//! WebSocket connection management
//!
//! Represents an authenticated WebSocket connection and the rooms it joined.

use std::collections::HashSet;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use trichat_shared::{Participant, ShopId};

use super::events::ServerEvent;
use super::room::RoomKey;

/// Represents an active WebSocket connection
#[derive(Debug)]
pub struct Connection {
    /// Unique session ID for this connection
    pub session_id: Uuid,

    /// Shop the token was issued for; joins to other shops are refused
    pub shop_id: ShopId,

    /// Authenticated customer or agent, recorded at connect so disconnect
    /// can mark the same participant offline
    pub participant: Participant,

    /// Channel to send events to this connection
    pub sender: mpsc::UnboundedSender<ServerEvent>,

    /// Rooms this connection joined
    rooms: RwLock<HashSet<RoomKey>>,
}

impl Connection {
    pub fn new(
        shop_id: ShopId,
        participant: Participant,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            shop_id,
            participant,
            sender,
            rooms: RwLock::new(HashSet::new()),
        }
    }

    /// Send an event to this connection
    ///
    /// Returns Ok(()) if sent successfully, Err if connection is closed
    #[allow(clippy::result_large_err)] // Error type is from tokio mpsc, containing the failed event
    pub fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<ServerEvent>> {
        self.sender.send(event)
    }

    /// Send an error event, ignoring a closed channel
    pub fn send_error(&self, message: impl Into<String>) {
        let _ = self.send(ServerEvent::Error {
            message: message.into(),
        });
    }

    /// Record a joined room. Returns `false` if already recorded.
    pub async fn track_room(&self, key: RoomKey) -> bool {
        self.rooms.write().await.insert(key)
    }

    pub async fn untrack_room(&self, key: &RoomKey) -> bool {
        self.rooms.write().await.remove(key)
    }

    pub async fn is_in_room(&self, key: &RoomKey) -> bool {
        self.rooms.read().await.contains(key)
    }

    pub async fn joined_rooms(&self) -> HashSet<RoomKey> {
        self.rooms.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_room_tracking() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let conn = Connection::new("shop1".into(), Participant::Customer("c1".into()), tx);
        let key = RoomKey::new("shop1".into(), "conv1".into());

        assert!(!conn.is_in_room(&key).await);
        assert!(conn.track_room(key.clone()).await);
        assert!(!conn.track_room(key.clone()).await);
        assert!(conn.is_in_room(&key).await);

        assert!(conn.untrack_room(&key).await);
        assert!(conn.joined_rooms().await.is_empty());
    }

    #[tokio::test]
    async fn test_send_error_after_close_does_not_panic() {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = Connection::new("shop1".into(), Participant::Agent("a1".into()), tx);
        drop(rx);
        conn.send_error("gone");
        assert!(conn.send(ServerEvent::Pong).is_err());
    }
}
