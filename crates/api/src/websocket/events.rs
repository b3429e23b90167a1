//! WebSocket event types and serialization
//!
//! Frames are JSON objects tagged by a kebab-case `type`; payload fields stay
//! snake_case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use trichat_shared::{
    Attachment, ChatMessage, ConversationId, MessageType, PresenceStatus, SenderRole, ShopId,
};

// =============================================================================
// Client-to-Server Events
// =============================================================================

/// Events sent from client to server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Join a conversation room
    JoinChat {
        shop_id: ShopId,
        conversation_id: ConversationId,
    },

    /// Customer or agent message
    SendMessage {
        shop_id: ShopId,
        conversation_id: ConversationId,
        content: String,
        #[serde(default)]
        message_type: MessageType,
    },

    /// Agent reply; broadcast as `agent-message`
    AgentResponse {
        shop_id: ShopId,
        conversation_id: ConversationId,
        content: String,
        #[serde(default)]
        message_type: MessageType,
    },

    TypingStart {
        shop_id: ShopId,
        conversation_id: ConversationId,
    },

    TypingStop {
        shop_id: ShopId,
        conversation_id: ConversationId,
    },

    /// An already-uploaded file shared into the conversation
    FileUpload {
        shop_id: ShopId,
        conversation_id: ConversationId,
        attachment: Attachment,
    },

    LeaveChat {
        shop_id: ShopId,
        conversation_id: ConversationId,
    },

    /// Heartbeat ping to keep connection alive
    Ping,
}

// =============================================================================
// Server-to-Client Events
// =============================================================================

/// Events sent from server to client
#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Connection acknowledged
    Connected {
        session_id: Uuid,
        shop_id: ShopId,
        role: SenderRole,
    },

    /// Join acknowledged
    JoinedChat {
        room: String,
        conversation_id: ConversationId,
    },

    /// A persisted message, fields inlined next to `type`
    NewMessage(ChatMessage),

    /// A persisted agent reply
    AgentMessage(ChatMessage),

    TypingIndicator {
        conversation_id: ConversationId,
        role: SenderRole,
        participant_id: String,
        is_typing: bool,
    },

    PresenceUpdate {
        conversation_id: ConversationId,
        role: SenderRole,
        participant_id: String,
        status: PresenceStatus,
    },

    /// Heartbeat response
    Pong,

    /// Error message
    Error { message: String },
}

impl ServerEvent {
    /// Wire name, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::JoinedChat { .. } => "joined-chat",
            ServerEvent::NewMessage(_) => "new-message",
            ServerEvent::AgentMessage(_) => "agent-message",
            ServerEvent::TypingIndicator { .. } => "typing-indicator",
            ServerEvent::PresenceUpdate { .. } => "presence-update",
            ServerEvent::Pong => "pong",
            ServerEvent::Error { .. } => "error",
        }
    }
}
