//! Chat relay
//!
//! Turns client events into persistence calls and room broadcasts. A message
//! is stored first and only then fanned out, so every recipient sees the
//! same server-assigned id and timestamp. Notifications and analytics run in
//! a detached task after the broadcast.

use std::sync::Arc;

use trichat_shared::{
    Attachment, ChatMessage, Conversation, ConversationId, MessageType, NewMessage, Participant,
    PresenceStatus, SenderRole, ShopId, TrichatError,
};

use super::connection::Connection;
use super::events::{ClientEvent, ServerEvent};
use super::room::RoomKey;
use super::state::WebSocketState;
use crate::services::{AnalyticsService, ChatService, Notifier};

#[derive(Clone)]
pub struct ChatRelay {
    ws_state: WebSocketState,
    chat: ChatService,
    analytics: AnalyticsService,
    notifier: Arc<dyn Notifier>,
}

impl ChatRelay {
    pub fn new(
        ws_state: WebSocketState,
        chat: ChatService,
        analytics: AnalyticsService,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ws_state,
            chat,
            analytics,
            notifier,
        }
    }

    pub fn ws_state(&self) -> &WebSocketState {
        &self.ws_state
    }

    /// Dispatch one client event. Callers await each event before reading
    /// the next, which keeps per-connection ordering.
    pub async fn handle(&self, conn: &Arc<Connection>, event: ClientEvent) {
        use ClientEvent::*;

        match event {
            JoinChat {
                shop_id,
                conversation_id,
            } => self.join(conn, shop_id, conversation_id).await,

            SendMessage {
                shop_id,
                conversation_id,
                content,
                message_type,
            } => {
                self.send_message(conn, shop_id, conversation_id, content, message_type, None)
                    .await
            }

            AgentResponse {
                shop_id,
                conversation_id,
                content,
                message_type,
            } => {
                self.agent_response(conn, shop_id, conversation_id, content, message_type)
                    .await
            }

            TypingStart {
                shop_id,
                conversation_id,
            } => self.typing(conn, shop_id, conversation_id, true).await,

            TypingStop {
                shop_id,
                conversation_id,
            } => self.typing(conn, shop_id, conversation_id, false).await,

            FileUpload {
                shop_id,
                conversation_id,
                attachment,
            } => self.file_upload(conn, shop_id, conversation_id, attachment).await,

            LeaveChat {
                shop_id,
                conversation_id,
            } => self.leave(conn, shop_id, conversation_id).await,

            Ping => {
                let _ = conn.send(ServerEvent::Pong);
            }
        }
    }

    /// Add the connection to the room for `(shop_id, conversation_id)`
    pub async fn join(&self, conn: &Arc<Connection>, shop_id: ShopId, conversation_id: ConversationId) {
        if shop_id != conn.shop_id {
            tracing::warn!(
                session_id = %conn.session_id,
                token_shop = %conn.shop_id,
                requested_shop = %shop_id,
                "Refused join to another shop"
            );
            conn.send_error("Access denied to conversation");
            return;
        }

        if let Err(e) = self
            .chat
            .get_conversation_for(&shop_id, &conversation_id, &conn.participant)
            .await
        {
            conn.send_error(join_error_message(&e));
            return;
        }

        let key = RoomKey::new(shop_id, conversation_id);
        let newly_joined = self.ws_state.rooms.join(&key, Arc::clone(conn)).await;
        conn.track_room(key.clone()).await;

        let _ = conn.send(ServerEvent::JoinedChat {
            room: key.to_string(),
            conversation_id: key.conversation_id.clone(),
        });

        if !newly_joined {
            return;
        }

        // Best-effort; a presence failure never fails the join
        if let Err(e) = self
            .chat
            .set_presence(&key.shop_id, &conn.participant, PresenceStatus::Online)
            .await
        {
            tracing::warn!(error = %e, session_id = %conn.session_id, "Failed to update presence on join");
        }

        self.ws_state
            .rooms
            .broadcast_except(
                &key,
                &conn.session_id,
                presence_event(&key, &conn.participant, PresenceStatus::Online),
            )
            .await;
    }

    pub async fn leave(&self, conn: &Arc<Connection>, shop_id: ShopId, conversation_id: ConversationId) {
        let key = RoomKey::new(shop_id, conversation_id);
        self.ws_state.rooms.leave(&key, &conn.session_id).await;
        conn.untrack_room(&key).await;
    }

    /// Persist and broadcast `new-message` to the room, sender included
    pub async fn send_message(
        &self,
        conn: &Arc<Connection>,
        shop_id: ShopId,
        conversation_id: ConversationId,
        content: String,
        message_type: MessageType,
        attachment: Option<Attachment>,
    ) {
        self.deliver(conn, shop_id, conversation_id, content, message_type, attachment, false)
            .await
    }

    /// Like `send_message` but agent-only, broadcast as `agent-message`
    pub async fn agent_response(
        &self,
        conn: &Arc<Connection>,
        shop_id: ShopId,
        conversation_id: ConversationId,
        content: String,
        message_type: MessageType,
    ) {
        if conn.participant.role() != SenderRole::Agent {
            conn.send_error("Only agents can send agent responses");
            return;
        }
        self.deliver(conn, shop_id, conversation_id, content, message_type, None, true)
            .await
    }

    /// Share an uploaded file; stored as a `file` message whose content is the URL
    pub async fn file_upload(
        &self,
        conn: &Arc<Connection>,
        shop_id: ShopId,
        conversation_id: ConversationId,
        attachment: Attachment,
    ) {
        if attachment.file_url.trim().is_empty() || attachment.file_name.trim().is_empty() {
            conn.send_error("File name and URL are required");
            return;
        }
        let content = attachment.file_url.clone();
        self.deliver(
            conn,
            shop_id,
            conversation_id,
            content,
            MessageType::File,
            Some(attachment),
            false,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn deliver(
        &self,
        conn: &Arc<Connection>,
        shop_id: ShopId,
        conversation_id: ConversationId,
        content: String,
        message_type: MessageType,
        attachment: Option<Attachment>,
        as_agent_message: bool,
    ) {
        if shop_id != conn.shop_id {
            conn.send_error("Access denied to conversation");
            return;
        }

        let conversation = match self
            .chat
            .get_conversation_for(&shop_id, &conversation_id, &conn.participant)
            .await
        {
            Ok(conversation) => conversation,
            Err(e) => {
                conn.send_error(send_error_message(&e));
                return;
            }
        };

        let message = NewMessage {
            shop_id,
            conversation_id,
            content,
            message_type,
            sender: conn.participant.clone(),
            attachment,
        };

        match self.chat.send_message(message).await {
            Ok(stored) => self.publish(conversation, stored, as_agent_message).await,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    session_id = %conn.session_id,
                    "Message not persisted"
                );
                conn.send_error(send_error_message(&e));
            }
        }
    }

    /// Broadcast a stored message to its room and kick off side effects.
    /// Also used by the REST message endpoint.
    pub async fn publish(&self, conversation: Conversation, message: ChatMessage, as_agent_message: bool) {
        let key = RoomKey::new(message.shop_id.clone(), message.conversation_id.clone());
        let event = if as_agent_message {
            ServerEvent::AgentMessage(message.clone())
        } else {
            ServerEvent::NewMessage(message.clone())
        };
        self.ws_state.rooms.broadcast(&key, event).await;

        let analytics = self.analytics.clone();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = analytics
                .record_message(&message.shop_id, message.sender, message.timestamp)
                .await
            {
                tracing::warn!(error = %e, message_id = %message.id, "Failed to record message analytics");
            }
            if let Err(e) = notifier.notify_new_message(&conversation, &message).await {
                tracing::warn!(error = %e, message_id = %message.id, "Failed to send message notification");
            }
        });
    }

    /// Relay a typing indicator to everyone in the room but the typist
    pub async fn typing(
        &self,
        conn: &Arc<Connection>,
        shop_id: ShopId,
        conversation_id: ConversationId,
        is_typing: bool,
    ) {
        if shop_id != conn.shop_id {
            conn.send_error("Access denied to conversation");
            return;
        }

        let key = RoomKey::new(shop_id, conversation_id);
        if !conn.is_in_room(&key).await {
            conn.send_error("Join the conversation before sending typing updates");
            return;
        }

        self.ws_state
            .rooms
            .broadcast_except(
                &key,
                &conn.session_id,
                ServerEvent::TypingIndicator {
                    conversation_id: key.conversation_id.clone(),
                    role: conn.participant.role(),
                    participant_id: conn.participant.id().to_string(),
                    is_typing,
                },
            )
            .await;
    }

    /// Drop the connection from every room, then tell the rooms it went
    /// offline unless the participant still has another connection open
    pub async fn disconnect(&self, conn: &Arc<Connection>) {
        let rooms = self.ws_state.remove_connection(&conn.session_id).await;
        if rooms.is_empty() {
            return;
        }
        if self
            .ws_state
            .is_participant_connected(&conn.shop_id, &conn.participant)
            .await
        {
            tracing::debug!(session_id = %conn.session_id, "Participant still connected elsewhere");
            return;
        }

        if let Err(e) = self
            .chat
            .set_presence(&conn.shop_id, &conn.participant, PresenceStatus::Offline)
            .await
        {
            tracing::warn!(error = %e, session_id = %conn.session_id, "Failed to update presence on disconnect");
        }

        for key in rooms {
            self.ws_state
                .rooms
                .broadcast(
                    &key,
                    presence_event(&key, &conn.participant, PresenceStatus::Offline),
                )
                .await;
        }
    }
}

fn presence_event(key: &RoomKey, participant: &Participant, status: PresenceStatus) -> ServerEvent {
    ServerEvent::PresenceUpdate {
        conversation_id: key.conversation_id.clone(),
        role: participant.role(),
        participant_id: participant.id().to_string(),
        status,
    }
}

fn join_error_message(e: &TrichatError) -> String {
    match e {
        TrichatError::NotFound(_) => "Conversation not found".to_string(),
        TrichatError::Unauthorized(_) => "Access denied to conversation".to_string(),
        _ => "Failed to join conversation".to_string(),
    }
}

fn send_error_message(e: &TrichatError) -> String {
    match e {
        TrichatError::Validation(msg) => msg.clone(),
        TrichatError::NotFound(_) => "Conversation not found".to_string(),
        TrichatError::Unauthorized(_) => "Access denied to conversation".to_string(),
        _ => "Failed to send message".to_string(),
    }
}
