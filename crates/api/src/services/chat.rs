//! Conversations and messages

use std::sync::Arc;
use uuid::Uuid;

use trichat_shared::{
    ChatMessage, Conversation, ConversationFilter, ConversationId, ConversationPatch, CustomerId,
    MessageType, NewMessage, Participant, PresenceStatus, ShopId, TrichatError, TrichatResult,
};

use crate::store::ConversationStore;

/// Longest accepted message body, in characters
pub const MAX_MESSAGE_LENGTH: usize = 5000;

pub const DEFAULT_MESSAGE_LIMIT: i64 = 100;
pub const MAX_MESSAGE_LIMIT: i64 = 500;

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ConversationStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    pub async fn ping(&self) -> TrichatResult<()> {
        self.store.ping().await
    }

    pub async fn list_conversations(
        &self,
        shop_id: &ShopId,
        filter: &ConversationFilter,
    ) -> TrichatResult<Vec<Conversation>> {
        self.store.list_conversations(shop_id, filter).await
    }

    pub async fn get_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
    ) -> TrichatResult<Conversation> {
        self.store
            .get_conversation(shop_id, id)
            .await?
            .ok_or_else(|| TrichatError::not_found(format!("conversation {}", id)))
    }

    /// Conversation lookup that also checks a customer only reaches their own
    pub async fn get_conversation_for(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        participant: &Participant,
    ) -> TrichatResult<Conversation> {
        let conversation = self.get_conversation(shop_id, id).await?;
        if let Participant::Customer(customer_id) = participant {
            if &conversation.customer_id != customer_id {
                return Err(TrichatError::Unauthorized(format!(
                    "conversation {} belongs to another customer",
                    id
                )));
            }
        }
        Ok(conversation)
    }

    pub async fn create_conversation(
        &self,
        shop_id: &ShopId,
        customer_id: CustomerId,
    ) -> TrichatResult<Conversation> {
        if customer_id.as_str().trim().is_empty() {
            return Err(TrichatError::validation("customer_id is required"));
        }

        let conversation = Conversation::new(
            ConversationId::new(Uuid::new_v4().to_string()),
            shop_id.clone(),
            customer_id,
        );
        self.store.create_conversation(&conversation).await?;

        tracing::info!(
            shop_id = %shop_id,
            conversation_id = %conversation.id,
            customer_id = %conversation.customer_id,
            "Conversation created"
        );
        Ok(conversation)
    }

    pub async fn update_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        patch: &ConversationPatch,
    ) -> TrichatResult<Conversation> {
        if patch.is_empty() {
            return Err(TrichatError::validation("No fields to update"));
        }

        self.store
            .update_conversation(shop_id, id, patch)
            .await?
            .ok_or_else(|| TrichatError::not_found(format!("conversation {}", id)))
    }

    /// Latest messages, oldest first
    pub async fn list_messages(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        limit: Option<i64>,
    ) -> TrichatResult<Vec<ChatMessage>> {
        // 404 for unknown conversations instead of an empty page
        self.get_conversation(shop_id, conversation_id).await?;

        let limit = limit
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
            .clamp(1, MAX_MESSAGE_LIMIT);
        self.store
            .list_messages(shop_id, conversation_id, limit)
            .await
    }

    /// Persist a message and bump the conversation counters.
    ///
    /// The counter update is a second write; if it fails the message stays
    /// stored and the error is only logged.
    pub async fn send_message(&self, message: NewMessage) -> TrichatResult<ChatMessage> {
        validate_content(&message.content)?;
        if message.message_type == MessageType::File && message.attachment.is_none() {
            return Err(TrichatError::validation(
                "File messages require an attachment",
            ));
        }

        let stored = self.store.insert_message(&message).await?;

        if let Err(e) = self
            .store
            .record_message_activity(
                &stored.shop_id,
                &stored.conversation_id,
                stored.sender,
                stored.timestamp,
            )
            .await
        {
            tracing::warn!(
                error = %e,
                conversation_id = %stored.conversation_id,
                message_id = %stored.id,
                "Failed to update conversation counters"
            );
        }

        tracing::debug!(
            shop_id = %stored.shop_id,
            conversation_id = %stored.conversation_id,
            message_id = %stored.id,
            sender = %stored.sender,
            "Message stored"
        );
        Ok(stored)
    }

    pub async fn mark_read(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
    ) -> TrichatResult<()> {
        if !self.store.reset_unread(shop_id, conversation_id).await? {
            return Err(TrichatError::not_found(format!(
                "conversation {}",
                conversation_id
            )));
        }
        Ok(())
    }

    pub async fn set_presence(
        &self,
        shop_id: &ShopId,
        participant: &Participant,
        status: PresenceStatus,
    ) -> TrichatResult<()> {
        self.store.set_presence(shop_id, participant, status).await
    }
}

fn validate_content(content: &str) -> TrichatResult<()> {
    if content.trim().is_empty() {
        return Err(TrichatError::validation("Message content cannot be empty"));
    }
    if content.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(TrichatError::validation(format!(
            "Message content exceeds {} characters",
            MAX_MESSAGE_LENGTH
        )));
    }
    Ok(())
}
