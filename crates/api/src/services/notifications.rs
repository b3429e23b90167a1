//! New-message notification fan-out
//!
//! Delivered from a detached task after a message has been broadcast, so a
//! slow or failing webhook never delays the chat itself.

use async_trait::async_trait;
use serde_json::json;

use trichat_shared::{ChatMessage, Conversation, TrichatError, TrichatResult};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_new_message(
        &self,
        conversation: &Conversation,
        message: &ChatMessage,
    ) -> TrichatResult<()>;
}

/// POSTs a JSON payload to a configured webhook
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl WebhookNotifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_new_message(
        &self,
        conversation: &Conversation,
        message: &ChatMessage,
    ) -> TrichatResult<()> {
        let Some(ref webhook_url) = self.webhook_url else {
            tracing::debug!("Notification webhook not configured, skipping");
            return Ok(());
        };

        let payload = json!({
            "event": "new_message",
            "shop_id": conversation.shop_id,
            "conversation": {
                "id": conversation.id,
                "customer_id": conversation.customer_id,
                "assigned_agent_id": conversation.assigned_agent_id,
                "status": conversation.status,
                "priority": conversation.priority,
                "unread_count": conversation.unread_count,
            },
            "message": message,
        });

        let response = self
            .client
            .post(webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TrichatError::Upstream(format!("webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = %status,
                body = %body,
                "Notification webhook rejected payload"
            );
            return Err(TrichatError::Upstream(format!(
                "webhook returned {}",
                status
            )));
        }

        tracing::debug!(
            conversation_id = %conversation.id,
            message_id = %message.id,
            "Delivered new-message notification"
        );
        Ok(())
    }
}

/// Only logs; used when no webhook is configured and in tests
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_new_message(
        &self,
        conversation: &Conversation,
        message: &ChatMessage,
    ) -> TrichatResult<()> {
        tracing::info!(
            shop_id = %conversation.shop_id,
            conversation_id = %conversation.id,
            message_id = %message.id,
            sender = %message.sender,
            "New chat message"
        );
        Ok(())
    }
}
