//! In-process store
//!
//! Backs the server when no `DATABASE_URL` is configured and doubles as the
//! store for tests. [`MemoryStore::set_unavailable`] simulates a database
//! outage: every call fails with a database error until it is cleared.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use time::{Date, OffsetDateTime};
use tokio::sync::RwLock;
use uuid::Uuid;

use trichat_shared::{
    BulkAction, BulkOperation, ChatMessage, ChatSettings, Conversation, ConversationFilter,
    ConversationId, ConversationPatch, ConversationStats, CsatResponse, CustomerId,
    DailyMessageCount, NewMessage, Participant, PresenceStatus, SenderRole, ShopId, TrichatError,
    TrichatResult, WidgetInstallation,
};

use super::{AnalyticsStore, BulkOperationStore, ConversationStore, CsatStore, SettingsStore};

#[derive(Default)]
struct Inner {
    conversations: HashMap<ConversationId, Conversation>,
    messages: Vec<ChatMessage>,
    presence: HashMap<(ShopId, Participant), PresenceStatus>,
    operations: HashMap<Uuid, BulkOperation>,
    settings: HashMap<ShopId, ChatSettings>,
    installations: HashMap<ShopId, WidgetInstallation>,
    csat: Vec<CsatResponse>,
    daily: BTreeMap<(ShopId, Date), DailyMessageCount>,
}

impl Inner {
    fn conversation_mut(
        &mut self,
        shop_id: &ShopId,
        id: &ConversationId,
    ) -> Option<&mut Conversation> {
        self.conversations
            .get_mut(id)
            .filter(|c| &c.shop_id == shop_id)
    }
}

/// Store that keeps everything in memory
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail (or succeed again) to simulate an outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Last presence recorded for a participant
    pub async fn presence_of(
        &self,
        shop_id: &ShopId,
        participant: &Participant,
    ) -> Option<PresenceStatus> {
        let inner = self.inner.read().await;
        inner
            .presence
            .get(&(shop_id.clone(), participant.clone()))
            .copied()
    }

    fn check(&self) -> TrichatResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TrichatError::Database("store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn ping(&self) -> TrichatResult<()> {
        self.check()
    }

    async fn create_conversation(&self, conversation: &Conversation) -> TrichatResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        inner
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }

    async fn get_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
    ) -> TrichatResult<Option<Conversation>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .conversations
            .get(id)
            .filter(|c| &c.shop_id == shop_id)
            .cloned())
    }

    async fn list_conversations(
        &self,
        shop_id: &ShopId,
        filter: &ConversationFilter,
    ) -> TrichatResult<Vec<Conversation>> {
        self.check()?;
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| &c.shop_id == shop_id && filter.matches(c))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| {
            let a_at = a.last_message_at.unwrap_or(a.created_at);
            let b_at = b.last_message_at.unwrap_or(b.created_at);
            b_at.cmp(&a_at)
        });
        conversations.truncate(filter.effective_limit() as usize);
        Ok(conversations)
    }

    async fn conversation_stats(&self, shop_id: &ShopId) -> TrichatResult<ConversationStats> {
        self.check()?;
        let inner = self.inner.read().await;
        let mut stats = ConversationStats::default();
        for conv in inner.conversations.values().filter(|c| &c.shop_id == shop_id) {
            let unassigned = i64::from(conv.assigned_agent_id.is_none());
            stats.add(conv.status, 1, unassigned);
        }
        Ok(stats)
    }

    async fn update_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        patch: &ConversationPatch,
    ) -> TrichatResult<Option<Conversation>> {
        self.check()?;
        let mut inner = self.inner.write().await;
        Ok(inner.conversation_mut(shop_id, id).map(|conv| {
            patch.apply(conv);
            conv.updated_at = OffsetDateTime::now_utc();
            conv.clone()
        }))
    }

    async fn insert_message(&self, message: &NewMessage) -> TrichatResult<ChatMessage> {
        self.check()?;
        let mut inner = self.inner.write().await;
        if inner
            .conversation_mut(&message.shop_id, &message.conversation_id)
            .is_none()
        {
            return Err(TrichatError::not_found(format!(
                "conversation {}",
                message.conversation_id
            )));
        }

        let stored = ChatMessage {
            id: Uuid::new_v4(),
            shop_id: message.shop_id.clone(),
            conversation_id: message.conversation_id.clone(),
            content: message.content.clone(),
            message_type: message.message_type,
            sender: message.sender.role(),
            customer_id: message.sender.customer_id().cloned(),
            agent_id: message.sender.agent_id().cloned(),
            attachment: message.attachment.clone(),
            timestamp: OffsetDateTime::now_utc(),
        };
        inner.messages.push(stored.clone());
        Ok(stored)
    }

    async fn list_messages(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        limit: i64,
    ) -> TrichatResult<Vec<ChatMessage>> {
        self.check()?;
        let inner = self.inner.read().await;
        let mut messages: Vec<ChatMessage> = inner
            .messages
            .iter()
            .filter(|m| &m.shop_id == shop_id && &m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.timestamp);
        let skip = messages.len().saturating_sub(limit.max(0) as usize);
        Ok(messages.split_off(skip))
    }

    async fn record_message_activity(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        sender: SenderRole,
        at: OffsetDateTime,
    ) -> TrichatResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        if let Some(conv) = inner.conversation_mut(shop_id, conversation_id) {
            conv.message_count += 1;
            if sender == SenderRole::Customer {
                conv.unread_count += 1;
            }
            conv.last_message_at = Some(at);
            conv.updated_at = at;
        }
        Ok(())
    }

    async fn reset_unread(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
    ) -> TrichatResult<bool> {
        self.check()?;
        let mut inner = self.inner.write().await;
        Ok(match inner.conversation_mut(shop_id, conversation_id) {
            Some(conv) => {
                conv.unread_count = 0;
                true
            }
            None => false,
        })
    }

    async fn set_presence(
        &self,
        shop_id: &ShopId,
        participant: &Participant,
        status: PresenceStatus,
    ) -> TrichatResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        inner
            .presence
            .insert((shop_id.clone(), participant.clone()), status);
        Ok(())
    }

    async fn apply_bulk_action(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        action: &BulkAction,
    ) -> TrichatResult<bool> {
        self.check()?;
        let mut inner = self.inner.write().await;
        Ok(match inner.conversation_mut(shop_id, id) {
            Some(conv) => {
                action.apply(conv);
                conv.updated_at = OffsetDateTime::now_utc();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl BulkOperationStore for MemoryStore {
    async fn insert_operation(&self, op: &BulkOperation) -> TrichatResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        inner.operations.insert(op.id, op.clone());
        Ok(())
    }

    async fn update_operation(&self, op: &BulkOperation) -> TrichatResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        match inner.operations.get_mut(&op.id) {
            Some(existing) => {
                *existing = op.clone();
                Ok(())
            }
            None => Err(TrichatError::not_found(format!("bulk operation {}", op.id))),
        }
    }

    async fn get_operation(
        &self,
        shop_id: &ShopId,
        id: Uuid,
    ) -> TrichatResult<Option<BulkOperation>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .operations
            .get(&id)
            .filter(|op| &op.shop_id == shop_id)
            .cloned())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get_settings(&self, shop_id: &ShopId) -> TrichatResult<Option<ChatSettings>> {
        self.check()?;
        Ok(self.inner.read().await.settings.get(shop_id).cloned())
    }

    async fn upsert_settings(&self, shop_id: &ShopId, settings: &ChatSettings) -> TrichatResult<()> {
        self.check()?;
        self.inner
            .write()
            .await
            .settings
            .insert(shop_id.clone(), settings.clone());
        Ok(())
    }

    async fn get_installation(&self, shop_id: &ShopId) -> TrichatResult<Option<WidgetInstallation>> {
        self.check()?;
        Ok(self.inner.read().await.installations.get(shop_id).cloned())
    }

    async fn upsert_installation(&self, installation: &WidgetInstallation) -> TrichatResult<()> {
        self.check()?;
        self.inner
            .write()
            .await
            .installations
            .insert(installation.shop_id.clone(), installation.clone());
        Ok(())
    }
}

#[async_trait]
impl CsatStore for MemoryStore {
    async fn insert_csat_response(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        customer_id: Option<&CustomerId>,
        rating: i16,
        comment: Option<&str>,
    ) -> TrichatResult<CsatResponse> {
        self.check()?;
        let response = CsatResponse {
            id: Uuid::new_v4(),
            shop_id: shop_id.clone(),
            conversation_id: conversation_id.clone(),
            customer_id: customer_id.cloned(),
            rating,
            comment: comment.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        self.inner.write().await.csat.push(response.clone());
        Ok(response)
    }

    async fn list_csat_responses(
        &self,
        shop_id: &ShopId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> TrichatResult<Vec<CsatResponse>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .csat
            .iter()
            .filter(|r| &r.shop_id == shop_id && r.created_at >= from && r.created_at < to)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn increment_message_count(
        &self,
        shop_id: &ShopId,
        day: Date,
        sender: SenderRole,
    ) -> TrichatResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;
        let entry = inner
            .daily
            .entry((shop_id.clone(), day))
            .or_insert(DailyMessageCount {
                day,
                total: 0,
                customer: 0,
                agent: 0,
            });
        entry.total += 1;
        match sender {
            SenderRole::Customer => entry.customer += 1,
            SenderRole::Agent => entry.agent += 1,
        }
        Ok(())
    }

    async fn daily_message_counts(
        &self,
        shop_id: &ShopId,
        from: Date,
        to: Date,
    ) -> TrichatResult<Vec<DailyMessageCount>> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .daily
            .range((shop_id.clone(), from)..=(shop_id.clone(), to))
            .map(|(_, count)| *count)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trichat_shared::MessageType;

    async fn seeded() -> (MemoryStore, ShopId, ConversationId) {
        let store = MemoryStore::new();
        let shop: ShopId = "shop1".into();
        let conv: ConversationId = "c1".into();
        store
            .create_conversation(&Conversation::new(conv.clone(), shop.clone(), "cust1".into()))
            .await
            .unwrap();
        (store, shop, conv)
    }

    #[tokio::test]
    async fn test_message_requires_conversation_in_shop() {
        let (store, _shop, conv) = seeded().await;
        let result = store
            .insert_message(&NewMessage {
                shop_id: "other-shop".into(),
                conversation_id: conv,
                content: "hi".to_string(),
                message_type: MessageType::Text,
                sender: Participant::Customer("cust1".into()),
                attachment: None,
            })
            .await;
        assert!(matches!(result, Err(TrichatError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_messages_keeps_latest() {
        let (store, shop, conv) = seeded().await;
        for i in 0..5 {
            store
                .insert_message(&NewMessage {
                    shop_id: shop.clone(),
                    conversation_id: conv.clone(),
                    content: format!("m{}", i),
                    message_type: MessageType::Text,
                    sender: Participant::Customer("cust1".into()),
                    attachment: None,
                })
                .await
                .unwrap();
        }
        let messages = store.list_messages(&shop, &conv, 2).await.unwrap();
        let contents: Vec<_> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_call() {
        let (store, shop, conv) = seeded().await;
        store.set_unavailable(true);
        assert!(matches!(
            store.get_conversation(&shop, &conv).await,
            Err(TrichatError::Database(_))
        ));
        store.set_unavailable(false);
        assert!(store.get_conversation(&shop, &conv).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_daily_counts_range() {
        let store = MemoryStore::new();
        let shop: ShopId = "shop1".into();
        let day = time::macros::date!(2025 - 03 - 10);
        store
            .increment_message_count(&shop, day, SenderRole::Customer)
            .await
            .unwrap();
        store
            .increment_message_count(&shop, day, SenderRole::Agent)
            .await
            .unwrap();
        store
            .increment_message_count(&"shop2".into(), day, SenderRole::Agent)
            .await
            .unwrap();

        let counts = store
            .daily_message_counts(&shop, day, day)
            .await
            .unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].total, 2);
        assert_eq!(counts[0].customer, 1);
        assert_eq!(counts[0].agent, 1);
    }

    #[tokio::test]
    async fn test_conversation_stats_counts_unassigned_open_only() {
        let store = MemoryStore::new();
        let shop: ShopId = "shop1".into();

        let open = Conversation::new("c1".into(), shop.clone(), "a".into());
        let mut assigned = Conversation::new("c2".into(), shop.clone(), "b".into());
        assigned.assigned_agent_id = Some("agent1".into());
        let mut closed = Conversation::new("c3".into(), shop.clone(), "c".into());
        closed.status = trichat_shared::ConversationStatus::Closed;
        let other_shop = Conversation::new("c4".into(), "shop2".into(), "d".into());

        for conv in [&open, &assigned, &closed, &other_shop] {
            store.create_conversation(conv).await.unwrap();
        }

        let stats = store.conversation_stats(&shop).await.unwrap();
        assert_eq!(stats.open, 2);
        assert_eq!(stats.closed, 1);
        assert_eq!(stats.unassigned, 1);
        assert_eq!(stats.total(), 3);
    }
}
