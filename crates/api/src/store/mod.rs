//! Persistence ports
//!
//! Services depend on these traits rather than on a concrete database so
//! they can be constructed once at start-up with either [`PgStore`] or
//! [`MemoryStore`] and handed to handlers through `AppState`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use trichat_shared::{
    BulkAction, BulkOperation, ChatMessage, ChatSettings, Conversation, ConversationFilter,
    ConversationId, ConversationPatch, ConversationStats, CsatResponse, CustomerId,
    DailyMessageCount, NewMessage, Participant, PresenceStatus, SenderRole, ShopId, TrichatResult,
    WidgetInstallation,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Conversations, messages and presence
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Cheap connectivity check used by readiness probes
    async fn ping(&self) -> TrichatResult<()>;

    async fn create_conversation(&self, conversation: &Conversation) -> TrichatResult<()>;

    async fn get_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
    ) -> TrichatResult<Option<Conversation>>;

    /// Newest activity first
    async fn list_conversations(
        &self,
        shop_id: &ShopId,
        filter: &ConversationFilter,
    ) -> TrichatResult<Vec<Conversation>>;

    /// Counts over every conversation in the shop, not just a page
    async fn conversation_stats(&self, shop_id: &ShopId) -> TrichatResult<ConversationStats>;

    /// Returns `None` when the conversation does not exist in the shop
    async fn update_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        patch: &ConversationPatch,
    ) -> TrichatResult<Option<Conversation>>;

    /// Persist a message, assigning its id and server timestamp
    async fn insert_message(&self, message: &NewMessage) -> TrichatResult<ChatMessage>;

    /// The latest `limit` messages, returned oldest first
    async fn list_messages(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        limit: i64,
    ) -> TrichatResult<Vec<ChatMessage>>;

    /// Bump message counters after a message was stored. Separate write from
    /// `insert_message`; the two are not atomic.
    async fn record_message_activity(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        sender: SenderRole,
        at: OffsetDateTime,
    ) -> TrichatResult<()>;

    async fn reset_unread(&self, shop_id: &ShopId, conversation_id: &ConversationId)
        -> TrichatResult<bool>;

    async fn set_presence(
        &self,
        shop_id: &ShopId,
        participant: &Participant,
        status: PresenceStatus,
    ) -> TrichatResult<()>;

    /// Apply one bulk change to one conversation. `Ok(false)` means the
    /// conversation does not exist in the shop.
    async fn apply_bulk_action(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        action: &BulkAction,
    ) -> TrichatResult<bool>;
}

/// Audit records for bulk operations
#[async_trait]
pub trait BulkOperationStore: Send + Sync {
    async fn insert_operation(&self, op: &BulkOperation) -> TrichatResult<()>;

    async fn update_operation(&self, op: &BulkOperation) -> TrichatResult<()>;

    async fn get_operation(&self, shop_id: &ShopId, id: Uuid) -> TrichatResult<Option<BulkOperation>>;
}

/// Customization studio and widget installation
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get_settings(&self, shop_id: &ShopId) -> TrichatResult<Option<ChatSettings>>;

    async fn upsert_settings(&self, shop_id: &ShopId, settings: &ChatSettings) -> TrichatResult<()>;

    async fn get_installation(&self, shop_id: &ShopId) -> TrichatResult<Option<WidgetInstallation>>;

    async fn upsert_installation(&self, installation: &WidgetInstallation) -> TrichatResult<()>;
}

/// CSAT answers
#[async_trait]
pub trait CsatStore: Send + Sync {
    async fn insert_csat_response(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        customer_id: Option<&CustomerId>,
        rating: i16,
        comment: Option<&str>,
    ) -> TrichatResult<CsatResponse>;

    /// Responses created within `[from, to)`
    async fn list_csat_responses(
        &self,
        shop_id: &ShopId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> TrichatResult<Vec<CsatResponse>>;
}

/// Daily counters
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    async fn increment_message_count(
        &self,
        shop_id: &ShopId,
        day: Date,
        sender: SenderRole,
    ) -> TrichatResult<()>;

    /// Days within `[from, to]`, ascending
    async fn daily_message_counts(
        &self,
        shop_id: &ShopId,
        from: Date,
        to: Date,
    ) -> TrichatResult<Vec<DailyMessageCount>>;
}

/// Everything a single backing database provides
pub trait Store:
    ConversationStore + BulkOperationStore + SettingsStore + CsatStore + AnalyticsStore
{
}

impl<T> Store for T where
    T: ConversationStore + BulkOperationStore + SettingsStore + CsatStore + AnalyticsStore
{
}
