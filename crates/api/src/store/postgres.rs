//! PostgreSQL-backed store

use async_trait::async_trait;
use sqlx::{types::Json, FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use trichat_shared::{
    Attachment, BulkAction, BulkOperation, ChatMessage, ChatSettings, Conversation,
    ConversationFilter, ConversationId, ConversationPatch, ConversationStats, CsatResponse,
    CustomerId, DailyMessageCount, NewMessage, Participant, PresenceStatus, SenderRole, ShopId,
    TrichatError, TrichatResult, WidgetInstallation,
};

use super::{AnalyticsStore, BulkOperationStore, ConversationStore, CsatStore, SettingsStore};

/// Store backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

const CONVERSATION_COLUMNS: &str = r#"
    id, shop_id, customer_id, assigned_agent_id, status, priority, tags,
    flagged, flag_reason, escalated, escalation_reason, message_count,
    unread_count, last_message_at, created_at, updated_at
"#;

#[derive(Debug, FromRow)]
struct ConversationRow {
    id: String,
    shop_id: String,
    customer_id: String,
    assigned_agent_id: Option<String>,
    status: String,
    priority: String,
    tags: Vec<String>,
    flagged: bool,
    flag_reason: Option<String>,
    escalated: bool,
    escalation_reason: Option<String>,
    message_count: i64,
    unread_count: i64,
    last_message_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ConversationRow> for Conversation {
    type Error = TrichatError;

    fn try_from(row: ConversationRow) -> Result<Self, Self::Error> {
        Ok(Conversation {
            id: row.id.into(),
            shop_id: row.shop_id.into(),
            customer_id: row.customer_id.into(),
            assigned_agent_id: row.assigned_agent_id.map(Into::into),
            status: row.status.parse()?,
            priority: row.priority.parse()?,
            tags: row.tags,
            flagged: row.flagged,
            flag_reason: row.flag_reason,
            escalated: row.escalated,
            escalation_reason: row.escalation_reason,
            message_count: row.message_count,
            unread_count: row.unread_count,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const MESSAGE_COLUMNS: &str = r#"
    id, shop_id, conversation_id, content, message_type, sender,
    customer_id, agent_id, attachment, created_at
"#;

#[derive(Debug, FromRow)]
struct MessageRow {
    id: Uuid,
    shop_id: String,
    conversation_id: String,
    content: String,
    message_type: String,
    sender: String,
    customer_id: Option<String>,
    agent_id: Option<String>,
    attachment: Option<Json<Attachment>>,
    created_at: OffsetDateTime,
}

impl TryFrom<MessageRow> for ChatMessage {
    type Error = TrichatError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            id: row.id,
            shop_id: row.shop_id.into(),
            conversation_id: row.conversation_id.into(),
            content: row.content,
            message_type: row.message_type.parse()?,
            sender: row.sender.parse()?,
            customer_id: row.customer_id.map(Into::into),
            agent_id: row.agent_id.map(Into::into),
            attachment: row.attachment.map(|Json(a)| a),
            timestamp: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BulkOperationRow {
    id: Uuid,
    shop_id: String,
    operation_type: String,
    parameters: Json<BulkAction>,
    status: String,
    conversation_ids: Vec<String>,
    progress_percentage: i32,
    success_count: i32,
    error_count: i32,
    errors: Vec<String>,
    error_message: Option<String>,
    created_by: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    completed_at: Option<OffsetDateTime>,
}

impl TryFrom<BulkOperationRow> for BulkOperation {
    type Error = TrichatError;

    fn try_from(row: BulkOperationRow) -> Result<Self, Self::Error> {
        Ok(BulkOperation {
            id: row.id,
            shop_id: row.shop_id.into(),
            operation_type: row.operation_type,
            action: row.parameters.0,
            status: row.status.parse()?,
            conversation_ids: row.conversation_ids.into_iter().map(Into::into).collect(),
            progress_percentage: row.progress_percentage,
            success_count: row.success_count,
            error_count: row.error_count,
            errors: row.errors,
            error_message: row.error_message,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct SettingsRow {
    welcome_message: String,
    offline_message: String,
    primary_color: String,
    position: String,
    launcher_text: String,
    csat_enabled: bool,
    auto_reply_enabled: bool,
}

#[derive(Debug, FromRow)]
struct InstallationRow {
    shop_id: String,
    installed: bool,
    script_src: String,
    installed_at: Option<OffsetDateTime>,
    uninstalled_at: Option<OffsetDateTime>,
}

#[derive(Debug, FromRow)]
struct CsatRow {
    id: Uuid,
    shop_id: String,
    conversation_id: String,
    customer_id: Option<String>,
    rating: i16,
    comment: Option<String>,
    created_at: OffsetDateTime,
}

impl From<CsatRow> for CsatResponse {
    fn from(row: CsatRow) -> Self {
        CsatResponse {
            id: row.id,
            shop_id: row.shop_id.into(),
            conversation_id: row.conversation_id.into(),
            customer_id: row.customer_id.map(Into::into),
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DailyRow {
    day: Date,
    messages_total: i64,
    customer_messages: i64,
    agent_messages: i64,
}

fn dedup_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

// =============================================================================
// Conversations & Messages
// =============================================================================

#[async_trait]
impl ConversationStore for PgStore {
    async fn ping(&self) -> TrichatResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_conversation(&self, conversation: &Conversation) -> TrichatResult<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, shop_id, customer_id, status, priority, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            "#,
        )
        .bind(conversation.id.as_str())
        .bind(conversation.shop_id.as_str())
        .bind(conversation.customer_id.as_str())
        .bind(conversation.status.as_str())
        .bind(conversation.priority.as_str())
        .bind(conversation.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
    ) -> TrichatResult<Option<Conversation>> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM conversations WHERE shop_id = $1 AND id = $2",
            CONVERSATION_COLUMNS
        ))
        .bind(shop_id.as_str())
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Conversation::try_from).transpose()
    }

    async fn list_conversations(
        &self,
        shop_id: &ShopId,
        filter: &ConversationFilter,
    ) -> TrichatResult<Vec<Conversation>> {
        let rows: Vec<ConversationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM conversations
            WHERE shop_id = $1
              AND ($2::TEXT IS NULL OR status = $2)
              AND ($3::TEXT IS NULL OR assigned_agent_id = $3)
              AND ($4::TEXT IS NULL OR $4 = ANY(tags))
            ORDER BY COALESCE(last_message_at, created_at) DESC
            LIMIT $5
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(shop_id.as_str())
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.assigned_agent_id.as_ref().map(|a| a.as_str()))
        .bind(filter.tag.as_deref())
        .bind(filter.effective_limit())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Conversation::try_from).collect()
    }

    async fn conversation_stats(&self, shop_id: &ShopId) -> TrichatResult<ConversationStats> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            r#"
            SELECT status,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE assigned_agent_id IS NULL) AS unassigned
            FROM conversations
            WHERE shop_id = $1
            GROUP BY status
            "#,
        )
        .bind(shop_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut stats = ConversationStats::default();
        for (status, total, unassigned) in rows {
            stats.add(status.parse()?, total, unassigned);
        }
        Ok(stats)
    }

    async fn update_conversation(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        patch: &ConversationPatch,
    ) -> TrichatResult<Option<Conversation>> {
        let (set_agent, agent) = match &patch.assigned_agent_id {
            Some(agent) => (true, agent.as_ref().map(|a| a.as_str())),
            None => (false, None),
        };

        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            r#"
            UPDATE conversations
            SET status = COALESCE($3, status),
                priority = COALESCE($4, priority),
                assigned_agent_id = CASE WHEN $5 THEN $6 ELSE assigned_agent_id END,
                updated_at = NOW()
            WHERE shop_id = $1 AND id = $2
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        ))
        .bind(shop_id.as_str())
        .bind(id.as_str())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.priority.map(|p| p.as_str()))
        .bind(set_agent)
        .bind(agent)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Conversation::try_from).transpose()
    }

    async fn insert_message(&self, message: &NewMessage) -> TrichatResult<ChatMessage> {
        // The conversation must belong to the shop; the FK alone only checks the id
        let row: Option<MessageRow> = sqlx::query_as(&format!(
            r#"
            INSERT INTO messages (shop_id, conversation_id, content, message_type, sender, customer_id, agent_id, attachment)
            SELECT $1, c.id, $3, $4, $5, $6, $7, $8
            FROM conversations c
            WHERE c.shop_id = $1 AND c.id = $2
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(message.shop_id.as_str())
        .bind(message.conversation_id.as_str())
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.sender.role().as_str())
        .bind(message.sender.customer_id().map(|c| c.as_str()))
        .bind(message.sender.agent_id().map(|a| a.as_str()))
        .bind(message.attachment.as_ref().map(Json))
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.try_into(),
            None => Err(TrichatError::not_found(format!(
                "conversation {}",
                message.conversation_id
            ))),
        }
    }

    async fn list_messages(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        limit: i64,
    ) -> TrichatResult<Vec<ChatMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(&format!(
            r#"
            SELECT * FROM (
                SELECT {}
                FROM messages
                WHERE shop_id = $1 AND conversation_id = $2
                ORDER BY created_at DESC
                LIMIT $3
            ) latest
            ORDER BY created_at ASC
            "#,
            MESSAGE_COLUMNS
        ))
        .bind(shop_id.as_str())
        .bind(conversation_id.as_str())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChatMessage::try_from).collect()
    }

    async fn record_message_activity(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        sender: SenderRole,
        at: OffsetDateTime,
    ) -> TrichatResult<()> {
        sqlx::query(
            r#"
            UPDATE conversations
            SET message_count = message_count + 1,
                unread_count = unread_count + CASE WHEN $3 = 'customer' THEN 1 ELSE 0 END,
                last_message_at = $4,
                updated_at = $4
            WHERE shop_id = $1 AND id = $2
            "#,
        )
        .bind(shop_id.as_str())
        .bind(conversation_id.as_str())
        .bind(sender.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn reset_unread(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
    ) -> TrichatResult<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET unread_count = 0 WHERE shop_id = $1 AND id = $2",
        )
        .bind(shop_id.as_str())
        .bind(conversation_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_presence(
        &self,
        shop_id: &ShopId,
        participant: &Participant,
        status: PresenceStatus,
    ) -> TrichatResult<()> {
        sqlx::query(
            r#"
            INSERT INTO participant_presence (shop_id, participant_id, role, online_status, last_seen_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (shop_id, role, participant_id) DO UPDATE SET
              online_status = $4,
              last_seen_at = NOW()
            "#,
        )
        .bind(shop_id.as_str())
        .bind(participant.id())
        .bind(participant.role().as_str())
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn apply_bulk_action(
        &self,
        shop_id: &ShopId,
        id: &ConversationId,
        action: &BulkAction,
    ) -> TrichatResult<bool> {
        let query = match action {
            BulkAction::Assign { agent_id } => sqlx::query(
                "UPDATE conversations SET assigned_agent_id = $3, updated_at = NOW() WHERE shop_id = $1 AND id = $2",
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(agent_id.as_ref().map(|a| a.as_str().to_string())),
            BulkAction::SetStatus { status } => sqlx::query(
                "UPDATE conversations SET status = $3, updated_at = NOW() WHERE shop_id = $1 AND id = $2",
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(status.as_str()),
            BulkAction::AddTags { tags } => sqlx::query(
                r#"
                UPDATE conversations
                SET tags = tags || ARRAY(
                        SELECT t FROM unnest($3::TEXT[]) WITH ORDINALITY AS n(t, i)
                        WHERE NOT (t = ANY(tags))
                        ORDER BY i
                    ),
                    updated_at = NOW()
                WHERE shop_id = $1 AND id = $2
                "#,
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(dedup_tags(tags)),
            BulkAction::RemoveTags { tags } => sqlx::query(
                r#"
                UPDATE conversations
                SET tags = ARRAY(
                        SELECT t FROM unnest(tags) WITH ORDINALITY AS n(t, i)
                        WHERE NOT (t = ANY($3::TEXT[]))
                        ORDER BY i
                    ),
                    updated_at = NOW()
                WHERE shop_id = $1 AND id = $2
                "#,
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(dedup_tags(tags)),
            BulkAction::SetPriority { priority } => sqlx::query(
                "UPDATE conversations SET priority = $3, updated_at = NOW() WHERE shop_id = $1 AND id = $2",
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(priority.as_str()),
            BulkAction::Flag { flagged, reason } => sqlx::query(
                r#"
                UPDATE conversations
                SET flagged = $3,
                    flag_reason = CASE WHEN $3 THEN $4 ELSE NULL END,
                    updated_at = NOW()
                WHERE shop_id = $1 AND id = $2
                "#,
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(*flagged)
            .bind(reason.clone()),
            BulkAction::Escalate { reason } => sqlx::query(
                r#"
                UPDATE conversations
                SET escalated = TRUE,
                    escalation_reason = $3,
                    priority = 'urgent',
                    updated_at = NOW()
                WHERE shop_id = $1 AND id = $2
                "#,
            )
            .bind(shop_id.as_str())
            .bind(id.as_str())
            .bind(reason.clone()),
        };

        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Bulk Operations
// =============================================================================

#[async_trait]
impl BulkOperationStore for PgStore {
    async fn insert_operation(&self, op: &BulkOperation) -> TrichatResult<()> {
        let ids: Vec<&str> = op.conversation_ids.iter().map(|c| c.as_str()).collect();
        sqlx::query(
            r#"
            INSERT INTO bulk_operations (
                id, shop_id, operation_type, parameters, status, conversation_ids,
                progress_percentage, success_count, error_count, errors, error_message,
                created_by, created_at, updated_at, completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(op.id)
        .bind(op.shop_id.as_str())
        .bind(&op.operation_type)
        .bind(Json(&op.action))
        .bind(op.status.as_str())
        .bind(&ids)
        .bind(op.progress_percentage)
        .bind(op.success_count)
        .bind(op.error_count)
        .bind(&op.errors)
        .bind(&op.error_message)
        .bind(&op.created_by)
        .bind(op.created_at)
        .bind(op.updated_at)
        .bind(op.completed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_operation(&self, op: &BulkOperation) -> TrichatResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE bulk_operations
            SET status = $3,
                progress_percentage = $4,
                success_count = $5,
                error_count = $6,
                errors = $7,
                error_message = $8,
                updated_at = $9,
                completed_at = $10
            WHERE id = $1 AND shop_id = $2
            "#,
        )
        .bind(op.id)
        .bind(op.shop_id.as_str())
        .bind(op.status.as_str())
        .bind(op.progress_percentage)
        .bind(op.success_count)
        .bind(op.error_count)
        .bind(&op.errors)
        .bind(&op.error_message)
        .bind(op.updated_at)
        .bind(op.completed_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(TrichatError::not_found(format!("bulk operation {}", op.id)));
        }
        Ok(())
    }

    async fn get_operation(
        &self,
        shop_id: &ShopId,
        id: Uuid,
    ) -> TrichatResult<Option<BulkOperation>> {
        let row: Option<BulkOperationRow> = sqlx::query_as(
            r#"
            SELECT id, shop_id, operation_type, parameters, status, conversation_ids,
                   progress_percentage, success_count, error_count, errors, error_message,
                   created_by, created_at, updated_at, completed_at
            FROM bulk_operations
            WHERE shop_id = $1 AND id = $2
            "#,
        )
        .bind(shop_id.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BulkOperation::try_from).transpose()
    }
}

// =============================================================================
// Settings & Widget
// =============================================================================

#[async_trait]
impl SettingsStore for PgStore {
    async fn get_settings(&self, shop_id: &ShopId) -> TrichatResult<Option<ChatSettings>> {
        let row: Option<SettingsRow> = sqlx::query_as(
            r#"
            SELECT welcome_message, offline_message, primary_color, position,
                   launcher_text, csat_enabled, auto_reply_enabled
            FROM chat_settings
            WHERE shop_id = $1
            "#,
        )
        .bind(shop_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(ChatSettings {
                welcome_message: r.welcome_message,
                offline_message: r.offline_message,
                primary_color: r.primary_color,
                position: r.position.parse()?,
                launcher_text: r.launcher_text,
                csat_enabled: r.csat_enabled,
                auto_reply_enabled: r.auto_reply_enabled,
            })
        })
        .transpose()
    }

    async fn upsert_settings(&self, shop_id: &ShopId, settings: &ChatSettings) -> TrichatResult<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_settings (
                shop_id, welcome_message, offline_message, primary_color, position,
                launcher_text, csat_enabled, auto_reply_enabled, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
            ON CONFLICT (shop_id) DO UPDATE SET
              welcome_message = $2,
              offline_message = $3,
              primary_color = $4,
              position = $5,
              launcher_text = $6,
              csat_enabled = $7,
              auto_reply_enabled = $8,
              updated_at = NOW()
            "#,
        )
        .bind(shop_id.as_str())
        .bind(&settings.welcome_message)
        .bind(&settings.offline_message)
        .bind(&settings.primary_color)
        .bind(settings.position.as_str())
        .bind(&settings.launcher_text)
        .bind(settings.csat_enabled)
        .bind(settings.auto_reply_enabled)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_installation(&self, shop_id: &ShopId) -> TrichatResult<Option<WidgetInstallation>> {
        let row: Option<InstallationRow> = sqlx::query_as(
            r#"
            SELECT shop_id, installed, script_src, installed_at, uninstalled_at
            FROM widget_installations
            WHERE shop_id = $1
            "#,
        )
        .bind(shop_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| WidgetInstallation {
            shop_id: r.shop_id.into(),
            installed: r.installed,
            script_src: r.script_src,
            installed_at: r.installed_at,
            uninstalled_at: r.uninstalled_at,
        }))
    }

    async fn upsert_installation(&self, installation: &WidgetInstallation) -> TrichatResult<()> {
        sqlx::query(
            r#"
            INSERT INTO widget_installations (shop_id, installed, script_src, installed_at, uninstalled_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (shop_id) DO UPDATE SET
              installed = $2,
              script_src = $3,
              installed_at = $4,
              uninstalled_at = $5
            "#,
        )
        .bind(installation.shop_id.as_str())
        .bind(installation.installed)
        .bind(&installation.script_src)
        .bind(installation.installed_at)
        .bind(installation.uninstalled_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// =============================================================================
// CSAT & Analytics
// =============================================================================

#[async_trait]
impl CsatStore for PgStore {
    async fn insert_csat_response(
        &self,
        shop_id: &ShopId,
        conversation_id: &ConversationId,
        customer_id: Option<&CustomerId>,
        rating: i16,
        comment: Option<&str>,
    ) -> TrichatResult<CsatResponse> {
        let row: CsatRow = sqlx::query_as(
            r#"
            INSERT INTO csat_responses (shop_id, conversation_id, customer_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, shop_id, conversation_id, customer_id, rating, comment, created_at
            "#,
        )
        .bind(shop_id.as_str())
        .bind(conversation_id.as_str())
        .bind(customer_id.map(|c| c.as_str()))
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_csat_responses(
        &self,
        shop_id: &ShopId,
        from: OffsetDateTime,
        to: OffsetDateTime,
    ) -> TrichatResult<Vec<CsatResponse>> {
        let rows: Vec<CsatRow> = sqlx::query_as(
            r#"
            SELECT id, shop_id, conversation_id, customer_id, rating, comment, created_at
            FROM csat_responses
            WHERE shop_id = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at ASC
            "#,
        )
        .bind(shop_id.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl AnalyticsStore for PgStore {
    async fn increment_message_count(
        &self,
        shop_id: &ShopId,
        day: Date,
        sender: SenderRole,
    ) -> TrichatResult<()> {
        let (customer, agent): (i64, i64) = match sender {
            SenderRole::Customer => (1, 0),
            SenderRole::Agent => (0, 1),
        };

        sqlx::query(
            r#"
            INSERT INTO chat_analytics_daily (shop_id, day, messages_total, customer_messages, agent_messages)
            VALUES ($1, $2, 1, $3, $4)
            ON CONFLICT (shop_id, day) DO UPDATE SET
              messages_total = chat_analytics_daily.messages_total + 1,
              customer_messages = chat_analytics_daily.customer_messages + $3,
              agent_messages = chat_analytics_daily.agent_messages + $4
            "#,
        )
        .bind(shop_id.as_str())
        .bind(day)
        .bind(customer)
        .bind(agent)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn daily_message_counts(
        &self,
        shop_id: &ShopId,
        from: Date,
        to: Date,
    ) -> TrichatResult<Vec<DailyMessageCount>> {
        let rows: Vec<DailyRow> = sqlx::query_as(
            r#"
            SELECT day, messages_total, customer_messages, agent_messages
            FROM chat_analytics_daily
            WHERE shop_id = $1 AND day BETWEEN $2 AND $3
            ORDER BY day ASC
            "#,
        )
        .bind(shop_id.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| DailyMessageCount {
                day: r.day,
                total: r.messages_total,
                customer: r.customer_messages,
                agent: r.agent_messages,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_tags_trims_and_keeps_order() {
        let tags = vec![
            " vip".to_string(),
            "returns".to_string(),
            "vip ".to_string(),
        ];
        assert_eq!(dedup_tags(&tags), vec!["vip".to_string(), "returns".to_string()]);
    }
}
