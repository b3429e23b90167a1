//! Common types used across Trichat

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::error::TrichatError;

// =============================================================================
// ID Wrappers
// =============================================================================

// Shop domains and conversation ids come from outside (Shopify, the widget),
// so they are opaque strings rather than UUIDs.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Shop (tenant) identifier, usually the `*.myshopify.com` domain
    ShopId
);
string_id!(
    /// Conversation identifier
    ConversationId
);
string_id!(
    /// End customer identifier
    CustomerId
);
string_id!(
    /// Support agent (profile) identifier
    AgentId
);

// =============================================================================
// Enums
// =============================================================================

// Enums are stored as TEXT columns and serialize to the same strings.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TrichatError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(TrichatError::validation(format!(
                        "Invalid {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum!(
    /// Who authored a message
    SenderRole {
        Customer => "customer",
        Agent => "agent",
    }
);

text_enum!(
    /// Kind of message payload
    MessageType {
        Text => "text",
        File => "file",
        Image => "image",
        System => "system",
    }
);

impl Default for MessageType {
    fn default() -> Self {
        Self::Text
    }
}

text_enum!(
    /// Conversation lifecycle status
    ConversationStatus {
        Open => "open",
        Pending => "pending",
        Resolved => "resolved",
        Closed => "closed",
    }
);

impl ConversationStatus {
    pub const ALL: [ConversationStatus; 4] = [
        ConversationStatus::Open,
        ConversationStatus::Pending,
        ConversationStatus::Resolved,
        ConversationStatus::Closed,
    ];
}

impl Default for ConversationStatus {
    fn default() -> Self {
        Self::Open
    }
}

text_enum!(
    /// Conversation priority
    Priority {
        Low => "low",
        Normal => "normal",
        High => "high",
        Urgent => "urgent",
    }
);

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

text_enum!(
    /// Bulk operation lifecycle
    BulkOperationStatus {
        Pending => "pending",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
    }
);

text_enum!(
    /// Online presence of a chat participant
    PresenceStatus {
        Online => "online",
        Offline => "offline",
    }
);

text_enum!(
    /// Where the chat launcher sits on the storefront
    LauncherPosition {
        BottomRight => "bottom-right",
        BottomLeft => "bottom-left",
    }
);

impl Default for LauncherPosition {
    fn default() -> Self {
        Self::BottomRight
    }
}

// =============================================================================
// Participants
// =============================================================================

/// An authenticated chat participant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", content = "id", rename_all = "snake_case")]
pub enum Participant {
    Customer(CustomerId),
    Agent(AgentId),
}

impl Participant {
    pub fn role(&self) -> SenderRole {
        match self {
            Participant::Customer(_) => SenderRole::Customer,
            Participant::Agent(_) => SenderRole::Agent,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Participant::Customer(id) => id.as_str(),
            Participant::Agent(id) => id.as_str(),
        }
    }

    pub fn customer_id(&self) -> Option<&CustomerId> {
        match self {
            Participant::Customer(id) => Some(id),
            Participant::Agent(_) => None,
        }
    }

    pub fn agent_id(&self) -> Option<&AgentId> {
        match self {
            Participant::Agent(id) => Some(id),
            Participant::Customer(_) => None,
        }
    }
}

// =============================================================================
// Messages
// =============================================================================

/// File attachment metadata carried by `file` messages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<i64>,
}

/// A persisted chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub shop_id: ShopId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub message_type: MessageType,
    pub sender: SenderRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<CustomerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Message as submitted, before the store assigns id and timestamp
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub shop_id: ShopId,
    pub conversation_id: ConversationId,
    pub content: String,
    pub message_type: MessageType,
    pub sender: Participant,
    pub attachment: Option<Attachment>,
}

// =============================================================================
// Conversations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub shop_id: ShopId,
    pub customer_id: CustomerId,
    pub assigned_agent_id: Option<AgentId>,
    pub status: ConversationStatus,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub escalated: bool,
    pub escalation_reason: Option<String>,
    pub message_count: i64,
    pub unread_count: i64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Conversation {
    /// A fresh open conversation for `customer_id`
    pub fn new(id: ConversationId, shop_id: ShopId, customer_id: CustomerId) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id,
            shop_id,
            customer_id,
            assigned_agent_id: None,
            status: ConversationStatus::Open,
            priority: Priority::Normal,
            tags: Vec::new(),
            flagged: false,
            flag_reason: None,
            escalated: false,
            escalation_reason: None,
            message_count: 0,
            unread_count: 0,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Listing filter for conversations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationFilter {
    pub status: Option<ConversationStatus>,
    pub assigned_agent_id: Option<AgentId>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

impl ConversationFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    pub fn effective_limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(&self, conv: &Conversation) -> bool {
        self.status.map_or(true, |s| conv.status == s)
            && self
                .assigned_agent_id
                .as_ref()
                .map_or(true, |a| conv.assigned_agent_id.as_ref() == Some(a))
            && self
                .tag
                .as_ref()
                .map_or(true, |t| conv.tags.iter().any(|ct| ct == t))
    }
}

/// Conversation counts for one shop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub open: i64,
    pub pending: i64,
    pub resolved: i64,
    pub closed: i64,
    /// Open or pending with no agent assigned
    pub unassigned: i64,
}

impl ConversationStats {
    pub fn total(&self) -> i64 {
        self.open + self.pending + self.resolved + self.closed
    }

    /// Count `n` conversations in `status`, `unassigned` of which have no agent
    pub fn add(&mut self, status: ConversationStatus, n: i64, unassigned: i64) {
        match status {
            ConversationStatus::Open => self.open += n,
            ConversationStatus::Pending => self.pending += n,
            ConversationStatus::Resolved => self.resolved += n,
            ConversationStatus::Closed => self.closed += n,
        }
        if matches!(status, ConversationStatus::Open | ConversationStatus::Pending) {
            self.unassigned += unassigned;
        }
    }
}

/// Single-conversation update from the dashboard
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationPatch {
    pub status: Option<ConversationStatus>,
    pub priority: Option<Priority>,
    /// `Some(None)` unassigns
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_agent_id: Option<Option<AgentId>>,
}

impl ConversationPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none() && self.assigned_agent_id.is_none()
    }

    pub fn apply(&self, conv: &mut Conversation) {
        if let Some(status) = self.status {
            conv.status = status;
        }
        if let Some(priority) = self.priority {
            conv.priority = priority;
        }
        if let Some(agent) = &self.assigned_agent_id {
            conv.assigned_agent_id = agent.clone();
        }
    }
}

fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// =============================================================================
// Bulk Operations
// =============================================================================

/// A state change applied to many conversations at once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BulkAction {
    /// `agent_id: None` unassigns
    Assign { agent_id: Option<AgentId> },
    SetStatus { status: ConversationStatus },
    AddTags { tags: Vec<String> },
    RemoveTags { tags: Vec<String> },
    SetPriority { priority: Priority },
    Flag {
        flagged: bool,
        #[serde(default)]
        reason: Option<String>,
    },
    Escalate {
        #[serde(default)]
        reason: Option<String>,
    },
}

impl BulkAction {
    /// Close is a status change, kept as a named shortcut for callers
    pub fn close() -> Self {
        BulkAction::SetStatus {
            status: ConversationStatus::Closed,
        }
    }

    pub fn operation_type(&self) -> &'static str {
        match self {
            BulkAction::Assign { .. } => "assign",
            BulkAction::SetStatus { .. } => "set_status",
            BulkAction::AddTags { .. } => "add_tags",
            BulkAction::RemoveTags { .. } => "remove_tags",
            BulkAction::SetPriority { .. } => "set_priority",
            BulkAction::Flag { .. } => "flag",
            BulkAction::Escalate { .. } => "escalate",
        }
    }

    pub fn validate(&self) -> Result<(), TrichatError> {
        match self {
            BulkAction::AddTags { tags } | BulkAction::RemoveTags { tags } => {
                if tags.is_empty() {
                    return Err(TrichatError::validation("At least one tag is required"));
                }
                if tags.iter().any(|t| t.trim().is_empty()) {
                    return Err(TrichatError::validation("Tags cannot be blank"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Apply the change to an in-memory conversation.
    ///
    /// Every variant is a "set field to X" mutation; tag changes use set
    /// semantics so re-applying is a no-op.
    pub fn apply(&self, conv: &mut Conversation) {
        match self {
            BulkAction::Assign { agent_id } => conv.assigned_agent_id = agent_id.clone(),
            BulkAction::SetStatus { status } => conv.status = *status,
            BulkAction::AddTags { tags } => {
                for tag in tags {
                    let tag = tag.trim();
                    if !conv.tags.iter().any(|t| t == tag) {
                        conv.tags.push(tag.to_string());
                    }
                }
            }
            BulkAction::RemoveTags { tags } => {
                conv.tags.retain(|t| !tags.iter().any(|r| r.trim() == t));
            }
            BulkAction::SetPriority { priority } => conv.priority = *priority,
            BulkAction::Flag { flagged, reason } => {
                conv.flagged = *flagged;
                conv.flag_reason = if *flagged { reason.clone() } else { None };
            }
            BulkAction::Escalate { reason } => {
                conv.escalated = true;
                conv.escalation_reason = reason.clone();
                conv.priority = Priority::Urgent;
            }
        }
    }
}

/// Audit record for one bulk operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkOperation {
    pub id: Uuid,
    pub shop_id: ShopId,
    pub operation_type: String,
    pub action: BulkAction,
    pub status: BulkOperationStatus,
    pub conversation_ids: Vec<ConversationId>,
    pub progress_percentage: i32,
    pub success_count: i32,
    pub error_count: i32,
    pub errors: Vec<String>,
    pub error_message: Option<String>,
    pub created_by: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
}

impl BulkOperation {
    /// New record in `processing` state
    pub fn start(
        shop_id: ShopId,
        action: BulkAction,
        conversation_ids: Vec<ConversationId>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            shop_id,
            operation_type: action.operation_type().to_string(),
            action,
            status: BulkOperationStatus::Processing,
            conversation_ids,
            progress_percentage: 0,
            success_count: 0,
            error_count: 0,
            errors: Vec::new(),
            error_message: None,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

// =============================================================================
// Customization, Widget, CSAT, Analytics
// =============================================================================

/// Customization studio settings for a shop's chat widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub welcome_message: String,
    pub offline_message: String,
    pub primary_color: String,
    pub position: LauncherPosition,
    pub launcher_text: String,
    pub csat_enabled: bool,
    pub auto_reply_enabled: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            welcome_message: "Hi there! How can we help you today?".to_string(),
            offline_message: "We're offline right now. Leave a message and we'll get back to you."
                .to_string(),
            primary_color: "#4f46e5".to_string(),
            position: LauncherPosition::BottomRight,
            launcher_text: "Chat with us".to_string(),
            csat_enabled: true,
            auto_reply_enabled: false,
        }
    }
}

/// Widget installation state for a shop
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WidgetInstallation {
    pub shop_id: ShopId,
    pub installed: bool,
    pub script_src: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub installed_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub uninstalled_at: Option<OffsetDateTime>,
}

/// One customer satisfaction survey answer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsatResponse {
    pub id: Uuid,
    pub shop_id: ShopId,
    pub conversation_id: ConversationId,
    pub customer_id: Option<CustomerId>,
    pub rating: i16,
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Per-day message counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyMessageCount {
    pub day: Date,
    pub total: i64,
    pub customer: i64,
    pub agent: i64,
}
