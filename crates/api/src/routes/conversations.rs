//! Conversation and message routes
//!
//! Agents see every conversation in their shop. Customers may only read and
//! post to their own conversation, and may rate it.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use trichat_shared::{
    Attachment, ChatMessage, Conversation, ConversationFilter, ConversationId, ConversationPatch,
    CsatResponse, CustomerId, MessageType, NewMessage,
};

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

// =============================================================================
// Request Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub customer_id: CustomerId,
}

#[derive(Debug, Deserialize)]
pub struct ListMessagesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Deserialize)]
pub struct CsatRequest {
    pub rating: i16,
    pub comment: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /api/chat/conversations
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(filter): Query<ConversationFilter>,
) -> ApiResult<Json<Vec<Conversation>>> {
    auth_user.require_agent()?;

    let conversations = state
        .chat
        .list_conversations(&auth_user.shop_id, &filter)
        .await?;
    Ok(Json(conversations))
}

/// POST /api/chat/conversations
pub async fn create_conversation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateConversationRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    auth_user.require_agent()?;

    let conversation = state
        .chat
        .create_conversation(&auth_user.shop_id, req.customer_id)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/chat/conversations/:id
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(conversation_id): Path<ConversationId>,
) -> ApiResult<Json<Conversation>> {
    let conversation = state
        .chat
        .get_conversation_for(&auth_user.shop_id, &conversation_id, &auth_user.participant)
        .await?;
    Ok(Json(conversation))
}

/// PATCH /api/chat/conversations/:id
pub async fn update_conversation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(conversation_id): Path<ConversationId>,
    Json(patch): Json<ConversationPatch>,
) -> ApiResult<Json<Conversation>> {
    let agent_id = auth_user.require_agent()?;

    let conversation = state
        .chat
        .update_conversation(&auth_user.shop_id, &conversation_id, &patch)
        .await?;

    tracing::info!(
        shop_id = %auth_user.shop_id,
        conversation_id = %conversation_id,
        agent_id = %agent_id,
        status = %conversation.status,
        "Conversation updated"
    );
    Ok(Json(conversation))
}

/// GET /api/chat/conversations/:id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(conversation_id): Path<ConversationId>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    state
        .chat
        .get_conversation_for(&auth_user.shop_id, &conversation_id, &auth_user.participant)
        .await?;

    let messages = state
        .chat
        .list_messages(&auth_user.shop_id, &conversation_id, query.limit)
        .await?;
    Ok(Json(messages))
}

/// POST /api/chat/conversations/:id/messages
///
/// Same path as a socket `send-message`: persisted, then broadcast to the room.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(conversation_id): Path<ConversationId>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let conversation = state
        .chat
        .get_conversation_for(&auth_user.shop_id, &conversation_id, &auth_user.participant)
        .await?;

    let message = state
        .chat
        .send_message(NewMessage {
            shop_id: auth_user.shop_id.clone(),
            conversation_id,
            content: req.content,
            message_type: req.message_type,
            sender: auth_user.participant.clone(),
            attachment: req.attachment,
        })
        .await?;

    let as_agent_message = auth_user.require_agent().is_ok();
    state
        .relay
        .publish(conversation, message.clone(), as_agent_message)
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/chat/conversations/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(conversation_id): Path<ConversationId>,
) -> ApiResult<StatusCode> {
    auth_user.require_agent()?;

    state
        .chat
        .mark_read(&auth_user.shop_id, &conversation_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/chat/conversations/:id/csat
pub async fn submit_csat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(conversation_id): Path<ConversationId>,
    Json(req): Json<CsatRequest>,
) -> ApiResult<(StatusCode, Json<CsatResponse>)> {
    // Agents cannot rate their own shop
    let customer_id = auth_user.customer_id().ok_or(ApiError::Forbidden)?;

    state
        .chat
        .get_conversation_for(&auth_user.shop_id, &conversation_id, &auth_user.participant)
        .await?;

    let response = state
        .csat
        .submit_response(
            &auth_user.shop_id,
            &conversation_id,
            Some(customer_id),
            req.rating,
            req.comment.as_deref(),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(response)))
}
