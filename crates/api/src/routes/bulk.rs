//! Bulk conversation operation routes

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use trichat_shared::{BulkAction, BulkOperation, ConversationId};

use crate::{
    auth::AuthUser,
    error::ApiResult,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub action: BulkAction,
    pub conversation_ids: Vec<ConversationId>,
}

/// POST /api/chat/bulk
///
/// Runs to completion before responding; the returned record carries the
/// per-conversation outcome.
pub async fn create_bulk_operation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<BulkRequest>,
) -> ApiResult<Json<BulkOperation>> {
    auth_user.require_agent()?;

    let op = state
        .bulk
        .execute(
            &auth_user.shop_id,
            req.action,
            req.conversation_ids,
            auth_user.actor(),
        )
        .await?;
    Ok(Json(op))
}

/// GET /api/chat/bulk/:id
pub async fn get_bulk_operation(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(operation_id): Path<Uuid>,
) -> ApiResult<Json<BulkOperation>> {
    auth_user.require_agent()?;
    Ok(Json(state.bulk.get(&auth_user.shop_id, operation_id).await?))
}
