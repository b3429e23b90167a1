//! Widget installation and customer session routes

use axum::{
    extract::{Extension, State},
    Json,
};
use serde::{Deserialize, Serialize};

use trichat_shared::{ConversationId, CustomerId, ShopId, WidgetInstallation};

use crate::{
    auth::AuthUser,
    error::ApiResult,
    services::CustomerSession,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct CustomerSessionRequest {
    pub shop_id: ShopId,
    pub customer_id: Option<CustomerId>,
    /// Resume an earlier conversation instead of opening a new one
    pub conversation_id: Option<ConversationId>,
}

#[derive(Debug, Serialize)]
pub struct WidgetCodeResponse {
    pub snippet: String,
}

/// POST /api/chat/widget/session (public)
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CustomerSessionRequest>,
) -> ApiResult<Json<CustomerSession>> {
    let session = state
        .widget
        .issue_customer_session(&req.shop_id, req.customer_id, req.conversation_id)
        .await?;

    tracing::info!(
        shop_id = %req.shop_id,
        customer_id = %session.customer_id,
        conversation_id = %session.conversation_id,
        "Customer session issued"
    );
    Ok(Json(session))
}

/// GET /api/chat/widget
pub async fn get_status(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<WidgetInstallation>> {
    auth_user.require_agent()?;
    Ok(Json(state.widget.status(&auth_user.shop_id).await?))
}

/// GET /api/chat/widget/code
pub async fn get_code(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<WidgetCodeResponse>> {
    auth_user.require_agent()?;
    let snippet = state.widget.snippet(&auth_user.shop_id).await?;
    Ok(Json(WidgetCodeResponse { snippet }))
}

/// POST /api/chat/widget/install
pub async fn install(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<WidgetInstallation>> {
    auth_user.require_agent()?;
    let installation = state.widget.install(&auth_user.shop_id).await?;
    tracing::info!(shop_id = %auth_user.shop_id, actor = %auth_user.actor(), "Widget installed");
    Ok(Json(installation))
}

/// POST /api/chat/widget/uninstall
pub async fn uninstall(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<WidgetInstallation>> {
    auth_user.require_agent()?;
    let installation = state.widget.uninstall(&auth_user.shop_id).await?;
    tracing::info!(shop_id = %auth_user.shop_id, actor = %auth_user.actor(), "Widget uninstalled");
    Ok(Json(installation))
}
