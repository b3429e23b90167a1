//! Customization studio routes

use axum::{
    extract::{Extension, State},
    Json,
};

use trichat_shared::ChatSettings;

use crate::{
    auth::AuthUser,
    error::ApiResult,
    services::SettingsPatch,
    state::AppState,
};

/// GET /api/chat/settings
pub async fn get_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> ApiResult<Json<ChatSettings>> {
    auth_user.require_agent()?;
    Ok(Json(state.settings.get_settings(&auth_user.shop_id).await?))
}

/// PATCH /api/chat/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(patch): Json<SettingsPatch>,
) -> ApiResult<Json<ChatSettings>> {
    auth_user.require_agent()?;

    let settings = state
        .settings
        .update_settings(&auth_user.shop_id, patch)
        .await?;

    tracing::info!(
        shop_id = %auth_user.shop_id,
        actor = %auth_user.actor(),
        "Chat settings updated"
    );
    Ok(Json(settings))
}
