//! Analytics and CSAT reporting routes

use axum::{
    extract::{Extension, Query, State},
    Json,
};

use crate::{
    auth::AuthUser,
    error::ApiResult,
    services::{AnalyticsSummary, CsatSummary, DateRange},
    state::AppState,
};

/// GET /api/chat/analytics?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<AnalyticsSummary>> {
    auth_user.require_agent()?;
    Ok(Json(state.analytics.summary(&auth_user.shop_id, range).await?))
}

/// GET /api/chat/csat?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn get_csat(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Query(range): Query<DateRange>,
) -> ApiResult<Json<CsatSummary>> {
    auth_user.require_agent()?;
    Ok(Json(state.csat.summary(&auth_user.shop_id, range).await?))
}
