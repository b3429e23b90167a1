//! Authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use trichat_shared::{AgentId, CustomerId, Participant, ShopId};

use super::jwt::{JwtError, JwtManager};
use crate::error::ApiError;

/// State needed by the auth middleware
#[derive(Clone)]
pub struct AuthState {
    pub jwt_manager: Arc<JwtManager>,
}

/// Authenticated caller, inserted as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub shop_id: ShopId,
    pub participant: Participant,
}

impl AuthUser {
    /// Dashboard-only routes
    pub fn require_agent(&self) -> Result<&AgentId, ApiError> {
        self.participant.agent_id().ok_or(ApiError::Forbidden)
    }

    pub fn customer_id(&self) -> Option<&CustomerId> {
        self.participant.customer_id()
    }

    /// Identity recorded as `created_by` on audit records
    pub fn actor(&self) -> String {
        format!("{}:{}", self.participant.role(), self.participant.id())
    }
}

/// Require a valid bearer token
pub async fn require_auth(
    State(auth_state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::Unauthorized)?;

    let auth_user = authenticate(&auth_state.jwt_manager, token)?;

    tracing::debug!(
        shop_id = %auth_user.shop_id,
        role = %auth_user.participant.role(),
        "Request authenticated"
    );

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

/// Validate a raw token into an [`AuthUser`]
pub fn authenticate(jwt_manager: &JwtManager, token: &str) -> Result<AuthUser, ApiError> {
    let claims = jwt_manager.validate_token(token).map_err(|e| {
        match &e {
            JwtError::Expired => tracing::debug!("Rejected expired token"),
            other => tracing::warn!(error = %other, "Rejected token"),
        }
        ApiError::InvalidToken
    })?;

    Ok(AuthUser {
        shop_id: claims.shop(),
        participant: claims.participant(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_customer() {
        let jwt = JwtManager::new("test-secret-key-at-least-32-chars!", 1, 30);
        let token = jwt
            .generate_customer_token(&CustomerId::new("c1"), &ShopId::new("shop1"))
            .unwrap();

        let user = authenticate(&jwt, &token).unwrap();
        assert_eq!(user.shop_id, ShopId::new("shop1"));
        assert!(matches!(user.require_agent(), Err(ApiError::Forbidden)));
        assert_eq!(user.actor(), "customer:c1");
    }

    #[test]
    fn test_authenticate_garbage() {
        let jwt = JwtManager::new("test-secret-key-at-least-32-chars!", 1, 30);
        assert!(matches!(
            authenticate(&jwt, "not-a-jwt"),
            Err(ApiError::InvalidToken)
        ));
    }
}
