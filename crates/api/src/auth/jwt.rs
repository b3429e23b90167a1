//! JWT token generation and validation

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use trichat_shared::{AgentId, CustomerId, Participant, SenderRole, ShopId};

/// JWT claims carried by both dashboard (agent) and widget (customer) tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (agent id or customer id, depending on `role`)
    pub sub: String,
    /// Shop the token is scoped to
    pub shop_id: String,
    pub role: SenderRole,
    /// Issued at
    pub iat: i64,
    /// Expiration
    pub exp: i64,
}

impl Claims {
    pub fn participant(&self) -> Participant {
        match self.role {
            SenderRole::Agent => Participant::Agent(AgentId::new(self.sub.clone())),
            SenderRole::Customer => Participant::Customer(CustomerId::new(self.sub.clone())),
        }
    }

    pub fn shop(&self) -> ShopId {
        ShopId::new(self.shop_id.clone())
    }
}

/// JWT manager for token operations
#[derive(Clone)]
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    agent_token_expiry_hours: i64,
    customer_session_minutes: i64,
}

impl JwtManager {
    pub fn new(secret: &str, agent_token_expiry_hours: i64, customer_session_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            agent_token_expiry_hours,
            customer_session_minutes,
        }
    }

    /// Token for a dashboard agent
    pub fn generate_agent_token(&self, agent_id: &AgentId, shop_id: &ShopId) -> Result<String, JwtError> {
        self.generate(
            agent_id.as_str(),
            shop_id,
            SenderRole::Agent,
            Duration::hours(self.agent_token_expiry_hours),
        )
    }

    /// Short-lived token for a storefront widget session
    pub fn generate_customer_token(
        &self,
        customer_id: &CustomerId,
        shop_id: &ShopId,
    ) -> Result<String, JwtError> {
        self.generate(
            customer_id.as_str(),
            shop_id,
            SenderRole::Customer,
            Duration::minutes(self.customer_session_minutes),
        )
    }

    fn generate(
        &self,
        sub: &str,
        shop_id: &ShopId,
        role: SenderRole,
        lifetime: Duration,
    ) -> Result<String, JwtError> {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: sub.to_string(),
            shop_id: shop_id.as_str().to_string(),
            role,
            iat: now.unix_timestamp(),
            exp: (now + lifetime).unix_timestamp(),
        };

        // Explicit algorithm prevents algorithm confusion attacks
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::Encoding(e.to_string()))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 second clock skew tolerance

        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => JwtError::Invalid,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::Invalid,
                _ => JwtError::Validation(e.to_string()),
            })?;

        if claims.sub.is_empty() || claims.shop_id.is_empty() {
            return Err(JwtError::Invalid);
        }
        Ok(claims)
    }

    pub fn customer_session_seconds(&self) -> i64 {
        self.customer_session_minutes * 60
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
    #[error("Token encoding failed: {0}")]
    Encoding(String),
    #[error("Token validation failed: {0}")]
    Validation(String),
}
