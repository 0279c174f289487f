//! Token service for musebot
//!
//! - Login through the configured [`Authenticator`]
//! - JWT issue and verification
//! - Logout by token revocation
//! - Administrator masquerade

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use super::authenticator::Authenticator;
use crate::error::{ApiError, ApiResult};
use crate::models::{AuthToken, Claims, User};

/// Default token lifetime: 24 hours
const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 3600;

/// Token service configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT signing secret
    pub jwt_secret: String,
    /// Access token TTL in seconds
    pub token_ttl_secs: i64,
    pub issuer: String,
    pub audience: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: String) -> Self {
        Self {
            jwt_secret,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            issuer: "musebot".to_string(),
            audience: "musebot".to_string(),
        }
    }

    /// Create AuthConfig from an expiry string (e.g., "15m", "24h")
    pub fn with_expiry_string(jwt_secret: String, expiry: &str) -> Self {
        let token_ttl_secs = parse_duration_string(expiry).unwrap_or_else(|| {
            tracing::warn!(expiry = %expiry, "Invalid JWT_EXPIRY, using 24h");
            DEFAULT_TOKEN_TTL_SECS
        });
        Self {
            token_ttl_secs,
            ..Self::new(jwt_secret)
        }
    }
}

/// Parse duration strings like "15m", "7d", "24h" to seconds
fn parse_duration_string(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (split, unit) = s.char_indices().last()?;
    let num: i64 = s[..split].parse().ok()?;

    let scale: i64 = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 24 * 3600,
        'w' => 7 * 24 * 3600,
        _ => return None,
    };
    num.checked_mul(scale)
}

/// Issues and checks access tokens
#[derive(Clone)]
pub struct AuthService {
    config: Arc<AuthConfig>,
    authenticator: Arc<dyn Authenticator>,
    /// Revoked token ids with their expiry, pruned as they lapse
    revoked: Arc<RwLock<HashMap<Uuid, i64>>>,
}

impl AuthService {
    pub fn new(config: AuthConfig, authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            config: Arc::new(config),
            authenticator,
            revoked: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check credentials and issue a token
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<AuthToken> {
        let user = self.authenticator.authenticate(username, password).await?;
        let token = self.issue(&user, None)?;
        tracing::info!(user = %user.username, "User logged in");
        Ok(token)
    }

    /// Issue a token for `target` on behalf of an administrator
    pub async fn masquerade(&self, admin: &Claims, target: &str) -> ApiResult<AuthToken> {
        if !admin.admin {
            return Err(ApiError::Forbidden("admin access required".to_string()));
        }
        let user = self
            .authenticator
            .find_user(target)
            .await?
            .ok_or_else(|| ApiError::not_found("user", target))?;

        tracing::info!(admin = %admin.sub, user = %user.username, "Masquerade token issued");
        self.issue(&user, Some(admin.sub.clone()))
    }

    /// Revoke the token carrying `claims`
    pub fn logout(&self, claims: &Claims) {
        let now = Utc::now().timestamp();
        let mut revoked = self.revoked.write().unwrap_or_else(|e| e.into_inner());
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(claims.jti, claims.exp);
        tracing::info!(user = %claims.sub, "User logged out");
    }

    fn issue(&self, user: &User, masquerade_by: Option<String>) -> ApiResult<AuthToken> {
        let mut claims = Claims::new(user, self.config.token_ttl_secs);
        claims.masquerade_by = masquerade_by;
        claims.iss = self.config.issuer.clone();
        claims.aud = self.config.audience.clone();

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )?;
        Ok(AuthToken::new(token, &claims))
    }

    /// Verify an access token and return its claims
    ///
    /// # Errors
    /// - `ApiError::InvalidToken` if the token is invalid, expired or revoked
    pub fn verify_access_token(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Access token verification failed");
            ApiError::InvalidToken(e.to_string())
        })?;

        let revoked = self.revoked.read().unwrap_or_else(|e| e.into_inner());
        if revoked.contains_key(&token_data.claims.jti) {
            return Err(ApiError::InvalidToken("token has been revoked".to_string()));
        }

        Ok(token_data.claims)
    }
}
