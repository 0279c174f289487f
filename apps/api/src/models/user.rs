//! User identity and authentication models
//!
//! - Users as resolved by an [`Authenticator`](crate::services::Authenticator)
//! - JWT claims and token structures
//! - Login and masquerade request bodies

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated musebot user
///
/// Usernames are the identity the Hub groups connections by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default)]
    pub administrator: bool,
}

impl User {
    pub fn new(username: impl Into<String>, administrator: bool) -> Self {
        Self {
            username: username.into(),
            administrator,
        }
    }
}

/// JWT claims for access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,

    /// Administrator flag at issue time
    #[serde(default)]
    pub admin: bool,

    /// Token ID, used for logout revocation
    pub jti: Uuid,

    /// Set when an administrator issued this token on behalf of `sub`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masquerade_by: Option<String>,

    /// Issued at timestamp (Unix epoch)
    pub iat: i64,

    /// Expiration timestamp (Unix epoch)
    pub exp: i64,

    /// Issuer
    #[serde(default = "default_issuer")]
    pub iss: String,

    /// Audience
    #[serde(default = "default_audience")]
    pub aud: String,
}

fn default_issuer() -> String {
    "musebot".to_string()
}

fn default_audience() -> String {
    "musebot".to_string()
}

impl Claims {
    /// Create new claims for a user
    pub fn new(user: &User, ttl_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user.username.clone(),
            admin: user.administrator,
            jti: Uuid::new_v4(),
            masquerade_by: None,
            iat: now,
            exp: now + ttl_secs,
            iss: default_issuer(),
            aud: default_audience(),
        }
    }

    /// The user these claims identify
    pub fn user(&self) -> User {
        User::new(self.sub.clone(), self.admin)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Token returned after login or masquerade
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// Token type (always "Bearer")
    pub token_type: String,
    pub user: User,
}

impl AuthToken {
    pub fn new(access_token: String, claims: &Claims) -> Self {
        Self {
            access_token,
            expires_at: claims.expires_at(),
            token_type: "Bearer".to_string(),
            user: claims.user(),
        }
    }
}

/// Login request body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Masquerade request body
#[derive(Debug, Clone, Deserialize)]
pub struct MasqueradeRequest {
    pub username: String,
}
