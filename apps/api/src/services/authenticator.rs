//! Username/password authenticators
//!
//! An [`Authenticator`] resolves credentials to a [`User`]. The daemon picks
//! one by name from [`AUTHENTICATOR_FACTORIES`] at startup.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use musebot_shared_config::{ConfigError, ConfigResult};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::models::User;

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Check a username/password pair
    ///
    /// Fails with [`ApiError::InvalidCredentials`] for unknown users and
    /// wrong passwords alike.
    async fn authenticate(&self, username: &str, password: &str) -> ApiResult<User>;

    /// Look a user up without credentials (masquerade)
    async fn find_user(&self, username: &str) -> ApiResult<Option<User>>;
}

pub type AuthenticatorFactory = fn(&Config) -> ConfigResult<Arc<dyn Authenticator>>;

/// Authenticators selectable through `MUSEBOT_AUTHENTICATOR`
pub static AUTHENTICATOR_FACTORIES: &[(&str, AuthenticatorFactory)] =
    &[("config_file", config_file_factory)];

fn config_file_factory(config: &Config) -> ConfigResult<Arc<dyn Authenticator>> {
    Ok(Arc::new(ConfigFileAuthenticator::from_file(&config.users_file)?))
}

/// Build the authenticator named in the configuration
pub fn build_authenticator(config: &Config) -> ConfigResult<Arc<dyn Authenticator>> {
    let factory = AUTHENTICATOR_FACTORIES
        .iter()
        .find(|(name, _)| *name == config.authenticator)
        .map(|(_, factory)| factory)
        .ok_or_else(|| {
            ConfigError::unknown_component(
                "authenticator",
                config.authenticator.clone(),
                AUTHENTICATOR_FACTORIES.iter().map(|(name, _)| *name),
            )
        })?;
    factory(config)
}

/// One entry of the users file
#[derive(Debug, Clone, Deserialize)]
pub struct UserEntry {
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub administrator: bool,
}

/// Users from a JSON file: `{"alice": {"password_hash": "$argon2id$...", "administrator": true}}`
pub struct ConfigFileAuthenticator {
    users: HashMap<String, UserEntry>,
    argon2: Argon2<'static>,
    /// Verified against when the user is unknown, so both failures cost the same
    dummy_password_hash: String,
}

impl ConfigFileAuthenticator {
    pub fn new(users: HashMap<String, UserEntry>) -> ConfigResult<Self> {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);
        let dummy_password_hash = argon2
            .hash_password(b"musebot-dummy-password", &salt)
            .map_err(|e| ConfigError::InvalidValue("dummy password hash".to_string(), e.to_string()))?
            .to_string();

        for (username, entry) in &users {
            PasswordHash::new(&entry.password_hash).map_err(|e| {
                ConfigError::InvalidValue(format!("password_hash for '{}'", username), e.to_string())
            })?;
        }

        Ok(Self {
            users,
            argon2,
            dummy_password_hash,
        })
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let name = "MUSEBOT_USERS_FILE".to_string();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::InvalidValue(name.clone(), format!("{}: {}", path.display(), e)))?;
        let users: HashMap<String, UserEntry> = serde_json::from_str(&raw)
            .map_err(|e| ConfigError::InvalidValue(name, format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), users = users.len(), "Loaded users file");
        Self::new(users)
    }

    fn verify_password(&self, password: &str, hash: &str) -> bool {
        PasswordHash::new(hash)
            .map(|parsed| {
                self.argon2
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }
}

#[async_trait]
impl Authenticator for ConfigFileAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> ApiResult<User> {
        match self.users.get(username) {
            Some(entry) if self.verify_password(password, &entry.password_hash) => {
                Ok(User::new(username, entry.administrator))
            }
            Some(_) => {
                tracing::warn!(user = %username, "Login failed: invalid password");
                Err(ApiError::InvalidCredentials)
            }
            None => {
                let _ = self.verify_password(password, &self.dummy_password_hash);
                tracing::warn!(user = %username, "Login failed: unknown user");
                Err(ApiError::InvalidCredentials)
            }
        }
    }

    async fn find_user(&self, username: &str) -> ApiResult<Option<User>> {
        Ok(self
            .users
            .get(username)
            .map(|entry| User::new(username, entry.administrator)))
    }
}

/// Hash a password for the users file
pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))?;
    Ok(hash.to_string())
}
