//! Daemon configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use musebot_shared_config::{parse_env, CatalogConfig, CommonConfig, Environment, MpdConfig};

/// Minimum required length for JWT_SECRET to be considered secure
const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Settings shared with other musebot components
    pub common: CommonConfig,

    /// HTTP port (default: 8080)
    pub port: u16,

    /// JWT secret for authentication
    pub jwt_secret: String,

    /// JWT token lifetime (default: 24h)
    pub jwt_expiry: String,

    /// Authenticator registry name (default: config_file)
    pub authenticator: String,

    /// JSON users file read by the `config_file` authenticator
    pub users_file: PathBuf,

    /// Backend registry name (default: mpd)
    pub backend: String,

    /// MPD settings, present when `backend` is `mpd`
    pub mpd: Option<MpdConfig>,

    /// Remote catalog provider settings, present when `CATALOG_URL` is set
    pub catalog: Option<CatalogConfig>,

    /// Provider used by search_and_queue_first and provider-less searches
    pub default_provider: Option<String>,

    /// Reconciler poll interval in milliseconds (default: 20)
    pub poll_interval_ms: u64,

    /// Per-connection outbound mailbox size (default: 256)
    pub ws_mailbox_capacity: usize,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// In production `JWT_SECRET` must be set and at least 32 characters long.
    /// `MPD_MUSIC_DIR` is required when the MPD backend is selected.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        )
        .unwrap_or_default();

        let jwt_secret = Self::load_jwt_secret(environment.is_production())?;

        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        let backend = env::var("MUSEBOT_BACKEND").unwrap_or_else(|_| "mpd".to_string());
        let mpd = if backend == "mpd" {
            Some(MpdConfig::from_env().context("MPD backend selected")?)
        } else {
            None
        };

        let catalog = match env::var("CATALOG_URL") {
            Ok(url) if !url.is_empty() => Some(CatalogConfig::from_env()?),
            _ => None,
        };

        let poll_interval_ms: u64 = parse_env("POLL_INTERVAL_MS", 20)?;
        if poll_interval_ms == 0 {
            bail!("POLL_INTERVAL_MS must be greater than zero");
        }

        let ws_mailbox_capacity: usize = parse_env("WS_MAILBOX_CAPACITY", 256)?;
        if ws_mailbox_capacity == 0 {
            bail!("WS_MAILBOX_CAPACITY must be greater than zero");
        }

        Ok(Self {
            common,

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT value")?,

            jwt_secret,

            jwt_expiry: env::var("JWT_EXPIRY").unwrap_or_else(|_| "24h".to_string()),

            authenticator: env::var("MUSEBOT_AUTHENTICATOR")
                .unwrap_or_else(|_| "config_file".to_string()),

            users_file: PathBuf::from(
                env::var("MUSEBOT_USERS_FILE").unwrap_or_else(|_| "users.json".to_string()),
            ),

            backend,
            mpd,
            catalog,

            default_provider: env::var("DEFAULT_PROVIDER").ok().filter(|s| !s.is_empty()),

            poll_interval_ms,
            ws_mailbox_capacity,

            cors_allowed_origins: env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
        })
    }

    /// Load and validate JWT_SECRET
    ///
    /// In development a fixed default is used with a warning.
    fn load_jwt_secret(is_production: bool) -> Result<String> {
        match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => {
                if is_production && secret.len() < MIN_JWT_SECRET_LENGTH {
                    bail!(
                        "JWT_SECRET must be at least {} characters in production (got {})",
                        MIN_JWT_SECRET_LENGTH,
                        secret.len()
                    );
                }
                Ok(secret)
            }
            _ if is_production => {
                bail!(
                    "JWT_SECRET environment variable is required in production. \
                     Please set a secure secret of at least {} characters.",
                    MIN_JWT_SECRET_LENGTH
                );
            }
            _ => {
                tracing::warn!(
                    "JWT_SECRET not set, using insecure default. \
                     This is only acceptable in development mode."
                );
                Ok("musebot-development-secret".to_string())
            }
        }
    }

    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}
