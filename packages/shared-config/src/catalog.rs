//! Remote catalog provider configuration

use std::path::PathBuf;

use crate::{get_env_or_default, get_required_env, parse_env, ConfigError, ConfigResult};

/// Settings for the HTTP catalog provider
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Registry name of the provider (what clients pass as `provider`)
    pub name: String,

    /// Human-readable provider name
    pub display_name: String,

    /// Catalog API base URL
    pub url: String,

    /// Optional API key sent as a bearer token
    pub api_key: Option<String>,

    /// Directory fetched tracks are cached in
    pub cache_dir: PathBuf,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl CatalogConfig {
    /// Load catalog configuration from environment variables
    ///
    /// Returns an error when `CATALOG_URL` is unset so callers can `.ok()` it
    /// into an optional provider.
    pub fn from_env() -> ConfigResult<Self> {
        let url = get_required_env("CATALOG_URL")?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(
                "CATALOG_URL".to_string(),
                url,
            ));
        }

        Ok(Self {
            name: get_env_or_default("CATALOG_PROVIDER_NAME", "catalog"),
            display_name: get_env_or_default("CATALOG_DISPLAY_NAME", "Remote Catalog"),
            url,
            api_key: std::env::var("CATALOG_API_KEY").ok().filter(|s| !s.is_empty()),
            cache_dir: PathBuf::from(get_env_or_default(
                "CATALOG_CACHE_DIR",
                "/var/cache/musebot",
            )),
            timeout_secs: parse_env("CATALOG_TIMEOUT", 30)?,
        })
    }

    /// Create a configuration with a custom URL and cache directory (useful for testing)
    pub fn new(url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "catalog".to_string(),
            display_name: "Remote Catalog".to_string(),
            url: url.into(),
            api_key: None,
            cache_dir: cache_dir.into(),
            timeout_secs: 30,
        }
    }
}
