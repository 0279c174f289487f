//! MPD playback backend configuration

use std::path::PathBuf;

use crate::{get_env_or_default, get_required_env, parse_env, ConfigError, ConfigResult};

/// Connection settings for a Music Player Daemon instance
#[derive(Debug, Clone)]
pub struct MpdConfig {
    /// `host:port` (or socket path when `network` is `unix`)
    pub addr: String,

    /// Transport, `tcp` or `unix`
    pub network: String,

    /// MPD's music directory; queued files must resolve beneath it
    pub music_dir: PathBuf,

    /// Connect/read timeout in seconds
    pub timeout_secs: u64,
}

impl MpdConfig {
    /// Load MPD configuration from environment variables
    ///
    /// `MPD_MUSIC_DIR` is required: the backend symlinks fetched files into it.
    pub fn from_env() -> ConfigResult<Self> {
        let music_dir = get_required_env("MPD_MUSIC_DIR")?;
        if music_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "MPD_MUSIC_DIR".to_string(),
                "music directory cannot be empty".to_string(),
            ));
        }

        let network = get_env_or_default("MPD_NETWORK", "tcp");
        if network != "tcp" && network != "unix" {
            return Err(ConfigError::InvalidValue(
                "MPD_NETWORK".to_string(),
                format!("expected 'tcp' or 'unix', got '{}'", network),
            ));
        }

        Ok(Self {
            addr: get_env_or_default("MPD_ADDR", "127.0.0.1:6600"),
            network,
            music_dir: PathBuf::from(music_dir.trim_end_matches('/')),
            timeout_secs: parse_env("MPD_TIMEOUT", 5)?,
        })
    }

    /// Create a TCP configuration (useful for testing)
    pub fn new(addr: impl Into<String>, music_dir: impl Into<PathBuf>) -> Self {
        Self {
            addr: addr.into(),
            network: "tcp".to_string(),
            music_dir: music_dir.into(),
            timeout_secs: 5,
        }
    }
}
