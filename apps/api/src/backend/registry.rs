//! Startup-time backend selection

use std::sync::Arc;

use musebot_shared_config::{ConfigError, ConfigResult};

use super::{InMemoryBackend, MpdBackend, PlaybackBackend};
use crate::config::Config;

pub type BackendFactory = fn(&Config) -> ConfigResult<Arc<dyn PlaybackBackend>>;

/// Backends selectable through `MUSEBOT_BACKEND`
pub static BACKEND_FACTORIES: &[(&str, BackendFactory)] =
    &[("mpd", mpd_factory), ("memory", memory_factory)];

fn mpd_factory(config: &Config) -> ConfigResult<Arc<dyn PlaybackBackend>> {
    let mpd = config
        .mpd
        .clone()
        .ok_or_else(|| ConfigError::MissingEnvVar("MPD_MUSIC_DIR".to_string()))?;
    Ok(Arc::new(MpdBackend::new(mpd)))
}

fn memory_factory(_config: &Config) -> ConfigResult<Arc<dyn PlaybackBackend>> {
    Ok(Arc::new(InMemoryBackend::new()))
}

/// Build the backend named in the configuration
pub fn build_backend(config: &Config) -> ConfigResult<Arc<dyn PlaybackBackend>> {
    let factory = BACKEND_FACTORIES
        .iter()
        .find(|(name, _)| *name == config.backend)
        .map(|(_, factory)| factory)
        .ok_or_else(|| {
            ConfigError::unknown_component(
                "backend",
                config.backend.clone(),
                BACKEND_FACTORIES.iter().map(|(name, _)| *name),
            )
        })?;

    let backend = factory(config)?;
    tracing::info!(backend = backend.name(), "Playback backend selected");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_names() {
        let names: Vec<_> = BACKEND_FACTORIES.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["mpd", "memory"]);
    }

    #[test]
    fn test_memory_backend_from_config() {
        temp_env::with_vars(
            [
                ("MUSEBOT_BACKEND", Some("memory")),
                ("ENVIRONMENT", None),
                ("CATALOG_URL", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(build_backend(&config).unwrap().name(), "memory");
            },
        );
    }

    #[test]
    fn test_unknown_backend() {
        temp_env::with_vars(
            [
                ("MUSEBOT_BACKEND", Some("vlc")),
                ("ENVIRONMENT", None),
                ("CATALOG_URL", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                let err = build_backend(&config).err().unwrap();
                assert!(err.to_string().contains("unknown backend 'vlc'"));
            },
        );
    }
}
