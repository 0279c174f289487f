//! Startup-time provider registry

use std::sync::Arc;

use musebot_shared_config::{ConfigError, ConfigResult};
use serde::Serialize;

use super::{CatalogProvider, HttpCatalogProvider};
use crate::config::Config;

/// Builds a provider from configuration, `None` when it is not configured
pub type ProviderFactory = fn(&Config) -> ConfigResult<Option<Arc<dyn CatalogProvider>>>;

/// Every provider kind the daemon knows about
pub static PROVIDER_FACTORIES: &[(&str, ProviderFactory)] = &[("catalog", catalog_factory)];

fn catalog_factory(config: &Config) -> ConfigResult<Option<Arc<dyn CatalogProvider>>> {
    let Some(catalog) = &config.catalog else {
        return Ok(None);
    };
    let provider = HttpCatalogProvider::new(catalog)
        .map_err(|e| ConfigError::InvalidValue("CATALOG_URL".to_string(), e.to_string()))?;
    Ok(Some(Arc::new(provider)))
}

/// `available_providers` entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub display_name: String,
}

/// Providers by name, in registration order
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn CatalogProvider>>,
    default: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every configured provider
    ///
    /// A `DEFAULT_PROVIDER` that names no built provider is an error.
    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        let mut registry = Self::new();
        for (kind, factory) in PROVIDER_FACTORIES {
            if let Some(provider) = factory(config)? {
                tracing::info!(kind = %kind, name = %provider.name(), "Provider registered");
                registry.register(provider);
            }
        }

        if let Some(name) = &config.default_provider {
            registry.set_default(name)?;
        }
        if registry.providers.is_empty() {
            tracing::warn!("No catalog providers configured; searches will fail");
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn CatalogProvider>) {
        self.providers.retain(|p| p.name() != provider.name());
        self.providers.push(provider);
    }

    pub fn set_default(&mut self, name: &str) -> ConfigResult<()> {
        if self.get(name).is_none() {
            return Err(ConfigError::unknown_component(
                "provider",
                name,
                self.providers.iter().map(|p| p.name()),
            ));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CatalogProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// The configured default, otherwise the first registered provider
    pub fn default_provider(&self) -> Option<Arc<dyn CatalogProvider>> {
        match &self.default {
            Some(name) => self.get(name),
            None => self.providers.first().cloned(),
        }
    }

    pub fn available(&self) -> Vec<ProviderInfo> {
        self.providers
            .iter()
            .map(|p| ProviderInfo {
                name: p.name().to_string(),
                display_name: p.display_name().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::ProgressSender;
    use crate::models::TrackRef;
    use crate::provider::ProviderResult;
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl CatalogProvider for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn display_name(&self) -> &str {
            "Named"
        }

        async fn search(&self, _query: &str) -> ProviderResult<Vec<TrackRef>> {
            Ok(Vec::new())
        }

        async fn refresh_metadata(&self, track: TrackRef) -> ProviderResult<TrackRef> {
            Ok(track)
        }

        async fn fetch(&self, track: TrackRef, _progress: ProgressSender) -> ProviderResult<TrackRef> {
            Ok(track)
        }
    }

    #[test]
    fn test_default_is_first_registered() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.default_provider().is_none());

        registry.register(Arc::new(Named("a")));
        registry.register(Arc::new(Named("b")));
        assert_eq!(registry.default_provider().unwrap().name(), "a");

        registry.set_default("b").unwrap();
        assert_eq!(registry.default_provider().unwrap().name(), "b");
    }

    #[test]
    fn test_unknown_default_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Named("a")));
        let err = registry.set_default("zz").unwrap_err();
        assert!(err.to_string().contains("available: a"));
    }

    #[test]
    fn test_available_lists_in_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(Named("b")));
        registry.register(Arc::new(Named("a")));
        let names: Vec<_> = registry.available().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(registry.get("c").is_none());
    }
}
