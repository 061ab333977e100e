//! Provider factory pattern for dynamic backend registration.
//!
//! Providers register factories that build instances from a
//! [`BackendConfig`]. The configured `provider` name selects the factory.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.from_config(&config.backend)?;
//! ```

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::{validate_base_url, BackendProvider, ProviderError};
use crate::config::BackendConfig;

/// Factory for creating backend providers from configuration.
pub trait ProviderFactory: Send + Sync {
    /// Unique identifier for this provider type, e.g. "ollama".
    fn provider_type(&self) -> &'static str;

    /// Create a provider instance from configuration.
    fn create(&self, config: &BackendConfig) -> Result<Arc<dyn BackendProvider>, ProviderError>;

    /// Base URL used when the configuration does not set one.
    fn default_base_url(&self) -> &'static str;

    /// Validate configuration without creating a provider.
    fn validate_config(&self, config: &BackendConfig) -> Result<(), ProviderError> {
        match &config.base_url {
            Some(url) => validate_base_url(url),
            None => Ok(()),
        }
    }

    /// Human-readable description of this provider.
    fn description(&self) -> &'static str {
        "Backend provider"
    }
}

/// Summary of one registered provider type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    pub provider_type: &'static str,
    pub description: &'static str,
    pub default_base_url: &'static str,
}

/// Registry of available provider factories.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory, replacing any with the same type.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        self.factories
            .insert(factory.provider_type().to_string(), factory);
    }

    /// Create a provider from type name and configuration.
    pub fn create(
        &self,
        provider_type: &str,
        config: &BackendConfig,
    ) -> Result<Arc<dyn BackendProvider>, ProviderError> {
        let factory = self.factories.get(provider_type).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider type: '{}'. Available: {:?}",
                provider_type,
                self.available_types()
            ))
        })?;
        factory.validate_config(config)?;
        factory.create(config)
    }

    /// Create the provider named by `config.provider`.
    ///
    /// Returns `Ok(None)` when the backend is disabled.
    pub fn from_config(
        &self,
        config: &BackendConfig,
    ) -> Result<Option<Arc<dyn BackendProvider>>, ProviderError> {
        if !config.enabled {
            tracing::info!("Backend disabled, tutor replies use calculator and rules only");
            return Ok(None);
        }
        let provider = self.create(&config.provider, config)?;
        tracing::info!(provider = provider.name(), model = %config.model, "Backend provider ready");
        Ok(Some(provider))
    }

    /// Validate configuration for a provider type.
    pub fn validate(&self, provider_type: &str, config: &BackendConfig) -> Result<(), ProviderError> {
        self.factories
            .get(provider_type)
            .ok_or_else(|| {
                ProviderError::NotConfigured(format!("Unknown provider type: '{}'", provider_type))
            })?
            .validate_config(config)
    }

    /// List available provider types.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Describe every registered provider, sorted by type.
    pub fn describe(&self) -> Vec<ProviderInfo> {
        self.factories
            .values()
            .map(|factory| ProviderInfo {
                provider_type: factory.provider_type(),
                description: factory.description(),
                default_base_url: factory.default_base_url(),
            })
            .collect()
    }

    /// Check if a provider type is registered.
    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factories.contains_key(provider_type)
    }

    /// Create a registry with every provider enabled at compile time.
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "ollama")]
        registry.register(Arc::new(super::OllamaProviderFactory));
        #[cfg(feature = "openai")]
        registry.register(Arc::new(super::OpenAiProviderFactory));
        registry
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.available_types())
            .finish()
    }
}
