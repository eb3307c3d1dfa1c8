//! Provider registry keyed by provider type.
//!
//! Each upstream service registers a [`ProviderFactory`] that turns a JSON
//! provider config into a ready provider. The grader config names the type
//! (`provider: gemini`) and the registry does the rest.
//!
//! ```ignore
//! let registry = ProviderRegistry::with_defaults();
//! let provider = registry.create(&config.provider, &config.provider_config)?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use super::{LlmProvider, ProviderError};

/// Builds providers of one upstream type.
pub trait ProviderFactory: Send + Sync {
    /// Registry key, e.g. "gemini". Lowercase.
    fn provider_type(&self) -> &'static str;

    /// Build a provider. `config` already has [`ProviderFactory::default_config`]
    /// merged underneath it when called through the registry.
    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError>;

    /// Check `config` (credentials, URLs) without building anything.
    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError>;

    /// Values used for keys the caller leaves out.
    fn default_config(&self) -> JsonValue {
        JsonValue::Object(Default::default())
    }

    fn description(&self) -> &'static str {
        "Generative model provider"
    }
}

/// Provider factories by type.
#[derive(Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, Arc<dyn ProviderFactory>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory. A later factory with the same type wins.
    pub fn register(&mut self, factory: Arc<dyn ProviderFactory>) {
        let key = factory.provider_type().to_ascii_lowercase();
        self.factories.insert(key, factory);
    }

    /// Build the provider named by `provider_type` (case-insensitive).
    ///
    /// Keys missing from `config` are taken from the factory defaults.
    pub fn create(
        &self,
        provider_type: &str,
        config: &JsonValue,
    ) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        let factory = self.factory_for(provider_type)?;
        let merged = with_defaults(factory.default_config(), config);
        let provider = factory.create(&merged)?;
        tracing::debug!(provider = factory.provider_type(), "Created upstream provider");
        Ok(provider)
    }

    pub fn validate(&self, provider_type: &str, config: &JsonValue) -> Result<(), ProviderError> {
        let factory = self.factory_for(provider_type)?;
        factory.validate_config(&with_defaults(factory.default_config(), config))
    }

    /// Registered types, sorted.
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn has_provider(&self, provider_type: &str) -> bool {
        self.factory_for(provider_type).is_ok()
    }

    pub fn default_config(&self, provider_type: &str) -> Option<JsonValue> {
        self.factory_for(provider_type).ok().map(|f| f.default_config())
    }

    fn factory_for(&self, provider_type: &str) -> Result<&Arc<dyn ProviderFactory>, ProviderError> {
        let key = provider_type.trim().to_ascii_lowercase();
        self.factories.get(&key).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "Unknown provider '{}' (available: {})",
                provider_type,
                self.available_types().join(", ")
            ))
        })
    }

    /// Every provider compiled into this build.
    #[cfg(feature = "gemini")]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(super::GeminiProviderFactory));
        registry
    }

    /// Every provider compiled into this build.
    #[cfg(not(feature = "gemini"))]
    pub fn with_defaults() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Top-level keys of `config` over `defaults`. A non-object `config` is
/// passed through untouched so the factory can reject it.
fn with_defaults(defaults: JsonValue, config: &JsonValue) -> JsonValue {
    match (defaults, config) {
        (JsonValue::Object(mut merged), JsonValue::Object(overrides)) => {
            for (key, value) in overrides {
                merged.insert(key.clone(), value.clone());
            }
            JsonValue::Object(merged)
        }
        _ => config.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{GenerationRequest, GenerationResponse, UploadedFile};
    use async_trait::async_trait;

    struct EchoProvider {
        name: String,
    }

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn generate(
            &self,
            _request: &GenerationRequest,
        ) -> Result<GenerationResponse, ProviderError> {
            Ok(GenerationResponse {
                text: Some("{}".to_string()),
                ..Default::default()
            })
        }

        async fn upload(
            &self,
            _data: Vec<u8>,
            _mime_type: &str,
            _display_name: &str,
        ) -> Result<UploadedFile, ProviderError> {
            Err(ProviderError::UploadFailed("not supported".to_string()))
        }

        async fn delete(&self, _file: &UploadedFile) -> Result<(), ProviderError> {
            Ok(())
        }

        async fn health_check(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    struct EchoProviderFactory;

    impl ProviderFactory for EchoProviderFactory {
        fn provider_type(&self) -> &'static str {
            "echo"
        }

        fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
            self.validate_config(config)?;
            let name = config["name"].as_str().unwrap_or("echo").to_string();
            Ok(Arc::new(EchoProvider { name }))
        }

        fn default_config(&self) -> JsonValue {
            serde_json::json!({"name": "default-echo", "region": "local"})
        }

        fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
            if config.get("broken").is_some() {
                return Err(ProviderError::NotConfigured("broken config".to_string()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_registry_register_and_create() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EchoProviderFactory));

        assert!(registry.has_provider("echo"));
        assert!(!registry.has_provider("gemini-pro-max"));

        let provider = registry
            .create("echo", &serde_json::json!({"name": "scripted"}))
            .unwrap();
        assert_eq!(provider.name(), "scripted");

        let defaulted = registry.create(" ECHO ", &serde_json::json!({})).unwrap();
        assert_eq!(defaulted.name(), "default-echo");
    }

    #[test]
    fn test_defaults_merge_under_config() {
        let merged = with_defaults(
            serde_json::json!({"base_url": "https://default", "region": "us"}),
            &serde_json::json!({"region": "eu", "api_key": "k"}),
        );
        assert_eq!(
            merged,
            serde_json::json!({"base_url": "https://default", "region": "eu", "api_key": "k"})
        );

        let not_a_map = serde_json::json!(["gemini"]);
        assert_eq!(with_defaults(serde_json::json!({"a": 1}), &not_a_map), not_a_map);
    }

    #[test]
    fn test_registry_unknown_provider() {
        let registry = ProviderRegistry::new();
        match registry.create("unknown", &serde_json::json!({})) {
            Err(ProviderError::NotConfigured(msg)) => {
                assert!(msg.contains("Unknown provider 'unknown'"));
            }
            other => panic!("expected NotConfigured, got {:?}", other.map(|p| p.name().to_string())),
        }
    }

    #[test]
    fn test_registry_validate() {
        let mut registry = ProviderRegistry::new();
        registry.register(Arc::new(EchoProviderFactory));

        assert!(registry.validate("echo", &serde_json::json!({})).is_ok());
        assert!(registry
            .validate("echo", &serde_json::json!({"broken": true}))
            .is_err());
        assert!(registry.validate("unknown", &serde_json::json!({})).is_err());
        assert_eq!(registry.available_types(), vec!["echo"]);
    }
}
