//! Grader configuration.
//!
//! Loaded from YAML or JSON, every field optional:
//!
//! ```yaml
//! provider: gemini
//! model: gemini-2.0-flash
//! temperature: 0.3
//! max_retries: 2
//! retry_delay: 1s
//! request_timeout: 60s
//! feedback_style: brief
//! fallback: mock_grade
//! provider_config:
//!   base_url: https://generativelanguage.googleapis.com/v1beta
//! ```
//!
//! `GEMINI_MODEL` in the environment overrides `model` when the config is
//! built with [`GraderConfig::from_env`] or [`GraderConfig::with_env_overrides`].

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::prompts::{self, FeedbackStyle};
use crate::providers::GenerationConfig;
use crate::resilience::{FallbackStrategy, RetryPolicy};

/// Environment variable overriding the model name.
pub const MODEL_ENV: &str = "GEMINI_MODEL";

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Upper bound on submission and rubric files (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Settings for one grading pipeline.
///
/// Defaults are plain values; nothing here reads process-wide state
/// unless asked to via [`GraderConfig::with_env_overrides`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    /// Provider type in the registry
    pub provider: String,

    pub model: String,

    pub temperature: f32,

    pub max_output_tokens: u32,

    pub response_mime_type: String,

    /// Send the structured-output schema with each request
    pub use_response_schema: bool,

    /// Extra attempts after the first one
    pub max_retries: u32,

    #[serde(with = "humantime_duration")]
    pub retry_delay: Duration,

    #[serde(with = "humantime_duration")]
    pub request_timeout: Duration,

    pub feedback_style: FeedbackStyle,

    /// Only takes effect when an authenticity checker is attached
    pub check_authenticity: bool,

    pub fallback: FallbackStrategy,

    /// Bytes
    pub max_file_size: u64,

    /// Provider-specific settings (`api_key`, `base_url`, ...)
    pub provider_config: JsonValue,
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
            max_output_tokens: 4000,
            response_mime_type: "application/json".to_string(),
            use_response_schema: false,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(60),
            feedback_style: FeedbackStyle::Detailed,
            check_authenticity: true,
            fallback: FallbackStrategy::MockGrade,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            provider_config: JsonValue::Object(Default::default()),
        }
    }
}

impl GraderConfig {
    /// Defaults overlaid with the environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json` file, or YAML for any other extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Apply `GEMINI_MODEL` when it is set and non-empty.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var(MODEL_ENV) {
            let model = model.trim();
            if !model.is_empty() {
                self.model = model.to_string();
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.trim().is_empty() {
            return Err(ConfigError::Invalid("provider must not be empty".to_string()));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(ConfigError::Invalid("max_output_tokens must be positive".to_string()));
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid("max_file_size must be positive".to_string()));
        }
        if !self.provider_config.is_object() {
            return Err(ConfigError::Invalid("provider_config must be a mapping".to_string()));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay)
    }

    /// Generation settings for one request.
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            response_mime_type: self.response_mime_type.clone(),
            response_schema: self.use_response_schema.then(prompts::response_schema),
            timeout: self.request_timeout,
        }
    }
}

/// (De)serialize durations as human-readable strings ("1s", "500ms").
///
/// Bare integers are accepted as seconds.
mod humantime_duration {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Seconds(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
            Raw::Text(text) => humantime::parse_duration(text.trim()).map_err(de::Error::custom),
        }
    }
}
