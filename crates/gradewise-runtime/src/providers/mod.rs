//! Upstream model provider abstractions for gradewise-runtime.
//!
//! This module defines the trait for generative model providers and the
//! request/response types that cross it. The Gemini REST provider is
//! available behind the `gemini` feature.
//!
//! ## Security
//!
//! All providers use the [`secrets`] module for credential handling.
//! Each provider declares a [`CredentialLookup`] for its key.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::time::Duration;
use thiserror::Error;

mod factory;
pub mod secrets;

#[cfg(feature = "gemini")]
mod gemini;

pub use factory::{ProviderFactory, ProviderRegistry};
pub use secrets::{ApiCredential, CredentialLookup, CredentialSource};

#[cfg(feature = "gemini")]
pub use gemini::{GeminiProvider, GeminiProviderFactory, GEMINI_CREDENTIAL};

/// Errors from upstream providers.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded (RESOURCE_EXHAUSTED), retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("No content received from model")]
    EmptyResponse,

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// A file stored on the upstream service for the duration of one grading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Resource name used for deletion (e.g. "files/abc123")
    pub name: String,

    /// URI referenced from generation requests
    pub uri: String,

    pub mime_type: String,
}

/// One ordered piece of the generation input.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    File(UploadedFile),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(text.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            ContentPart::File(_) => None,
        }
    }
}

/// Generation settings for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Model to use
    pub model: String,

    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_output_tokens: u32,

    /// Requested response MIME type ("application/json")
    pub response_mime_type: String,

    /// Optional structured-output schema
    pub response_schema: Option<JsonValue>,

    /// Request timeout
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.3,
            max_output_tokens: 4000,
            response_mime_type: "application/json".to_string(),
            response_schema: None,
            timeout: Duration::from_secs(60),
        }
    }
}

/// A complete generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_instruction: String,
    pub contents: Vec<ContentPart>,
    pub config: GenerationConfig,
}

/// Response from a generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerationResponse {
    /// Generated text; `None` when the model returned no content
    pub text: Option<String>,

    /// Token usage
    pub usage: TokenUsage,

    /// Model version reported by the service
    pub model: String,

    pub finish_reason: Option<String>,
}

/// Token usage from a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,

    /// Tokens in the completion
    pub completion_tokens: u32,
}

impl TokenUsage {
    /// Total tokens used.
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Provider abstraction over the upstream generative model.
///
/// Besides generation, providers host temporary binary uploads for
/// native-format submissions (PDF, images). Uploads are owned by the
/// caller, which must `delete` them once generation has finished.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate content for an ordered list of parts.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError>;

    /// Upload binary content for later reference from a request.
    async fn upload(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFile, ProviderError>;

    /// Delete a previously uploaded file.
    async fn delete(&self, file: &UploadedFile) -> Result<(), ProviderError>;

    /// Check if provider is usable.
    async fn health_check(&self) -> bool;

    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Estimate tokens for a prompt.
    fn estimate_tokens(&self, text: &str) -> u32 {
        // ~4 chars per token
        (text.len() / 4) as u32
    }
}
