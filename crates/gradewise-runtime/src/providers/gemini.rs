//! Google Gemini provider over the public REST API.
//!
//! - generation: `POST {base}/models/{model}:generateContent`
//! - uploads: resumable two-step upload to the Files API
//! - cleanup: `DELETE {base}/{file.name}`
//!
//! HTTP 429 and `RESOURCE_EXHAUSTED` error bodies both map to
//! [`ProviderError::RateLimited`].

use super::{
    factory::ProviderFactory,
    secrets::{ApiCredential, CredentialLookup},
    ContentPart, GenerationRequest, GenerationResponse, LlmProvider, ProviderError, TokenUsage,
    UploadedFile,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

/// `api_key` in provider config, then `GEMINI_API_KEY`, then `GOOGLE_API_KEY`.
pub const GEMINI_CREDENTIAL: CredentialLookup =
    CredentialLookup::new("Gemini API key", "api_key", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_UPLOAD_URL: &str = "https://generativelanguage.googleapis.com/upload/v1beta/files";

const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Gemini provider.
///
/// The API key is held in an [`ApiCredential`] and only exposed when the
/// request header is set.
pub struct GeminiProvider {
    credential: ApiCredential,
    base_url: String,
    upload_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("credential", &self.credential)
            .field("base_url", &self.base_url)
            .field("upload_url", &self.upload_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_credential(GEMINI_CREDENTIAL.explicit(api_key))
    }

    /// Create from `GEMINI_API_KEY`, falling back to `GOOGLE_API_KEY`.
    pub fn from_env() -> Result<Self, ProviderError> {
        Ok(Self::with_credential(GEMINI_CREDENTIAL.resolve_env()?))
    }

    /// Create from JSON configuration with environment fallback.
    ///
    /// Recognized keys: `api_key`, `base_url`, `upload_url`.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let mut provider = Self::with_credential(GEMINI_CREDENTIAL.resolve(config)?);
        if let Some(url) = config["base_url"].as_str() {
            provider.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = config["upload_url"].as_str() {
            provider.upload_url = url.to_string();
        }
        Ok(provider)
    }

    fn with_credential(credential: ApiCredential) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn generate_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

// ----- wire format -----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: WireContent<'a>,
    contents: Vec<WireContent<'a>>,
    generation_config: WireGenerationConfig<'a>,
}

#[derive(Debug, Serialize)]
struct WireContent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<WirePart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum WirePart<'a> {
    Text(&'a str),
    FileData(WireFileData<'a>),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireFileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig<'a> {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<&'a JsonValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: WireFile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn build_request_body(request: &GenerationRequest) -> GenerateContentRequest<'_> {
    let parts = request
        .contents
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => WirePart::Text(text),
            ContentPart::File(file) => WirePart::FileData(WireFileData {
                mime_type: &file.mime_type,
                file_uri: &file.uri,
            }),
        })
        .collect();

    GenerateContentRequest {
        system_instruction: WireContent {
            role: None,
            parts: vec![WirePart::Text(&request.system_instruction)],
        },
        contents: vec![WireContent {
            role: Some("user"),
            parts,
        }],
        generation_config: WireGenerationConfig {
            temperature: request.config.temperature,
            max_output_tokens: request.config.max_output_tokens,
            response_mime_type: &request.config.response_mime_type,
            response_schema: request.config.response_schema.as_ref(),
        },
    }
}

impl GenerateContentResponse {
    fn into_response(self, requested_model: &str) -> GenerationResponse {
        let first = self.candidates.into_iter().next();
        let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());

        let text = first
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty());

        let usage = self
            .usage_metadata
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_token_count,
                completion_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        GenerationResponse {
            text,
            usage,
            model: self
                .model_version
                .unwrap_or_else(|| requested_model.to_string()),
            finish_reason,
        }
    }
}

/// Map a non-success HTTP response onto a provider error.
fn classify_error(status: u16, retry_after: Option<Duration>, body: &str) -> ProviderError {
    let detail = serde_json::from_str::<GeminiError>(body).ok().map(|e| e.error);

    let resource_exhausted = detail
        .as_ref()
        .map(|d| d.status == "RESOURCE_EXHAUSTED")
        .unwrap_or(false);

    if status == 429 || resource_exhausted {
        return ProviderError::RateLimited { retry_after };
    }

    if status == 401 || status == 403 {
        return ProviderError::AuthError;
    }

    let message = match detail {
        Some(d) if !d.message.is_empty() => d.message,
        _ => body.chars().take(200).collect(),
    };

    ProviderError::ApiError { status, message }
}

fn transport_error(err: reqwest::Error, timeout: Duration) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(timeout)
    } else {
        ProviderError::HttpError(err.to_string())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    Err(classify_error(status.as_u16(), retry_after, &body))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let timeout = request.config.timeout;
        let body = build_request_body(request);

        let response = self
            .client
            .post(self.generate_url(&request.config.model))
            .header(API_KEY_HEADER, self.credential.expose())
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        let response = ensure_success(response).await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(body.into_response(&request.config.model))
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFile, ProviderError> {
        let start = self
            .client
            .post(&self.upload_url)
            .header(API_KEY_HEADER, self.credential.expose())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .timeout(UPLOAD_TIMEOUT)
            .json(&serde_json::json!({"file": {"display_name": display_name}}))
            .send()
            .await
            .map_err(|e| transport_error(e, UPLOAD_TIMEOUT))?;

        let start = ensure_success(start).await?;

        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ProviderError::UploadFailed("missing upload session URL".to_string()))?;

        let finish = self
            .client
            .post(session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .timeout(UPLOAD_TIMEOUT)
            .body(data)
            .send()
            .await
            .map_err(|e| transport_error(e, UPLOAD_TIMEOUT))?;

        let finish = ensure_success(finish).await?;

        let body: UploadResponse = finish
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        tracing::debug!(file = %body.file.name, mime_type, "Uploaded file");

        Ok(UploadedFile {
            mime_type: if body.file.mime_type.is_empty() {
                mime_type.to_string()
            } else {
                body.file.mime_type
            },
            name: body.file.name,
            uri: body.file.uri,
        })
    }

    async fn delete(&self, file: &UploadedFile) -> Result<(), ProviderError> {
        let timeout = Duration::from_secs(30);
        let response = self
            .client
            .delete(format!("{}/{}", self.base_url, file.name))
            .header(API_KEY_HEADER, self.credential.expose())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| transport_error(e, timeout))?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn health_check(&self) -> bool {
        !self.credential.is_empty()
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Factory for Gemini providers.
///
/// ## Configuration Format
/// ```json
/// {
///   "api_key": "AIza...",        // Optional, falls back to GEMINI_API_KEY / GOOGLE_API_KEY
///   "base_url": "https://...",   // Optional, custom API endpoint
///   "upload_url": "https://..."  // Optional, custom Files API upload endpoint
/// }
/// ```
pub struct GeminiProviderFactory;

impl ProviderFactory for GeminiProviderFactory {
    fn provider_type(&self) -> &'static str {
        "gemini"
    }

    fn create(&self, config: &JsonValue) -> Result<Arc<dyn LlmProvider>, ProviderError> {
        self.validate_config(config)?;
        Ok(Arc::new(GeminiProvider::from_config(config)?))
    }

    fn validate_config(&self, config: &JsonValue) -> Result<(), ProviderError> {
        GEMINI_CREDENTIAL.resolve(config)?;

        for key in ["base_url", "upload_url"] {
            if let Some(url) = config[key].as_str() {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ProviderError::NotConfigured(format!(
                        "{} must start with http:// or https://",
                        key
                    )));
                }
            }
        }

        Ok(())
    }

    fn default_config(&self) -> JsonValue {
        serde_json::json!({
            "base_url": DEFAULT_BASE_URL,
            "upload_url": DEFAULT_UPLOAD_URL
        })
    }

    fn description(&self) -> &'static str {
        "Google Gemini provider with native PDF/image uploads"
    }
}
