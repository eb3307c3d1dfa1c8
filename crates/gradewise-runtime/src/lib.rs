//! # gradewise-runtime
//!
//! Upstream integration for Gradewise: sends a submission and its rubric
//! to a generative model, retries failed attempts, and hands the reply to
//! `gradewise-core` for extraction and normalization.
//!
//! The deterministic parts (JSON extraction, scale conversion, the mock
//! grade) live in `gradewise-core` and never touch the network.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gradewise_runtime::{GraderConfig, GradingOrchestrator, GradeRequest, SubmissionInput};
//!
//! let orchestrator = GradingOrchestrator::from_config(GraderConfig::from_env())?;
//! let request = GradeRequest::new(SubmissionInput::from_arg("essay.pdf"));
//!
//! let report = orchestrator.grade(&request).await?;
//! if report.has_flag("MOCK_GRADE") {
//!     eprintln!("upstream was rate-limited; score is synthetic");
//! }
//! ```

use thiserror::Error;

use gradewise_core::{ErrorReport, ExtractionError};

pub mod authenticity;
pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod providers;
pub mod resilience;
pub mod submission;

pub use authenticity::{check_authenticity, AuthenticityChecker, DetectorError};
pub use batch::{BatchEntry, BatchReport};
pub use config::{ConfigError, GraderConfig};
pub use orchestrator::{GradeRequest, GradingOrchestrator, GradingOrchestratorBuilder};
pub use prompts::FeedbackStyle;
pub use providers::{LlmProvider, ProviderError, ProviderRegistry};
pub use resilience::{FallbackStrategy, RetryPolicy};
pub use submission::{RubricInput, SubmissionError, SubmissionInput};

/// Errors from a grading run.
#[derive(Error, Debug)]
pub enum GradingError {
    /// The reply held no JSON object
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Network, timeout, 5xx or an empty reply
    #[error("Upstream request failed: {0}")]
    Transient(ProviderError),

    /// HTTP 429 / RESOURCE_EXHAUSTED
    #[error("Upstream quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Missing credential or unusable settings
    #[error("{0}")]
    Configuration(String),

    /// Rejected submission or rubric
    #[error("{0}")]
    InvalidInput(String),
}

impl GradingError {
    /// Configuration and input errors fail immediately; everything else is
    /// worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            GradingError::Configuration(_) | GradingError::InvalidInput(_)
        )
    }

    /// True for quota errors and for any error whose message carries a
    /// rate-limit signature.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            GradingError::QuotaExceeded(_) => true,
            GradingError::Configuration(_) | GradingError::InvalidInput(_) => false,
            other => resilience::matches_rate_limit_signature(&other.to_string()),
        }
    }

    /// The user-visible `{error, detail}` shape.
    pub fn to_error_report(&self) -> ErrorReport {
        match self {
            GradingError::InvalidInput(message) => ErrorReport::new(message.clone()),
            other => ErrorReport::grading_failed(other.to_string()),
        }
    }
}

impl From<ProviderError> for GradingError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { .. } => GradingError::QuotaExceeded(err.to_string()),
            ProviderError::NotConfigured(message) => GradingError::Configuration(message),
            ProviderError::AuthError => GradingError::Configuration(err.to_string()),
            other => GradingError::Transient(other),
        }
    }
}

impl From<SubmissionError> for GradingError {
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::Upload(provider) => GradingError::from(provider),
            other => GradingError::InvalidInput(other.to_string()),
        }
    }
}

impl From<ConfigError> for GradingError {
    fn from(err: ConfigError) -> Self {
        GradingError::Configuration(err.to_string())
    }
}
