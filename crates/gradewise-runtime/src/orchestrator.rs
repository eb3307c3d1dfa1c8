//! Grading orchestrator.
//!
//! One grading run:
//! 1. prepare rubric and submission parts (uploading native files)
//! 2. call the upstream, retrying failed attempts with a fixed delay
//! 3. release uploads, whatever the outcome
//! 4. on a final rate-limit error, substitute the mock grade
//! 5. stamp elapsed time, merge the authenticity verdict, normalize
//!
//! Batches run the same pipeline once per submission, in order.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use gradewise_core::scale::round2;
use gradewise_core::{extract_json, mock_grade, NormalizedGradeResult, Normalizer, RawGradeResult};

use crate::authenticity::{check_authenticity, AuthenticityChecker};
use crate::batch::{BatchEntry, BatchReport};
use crate::config::GraderConfig;
use crate::prompts::{self, FeedbackStyle};
use crate::providers::{GenerationRequest, LlmProvider, ProviderError, ProviderRegistry};
use crate::resilience::RetryPolicy;
use crate::submission::{RubricInput, SubmissionInput, UploadSet};
use crate::GradingError;

/// One submission to grade.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeRequest {
    pub submission: SubmissionInput,
    pub rubric: RubricInput,

    /// Overrides the configured feedback style
    pub feedback_style: Option<FeedbackStyle>,
}

impl GradeRequest {
    /// Grade against the default essay rubric.
    pub fn new(submission: SubmissionInput) -> Self {
        Self {
            submission,
            rubric: RubricInput::default(),
            feedback_style: None,
        }
    }

    pub fn with_rubric(mut self, rubric: RubricInput) -> Self {
        self.rubric = rubric;
        self
    }

    pub fn with_feedback_style(mut self, style: FeedbackStyle) -> Self {
        self.feedback_style = Some(style);
        self
    }
}

/// Drives grading requests against one provider.
///
/// Holds no mutable state; one instance can serve concurrent requests.
pub struct GradingOrchestrator {
    provider: Arc<dyn LlmProvider>,
    config: GraderConfig,
    normalizer: Normalizer,
    checker: Option<Arc<dyn AuthenticityChecker>>,
    retry: RetryPolicy,
}

impl GradingOrchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GraderConfig) -> Self {
        let retry = config.retry_policy();
        Self {
            provider,
            config,
            normalizer: Normalizer::new(),
            checker: None,
            retry,
        }
    }

    /// Build the configured provider from the default registry.
    pub fn from_config(config: GraderConfig) -> Result<Self, GradingError> {
        config.validate()?;
        let provider = ProviderRegistry::with_defaults().create(&config.provider, &config.provider_config)?;
        Ok(Self::new(provider, config))
    }

    pub fn builder() -> GradingOrchestratorBuilder {
        GradingOrchestratorBuilder::new()
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Grade one submission into the canonical report.
    ///
    /// Fails only when the final attempt failed with an error that is not a
    /// rate limit, or when fallback is disabled.
    pub async fn grade(&self, request: &GradeRequest) -> Result<NormalizedGradeResult, GradingError> {
        let rubric = request.rubric.descriptor();
        let start = Instant::now();

        let mut result = match self.generate_grade(request).await {
            Ok(result) => result,
            Err(e) if e.is_rate_limit() && self.config.fallback.substitutes_mock() => {
                warn!(error = %e, "Upstream rate-limited, substituting mock grade");
                mock_grade(&rubric)
            }
            Err(e) => return Err(e),
        };

        result.grading_time_seconds = round2(start.elapsed().as_secs_f64());

        if self.config.check_authenticity {
            if let Some(checker) = &self.checker {
                match request.submission.text_content(self.config.max_file_size).await {
                    Some(text) if !text.trim().is_empty() => {
                        check_authenticity(checker.as_ref(), &text).await.apply_to(&mut result);
                    }
                    _ => info!("No submission text available, skipping authenticity check"),
                }
            }
        }

        Ok(self.normalizer.normalize(result, &rubric))
    }

    /// Call the upstream with retries and return its parsed result.
    ///
    /// Uploads made while preparing the request are released before this
    /// returns, on success and on every error path.
    pub async fn generate_grade(&self, request: &GradeRequest) -> Result<RawGradeResult, GradingError> {
        let mut uploads = UploadSet::new(self.provider.clone(), self.config.max_file_size);
        let outcome = self.generate_with_uploads(request, &mut uploads).await;
        uploads.release().await;
        outcome
    }

    async fn generate_with_uploads(
        &self,
        request: &GradeRequest,
        uploads: &mut UploadSet,
    ) -> Result<RawGradeResult, GradingError> {
        let submission_parts = uploads.prepare_submission(&request.submission).await?;
        let rubric_parts = uploads.prepare_rubric(&request.rubric).await?;

        let style = request.feedback_style.unwrap_or(self.config.feedback_style);
        let generation = GenerationRequest {
            system_instruction: prompts::system_instruction(style),
            contents: prompts::build_contents(rubric_parts, submission_parts),
            config: self.config.generation_config(),
        };

        info!(
            provider = self.provider.name(),
            model = %generation.config.model,
            uploads = uploads.len(),
            submission = %request.submission.label(),
            "Requesting grade"
        );

        self.retry.run(|| self.attempt(&generation)).await
    }

    /// One upstream call, extraction included.
    async fn attempt(&self, request: &GenerationRequest) -> Result<RawGradeResult, GradingError> {
        let response = self.provider.generate(request).await?;
        let text = response.text.ok_or(ProviderError::EmptyResponse)?;
        let value = extract_json(text.trim())?;
        Ok(RawGradeResult::from_upstream(&value))
    }

    /// Grade submissions one after another.
    ///
    /// A failing submission is recorded in its entry and does not stop the
    /// batch.
    pub async fn grade_batch(&self, requests: &[GradeRequest]) -> BatchReport {
        let entries: Vec<BatchEntry> = stream::iter(requests)
            .then(|request| async move {
                let label = request.submission.label();
                match self.grade(request).await {
                    Ok(result) => BatchEntry::graded(label, result),
                    Err(e) => {
                        warn!(submission = %label, error = %e, "Grading failed");
                        BatchEntry::failed(label, e.to_error_report())
                    }
                }
            })
            .collect()
            .await;

        let report = BatchReport::from_entries(entries);
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "Batch complete"
        );
        report
    }
}

/// Builder for [`GradingOrchestrator`].
pub struct GradingOrchestratorBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    config: GraderConfig,
    normalizer: Normalizer,
    checker: Option<Arc<dyn AuthenticityChecker>>,
}

impl GradingOrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            config: GraderConfig::default(),
            normalizer: Normalizer::new(),
            checker: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(mut self, config: GraderConfig) -> Self {
        self.config = config;
        self
    }

    /// Normalizer carrying the fallback scale for rubrics without one.
    pub fn normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn authenticity_checker(mut self, checker: Arc<dyn AuthenticityChecker>) -> Self {
        self.checker = Some(checker);
        self
    }

    pub fn build(self) -> Result<GradingOrchestrator, GradingError> {
        let provider = self
            .provider
            .ok_or_else(|| GradingError::Configuration("No provider set".to_string()))?;
        self.config.validate()?;

        let mut orchestrator = GradingOrchestrator::new(provider, self.config);
        orchestrator.normalizer = self.normalizer;
        orchestrator.checker = self.checker;
        Ok(orchestrator)
    }
}

impl Default for GradingOrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
