//! Seam for an external AI-text detector.
//!
//! The detector is someone else's service. The orchestrator only needs a
//! probability for a piece of text; the mapping to flags lives in
//! `gradewise_core::authenticity`.

use async_trait::async_trait;
use thiserror::Error;

use gradewise_core::{AiDetection, AuthenticityVerdict};

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detector unavailable: {0}")]
    Unavailable(String),

    #[error("Detector returned an invalid response: {0}")]
    InvalidResponse(String),
}

/// An AI-generated-text detector.
#[async_trait]
pub trait AuthenticityChecker: Send + Sync {
    /// Score `text`; errors are turned into a low-severity flag by the caller.
    async fn detect(&self, text: &str) -> Result<AiDetection, DetectorError>;

    fn name(&self) -> &str;
}

/// Run a checker and map its report to a verdict. Never fails.
pub async fn check_authenticity(checker: &dyn AuthenticityChecker, text: &str) -> AuthenticityVerdict {
    let detection = match checker.detect(text).await {
        Ok(detection) => detection,
        Err(e) => {
            tracing::warn!(checker = checker.name(), error = %e, "Authenticity check failed");
            AiDetection::failed(e.to_string())
        }
    };

    AuthenticityVerdict::from_detection(detection)
}
