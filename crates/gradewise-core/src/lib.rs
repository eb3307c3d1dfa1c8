//! # gradewise-core
//!
//! Deterministic post-processing of model-generated grading output.
//!
//! This crate turns the free-text reply of a generative model into a
//! stable grading report:
//! - recovers a JSON object from prose or markdown ([`extract_json`])
//! - reads it field by field into a [`RawGradeResult`]
//! - converts the raw 0-10 score onto the rubric's [`GradingScale`]
//! - produces the canonical [`NormalizedGradeResult`]
//!
//! Nothing here performs I/O against the model; see `gradewise-runtime`.
//!
//! ## Example
//!
//! ```rust
//! use gradewise_core::{normalize_response, RubricDescriptor};
//!
//! let reply = "Here is the result:\n```json\n{\"score_total\": 8}\n```";
//! let report = normalize_response(reply, &RubricDescriptor::default_essay()).unwrap();
//!
//! assert_eq!(report.percentage, 80.0);
//! assert_eq!(report.score_total, 8.0);
//! ```

pub mod authenticity;
pub mod extract;
mod lenient;
pub mod mock;
pub mod normalize;
pub mod report;
pub mod result;
pub mod rubric;
pub mod scale;

pub use authenticity::{AiDetection, AuthenticityVerdict, DetectionConfidence};
pub use extract::{extract_json, ExtractionError};
pub use mock::{mock_grade, MOCK_GRADE_FLAG};
pub use normalize::Normalizer;
pub use report::{ClientCriterion, ClientReport, ErrorReport};
pub use result::{
    CriterionFeedback, FeedbackDetailed, Flag, GrammarIssue, NormalizedGradeResult,
    RawGradeResult, RubricCheck, ScoreBreakdownItem,
};
pub use rubric::{Criterion, RubricDescriptor, RubricError};
pub use scale::{GradingScale, LetterBoundaries, PassFail, ScoreConversion};

/// Extract, parse and normalize a model reply in one step.
///
/// Uses the default numeric/10 fallback scale and assumes 0.85 confidence
/// when the reply reports none.
pub fn normalize_response(
    content: &str,
    rubric: &RubricDescriptor,
) -> Result<NormalizedGradeResult, ExtractionError> {
    let value = extract_json(content)?;
    let raw = RawGradeResult::from_upstream(&value);
    Ok(Normalizer::new().normalize(raw, rubric))
}
