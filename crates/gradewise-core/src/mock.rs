//! Deterministic stand-in result for when the upstream is rate-limited.
//!
//! The mock always carries a `MOCK_GRADE` flag and zero confidence.
//! Callers must check the flag before trusting the score.

use crate::result::{
    CriterionFeedback, FeedbackDetailed, Flag, RawGradeResult, ScoreBreakdownItem,
};
use crate::rubric::RubricDescriptor;

/// Flag code marking a synthetic grade.
pub const MOCK_GRADE_FLAG: &str = "MOCK_GRADE";

const RATE_LIMIT_NOTE: &str = "This is a mock response due to API rate limit.";

/// Build the mock result for a rubric.
///
/// Each criterion is awarded one point below its maximum (never negative).
pub fn mock_grade(rubric: &RubricDescriptor) -> RawGradeResult {
    let mut score_breakdown = Vec::with_capacity(rubric.criteria.len());
    let mut criteria_feedback = Vec::with_capacity(rubric.criteria.len());

    for criterion in &rubric.criteria {
        let name = criterion.display_name();
        let points = (criterion.max_points - 1.0).max(0.0);

        score_breakdown.push(ScoreBreakdownItem {
            criterion_id: criterion.id.clone(),
            points,
            max_points: criterion.max_points,
            rationale: format!("Mock grade for {}", name),
        });

        criteria_feedback.push(CriterionFeedback {
            criterion_id: criterion.id.clone(),
            status: if points < criterion.max_points { "partial" } else { "met" }.to_string(),
            feedback: format!("Mock feedback for {}", name),
            how_to_improve: Some(RATE_LIMIT_NOTE.to_string()),
        });
    }

    RawGradeResult {
        score_total: score_breakdown.iter().map(|item| item.points).sum(),
        score_breakdown,
        rubric_checks: Vec::new(),
        evidence_quotes: Vec::new(),
        feedback_short: "This is a mock grade due to API rate limit.".to_string(),
        feedback_detailed: FeedbackDetailed {
            overall: "Mock grade - API rate limit exceeded. Please try again later.".to_string(),
            strengths: vec!["Unable to assess due to rate limit".to_string()],
            weaknesses: vec!["Unable to assess due to rate limit".to_string()],
            criteria_feedback,
            grammar_issues: Vec::new(),
            suggestions: vec!["Wait for rate limit to reset".to_string()],
        },
        flags: vec![Flag::new(MOCK_GRADE_FLAG, "Mock grade due to API rate limit")],
        confidence: 0.0,
        grading_time_seconds: 0.0,
        is_authentic: None,
    }
}
