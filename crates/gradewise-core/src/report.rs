//! Caller-facing report shapes.

use serde::{Deserialize, Serialize};

use crate::authenticity::AiDetection;
use crate::result::NormalizedGradeResult;

/// A user-visible failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorReport {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    /// The standard "Grading failed" report with a detail message.
    pub fn grading_failed(detail: impl Into<String>) -> Self {
        Self {
            error: "Grading failed".to_string(),
            detail: Some(detail.into()),
        }
    }
}

/// One criterion in the compact client report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCriterion {
    pub criteria_title: String,
    pub score: f64,
    pub score_max: f64,
    pub feedback: String,
}

/// Compact report consumed by the web client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientReport {
    pub name: String,
    pub overall_feedback: String,
    pub criteria_feedback: Vec<ClientCriterion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_detection: Option<AiDetection>,
}

impl ClientReport {
    /// Flatten a normalized result into the client shape.
    ///
    /// Per-criterion feedback prefers the detailed criterion feedback and
    /// falls back to the breakdown rationale.
    pub fn from_result(
        result: &NormalizedGradeResult,
        name: impl Into<String>,
        ai_detection: Option<AiDetection>,
    ) -> Self {
        let detailed = &result.feedback_detailed.criteria_feedback;

        let criteria_feedback = result
            .score_breakdown
            .iter()
            .map(|item| {
                let feedback = detailed
                    .iter()
                    .find(|cf| cf.criterion_id == item.criterion_id)
                    .map(|cf| cf.feedback.clone())
                    .unwrap_or_else(|| item.rationale.clone());

                ClientCriterion {
                    criteria_title: item.criterion_id.clone(),
                    score: item.points,
                    score_max: item.max_points,
                    feedback,
                }
            })
            .collect();

        Self {
            name: name.into(),
            overall_feedback: result.feedback_detailed.overall.clone(),
            criteria_feedback,
            ai_detection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;
    use crate::rubric::RubricDescriptor;
    use serde_json::json;

    #[test]
    fn test_error_report_shape() {
        let value = serde_json::to_value(ErrorReport::grading_failed("boom")).unwrap();
        assert_eq!(value, json!({"error": "Grading failed", "detail": "boom"}));

        let value = serde_json::to_value(ErrorReport::new("Unsupported file type: .exe")).unwrap();
        assert_eq!(value, json!({"error": "Unsupported file type: .exe"}));
    }

    #[test]
    fn test_client_report_prefers_detailed_feedback() {
        let result = Normalizer::new().normalize_value(
            &json!({
                "score_total": 7,
                "score_breakdown": [
                    {"criterion_id": "thesis", "points": 2, "max_points": 2, "rationale": "r1"},
                    {"criterion_id": "grammar", "points": 0.5, "max_points": 1, "rationale": "r2"}
                ],
                "feedback_detailed": {
                    "overall": "Good",
                    "criteria_feedback": [{"criterion_id": "thesis", "feedback": "Sharp thesis"}]
                }
            }),
            &RubricDescriptor::default(),
        );

        let report = ClientReport::from_result(&result, "Ada", None);
        assert_eq!(report.name, "Ada");
        assert_eq!(report.overall_feedback, "Good");
        assert_eq!(report.criteria_feedback[0].feedback, "Sharp thesis");
        assert_eq!(report.criteria_feedback[1].feedback, "r2");
        assert_eq!(report.criteria_feedback[1].score, 0.5);

        let value = serde_json::to_value(&report).unwrap();
        assert!(value.get("ai_detection").is_none());
    }
}
