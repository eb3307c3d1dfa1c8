//! Grading result types.
//!
//! [`RawGradeResult`] is what the upstream model returned, read field by
//! field. [`NormalizedGradeResult`] is the stable JSON contract handed to
//! clients; its field names and presence must not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::lenient;
use crate::scale::{GradingScale, PassFail};

/// Confidence assumed when the model does not report one.
pub const UPSTREAM_DEFAULT_CONFIDENCE: f64 = 0.85;

/// Points awarded for one rubric criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoreBreakdownItem {
    pub criterion_id: String,
    pub points: f64,
    pub max_points: f64,
    /// Why this score was given
    pub rationale: String,
}

impl ScoreBreakdownItem {
    fn from_map(obj: &Map<String, Value>) -> Self {
        Self {
            criterion_id: lenient::text(obj, "criterion_id"),
            points: lenient::number_or(obj, "points", 0.0),
            max_points: lenient::number_or(obj, "max_points", 0.0),
            rationale: lenient::text(obj, "rationale"),
        }
    }
}

/// Whether a criterion was met, with a supporting quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RubricCheck {
    pub criterion_id: String,
    pub met: bool,
    pub evidence_quote: String,
}

impl RubricCheck {
    fn from_map(obj: &Map<String, Value>) -> Self {
        Self {
            criterion_id: lenient::text(obj, "criterion_id"),
            met: lenient::boolean(obj, "met"),
            evidence_quote: lenient::text(obj, "evidence_quote"),
        }
    }
}

/// Per-criterion feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CriterionFeedback {
    pub criterion_id: String,
    /// "met", "partial" or "not_met"
    pub status: String,
    pub feedback: String,
    pub how_to_improve: Option<String>,
}

impl CriterionFeedback {
    fn from_map(obj: &Map<String, Value>) -> Self {
        Self {
            criterion_id: lenient::text(obj, "criterion_id"),
            status: lenient::text(obj, "status"),
            feedback: lenient::text(obj, "feedback"),
            how_to_improve: lenient::optional_text(obj, "how_to_improve"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GrammarIssue {
    pub location: String,
    pub original: String,
    pub correction: String,
    pub rule: String,
}

impl GrammarIssue {
    fn from_map(obj: &Map<String, Value>) -> Self {
        Self {
            location: lenient::text(obj, "location"),
            original: lenient::text(obj, "original"),
            correction: lenient::text(obj, "correction"),
            rule: lenient::text(obj, "rule"),
        }
    }
}

/// Long-form feedback block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FeedbackDetailed {
    pub overall: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub criteria_feedback: Vec<CriterionFeedback>,
    pub grammar_issues: Vec<GrammarIssue>,
    pub suggestions: Vec<String>,
}

impl FeedbackDetailed {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(obj) = value.and_then(Value::as_object) else {
            return Self::default();
        };

        Self {
            overall: lenient::text(obj, "overall"),
            strengths: lenient::text_list(obj, "strengths"),
            weaknesses: lenient::text_list(obj, "weaknesses"),
            criteria_feedback: lenient::object_list(obj, "criteria_feedback", CriterionFeedback::from_map),
            grammar_issues: lenient::object_list(obj, "grammar_issues", GrammarIssue::from_map),
            suggestions: lenient::text_list(obj, "suggestions"),
        }
    }
}

/// A machine-readable note attached to a result (e.g. `MOCK_GRADE`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Flag {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

impl Flag {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: None,
        }
    }

    pub fn with_severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    fn from_map(obj: &Map<String, Value>) -> Self {
        Self {
            code: lenient::text(obj, "code"),
            message: lenient::text(obj, "message"),
            severity: lenient::optional_text(obj, "severity"),
        }
    }
}

/// A grading result as produced by the upstream model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawGradeResult {
    /// Raw score on the 0-10 scale
    pub score_total: f64,
    pub score_breakdown: Vec<ScoreBreakdownItem>,
    pub rubric_checks: Vec<RubricCheck>,
    pub evidence_quotes: Vec<String>,
    pub feedback_short: String,
    pub feedback_detailed: FeedbackDetailed,
    pub flags: Vec<Flag>,
    /// Model confidence (0.0 - 1.0)
    pub confidence: f64,
    /// Wall-clock time spent grading, stamped by the runtime
    pub grading_time_seconds: f64,
    /// Set only when an authenticity check ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_authentic: Option<bool>,
}

impl RawGradeResult {
    /// Read a result from an arbitrary JSON value.
    ///
    /// Never fails: missing or malformed fields become empty strings, empty
    /// lists, or zero.
    pub fn from_value(value: &Value) -> Self {
        let empty = Map::new();
        let obj = value.as_object().unwrap_or(&empty);

        Self {
            score_total: lenient::number_or(obj, "score_total", 0.0),
            score_breakdown: lenient::object_list(obj, "score_breakdown", ScoreBreakdownItem::from_map),
            rubric_checks: lenient::object_list(obj, "rubric_checks", RubricCheck::from_map),
            evidence_quotes: lenient::text_list(obj, "evidence_quotes"),
            feedback_short: lenient::text(obj, "feedback_short"),
            feedback_detailed: FeedbackDetailed::from_value(obj.get("feedback_detailed")),
            flags: lenient::object_list(obj, "flags", Flag::from_map),
            confidence: lenient::number_or(obj, "confidence", 0.0),
            grading_time_seconds: lenient::number_or(obj, "grading_time_seconds", 0.0),
            is_authentic: match obj.get("is_authentic") {
                Some(Value::Bool(b)) => Some(*b),
                _ => None,
            },
        }
    }

    /// Read a model response, assuming 0.85 confidence when none is reported.
    pub fn from_upstream(value: &Value) -> Self {
        let mut result = Self::from_value(value);
        if lenient_confidence_missing(value) {
            result.confidence = UPSTREAM_DEFAULT_CONFIDENCE;
        }
        result
    }

    /// True when any flag carries `code`.
    pub fn has_flag(&self, code: &str) -> bool {
        self.flags.iter().any(|f| f.code == code)
    }
}

fn lenient_confidence_missing(value: &Value) -> bool {
    value
        .as_object()
        .map_or(true, |obj| lenient::number(obj, "confidence").is_none())
}

/// The canonical grading report returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedGradeResult {
    /// Score expressed in the target scale
    pub score_total: f64,

    /// Raw 0-10 score from the model
    pub score_raw: f64,

    /// score_raw / 10 * 100, rounded to two decimals
    pub percentage: f64,

    pub grade_letter: Option<String>,

    pub pass_fail: Option<PassFail>,

    pub score_breakdown: Vec<ScoreBreakdownItem>,

    pub rubric_checks: Vec<RubricCheck>,

    pub evidence_quotes: Vec<String>,

    pub feedback_short: String,

    pub feedback_detailed: FeedbackDetailed,

    pub flags: Vec<Flag>,

    pub confidence: f64,

    pub grading_time_seconds: f64,

    /// The scale that was applied
    pub grading_scale: GradingScale,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_authentic: Option<bool>,
}

impl NormalizedGradeResult {
    pub fn has_flag(&self, code: &str) -> bool {
        self.flags.iter().any(|f| f.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value_full() {
        let value = json!({
            "score_total": 7.5,
            "score_breakdown": [
                {"criterion_id": "thesis", "points": 2, "max_points": 2, "rationale": "Clear"}
            ],
            "rubric_checks": [
                {"criterion_id": "thesis", "met": true, "evidence_quote": "I argue"}
            ],
            "evidence_quotes": ["I argue"],
            "feedback_short": "Good work.",
            "feedback_detailed": {
                "overall": "Solid essay.",
                "strengths": ["thesis"],
                "weaknesses": [],
                "criteria_feedback": [
                    {"criterion_id": "thesis", "status": "met", "feedback": "Nice", "how_to_improve": null}
                ],
                "grammar_issues": [
                    {"location": "p1", "original": "teh", "correction": "the", "rule": "spelling"}
                ],
                "suggestions": ["Add sources"]
            },
            "flags": [{"code": "LOW_EVIDENCE", "message": "Few quotes"}],
            "confidence": 0.9
        });

        let raw = RawGradeResult::from_value(&value);
        assert_eq!(raw.score_total, 7.5);
        assert_eq!(raw.score_breakdown[0].points, 2.0);
        assert!(raw.rubric_checks[0].met);
        assert_eq!(raw.feedback_detailed.criteria_feedback[0].how_to_improve, None);
        assert_eq!(raw.feedback_detailed.grammar_issues[0].correction, "the");
        assert!(raw.has_flag("LOW_EVIDENCE"));
        assert_eq!(raw.confidence, 0.9);
    }

    #[test]
    fn test_from_value_empty_object() {
        let raw = RawGradeResult::from_value(&json!({}));
        assert_eq!(raw, RawGradeResult::default());
    }

    #[test]
    fn test_from_value_wrong_shapes() {
        let raw = RawGradeResult::from_value(&json!({
            "score_total": "6",
            "feedback_detailed": "just a string",
            "flags": "none",
            "score_breakdown": [null, {"criterion_id": 3, "points": "1.5"}]
        }));
        assert_eq!(raw.score_total, 6.0);
        assert_eq!(raw.feedback_detailed, FeedbackDetailed::default());
        assert!(raw.flags.is_empty());
        assert_eq!(raw.score_breakdown.len(), 1);
        assert_eq!(raw.score_breakdown[0].criterion_id, "3");
        assert_eq!(raw.score_breakdown[0].points, 1.5);
    }

    #[test]
    fn test_from_upstream_default_confidence() {
        let raw = RawGradeResult::from_upstream(&json!({"score_total": 5}));
        assert_eq!(raw.confidence, UPSTREAM_DEFAULT_CONFIDENCE);

        let raw = RawGradeResult::from_upstream(&json!({"confidence": 0.4}));
        assert_eq!(raw.confidence, 0.4);
    }

    #[test]
    fn test_flag_severity_omitted_when_absent() {
        let value = serde_json::to_value(Flag::new("MOCK_GRADE", "mock")).unwrap();
        assert_eq!(value, json!({"code": "MOCK_GRADE", "message": "mock"}));

        let value = serde_json::to_value(Flag::new("X", "y").with_severity("high")).unwrap();
        assert_eq!(value["severity"], "high");
    }
}
