//! Normalizer: turns a raw upstream result into the canonical report.
//!
//! Normalization never fails. The upstream output is untrusted, so every
//! field is defaulted rather than rejected, and the percentage is always
//! recomputed from the raw score.

use serde_json::Value;

use crate::result::{NormalizedGradeResult, RawGradeResult};
use crate::rubric::RubricDescriptor;
use crate::scale::GradingScale;

/// Applies the rubric's grading scale to raw results.
///
/// The fallback scale for rubrics that declare none is injected here
/// rather than read from a global.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    default_scale: GradingScale,
}

impl Normalizer {
    /// Normalizer whose fallback scale is numeric out of 10.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_scale(default_scale: GradingScale) -> Self {
        Self { default_scale }
    }

    pub fn default_scale(&self) -> &GradingScale {
        &self.default_scale
    }

    /// Normalize a raw result against a rubric.
    pub fn normalize(&self, raw: RawGradeResult, rubric: &RubricDescriptor) -> NormalizedGradeResult {
        let scale = rubric.resolved_scale(&self.default_scale);
        let raw_score = if raw.score_total.is_finite() {
            raw.score_total
        } else {
            0.0
        };
        let converted = scale.convert(raw_score);

        NormalizedGradeResult {
            score_total: converted.score_total,
            score_raw: converted.score_raw,
            percentage: converted.percentage,
            grade_letter: converted.grade_letter,
            pass_fail: converted.pass_fail,
            score_breakdown: raw.score_breakdown,
            rubric_checks: raw.rubric_checks,
            evidence_quotes: raw.evidence_quotes,
            feedback_short: raw.feedback_short,
            feedback_detailed: raw.feedback_detailed,
            flags: raw.flags,
            confidence: clamp_unit(raw.confidence),
            grading_time_seconds: raw.grading_time_seconds.max(0.0),
            grading_scale: scale,
            is_authentic: raw.is_authentic,
        }
    }

    /// Normalize an untyped JSON value (e.g. a previously serialized result).
    pub fn normalize_value(&self, value: &Value, rubric: &RubricDescriptor) -> NormalizedGradeResult {
        self.normalize(RawGradeResult::from_value(value), rubric)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::PassFail;
    use serde_json::json;

    const REQUIRED_KEYS: [&str; 14] = [
        "score_total",
        "score_raw",
        "percentage",
        "grade_letter",
        "pass_fail",
        "score_breakdown",
        "rubric_checks",
        "evidence_quotes",
        "feedback_short",
        "feedback_detailed",
        "flags",
        "confidence",
        "grading_time_seconds",
        "grading_scale",
    ];

    fn rubric_with_scale(scale: Value) -> RubricDescriptor {
        RubricDescriptor {
            grading_scale: Some(scale),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_has_all_keys() {
        let normalized = Normalizer::new().normalize_value(&json!({}), &RubricDescriptor::default());
        let value = serde_json::to_value(&normalized).unwrap();

        for key in REQUIRED_KEYS {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert!(value.get("is_authentic").is_none());
        assert_eq!(value["grade_letter"], Value::Null);
        assert_eq!(value["feedback_detailed"]["overall"], "");
        assert_eq!(normalized.score_total, 0.0);
        assert_eq!(normalized.grading_scale, GradingScale::numeric(10.0));
    }

    #[test]
    fn test_normalize_is_idempotent_on_its_own_output() {
        let rubric = rubric_with_scale(json!({"type": "numeric", "max_points": 10}));
        let normalizer = Normalizer::new();
        let first = normalizer.normalize_value(&json!({"score_total": 6, "confidence": 0.7}), &rubric);
        let second = normalizer.normalize_value(&serde_json::to_value(&first).unwrap(), &rubric);
        assert_eq!(first, second);
    }

    #[test]
    fn test_percentage_is_recomputed() {
        let normalized = Normalizer::new().normalize_value(
            &json!({"score_total": 8, "percentage": 12.0}),
            &RubricDescriptor::default(),
        );
        assert_eq!(normalized.percentage, 80.0);
        assert_eq!(normalized.score_total, 8.0);
    }

    #[test]
    fn test_letter_scale_applied() {
        let rubric = rubric_with_scale(json!({"type": "letter"}));
        let normalized = Normalizer::new().normalize_value(&json!({"score_total": 6.5}), &rubric);
        assert_eq!(normalized.grade_letter.as_deref(), Some("D"));
        assert_eq!(normalized.score_total, 6.5);
        assert_eq!(normalized.pass_fail, None);
        assert_eq!(normalized.grading_scale.kind(), "letter");
    }

    #[test]
    fn test_pass_fail_scale_applied() {
        let rubric = rubric_with_scale(json!({"type": "pass_fail", "passing_threshold": 70}));
        let normalized = Normalizer::new().normalize_value(&json!({"score_total": 9}), &rubric);
        assert_eq!(normalized.pass_fail, Some(PassFail::Pass));
        assert_eq!(normalized.percentage, 90.0);
    }

    #[test]
    fn test_injected_default_scale() {
        let normalizer = Normalizer::with_default_scale(GradingScale::numeric(100.0));
        let normalized = normalizer.normalize_value(&json!({"score_total": 7}), &RubricDescriptor::default());
        assert_eq!(normalized.score_total, 70.0);
        assert_eq!(normalizer.default_scale(), &GradingScale::numeric(100.0));
    }

    #[test]
    fn test_confidence_clamped() {
        let rubric = RubricDescriptor::default();
        let high = Normalizer::new().normalize_value(&json!({"confidence": 3}), &rubric);
        assert_eq!(high.confidence, 1.0);
        let low = Normalizer::new().normalize_value(&json!({"confidence": -0.5}), &rubric);
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_authenticity_carried_through() {
        let raw = RawGradeResult {
            is_authentic: Some(false),
            ..Default::default()
        };
        let normalized = Normalizer::new().normalize(raw, &RubricDescriptor::default());
        let value = serde_json::to_value(&normalized).unwrap();
        assert_eq!(value["is_authentic"], false);
    }

    #[test]
    fn test_infinite_max_points_string_keeps_numeric_output() {
        let rubric =
            RubricDescriptor::from_yaml("grading_scale:\n  type: numeric\n  max_points: \"inf\"\n").unwrap();
        let normalized = Normalizer::new().normalize_value(&json!({"score_total": 8}), &rubric);

        assert_eq!(normalized.score_total, 8.0);
        let value = serde_json::to_value(&normalized).unwrap();
        assert_eq!(value["score_total"], json!(8.0));
        assert_eq!(value["grading_scale"]["max_points"], json!(10.0));
    }
}
