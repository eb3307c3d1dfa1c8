//! Authenticity verdicts from an AI-text detection report.
//!
//! The detector itself is an external service; this module only maps its
//! report onto flags and an `authentic` decision.

use serde::{Deserialize, Serialize};

use crate::result::{Flag, RawGradeResult};

/// Probability above which text is considered AI-generated.
pub const AI_PROBABILITY_THRESHOLD: f64 = 0.5;

/// How decisive a detection score is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionConfidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl DetectionConfidence {
    /// Scores near 0 or 1 are decisive; scores near 0.5 are not.
    pub fn from_probability(p: f64) -> Self {
        if p > 0.8 || p < 0.2 {
            DetectionConfidence::High
        } else if p > 0.6 || p < 0.4 {
            DetectionConfidence::Medium
        } else {
            DetectionConfidence::Low
        }
    }
}

/// Report from an AI-text detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiDetection {
    pub is_ai_generated: bool,
    pub ai_probability: f64,
    pub confidence: DetectionConfidence,
    #[serde(default)]
    pub sentence_scores: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiDetection {
    /// Build a report from a raw detector probability.
    pub fn from_probability(ai_probability: f64, sentence_scores: Vec<f64>) -> Self {
        let rounded = (ai_probability * 10_000.0).round() / 10_000.0;
        Self {
            is_ai_generated: ai_probability > AI_PROBABILITY_THRESHOLD,
            ai_probability: rounded,
            confidence: DetectionConfidence::from_probability(ai_probability),
            sentence_scores,
            error: None,
        }
    }

    /// A failed detection; never counts as AI-generated.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            is_ai_generated: false,
            ai_probability: 0.0,
            confidence: DetectionConfidence::Unknown,
            sentence_scores: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Outcome of an authenticity check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticityVerdict {
    pub authentic: bool,
    pub flags: Vec<Flag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_detection: Option<AiDetection>,
}

impl AuthenticityVerdict {
    /// Map a detection report onto a verdict.
    ///
    /// A failed detection is reported as a low-severity flag and the text
    /// is treated as authentic.
    pub fn from_detection(detection: AiDetection) -> Self {
        let mut flags = Vec::new();
        let mut authentic = true;

        if let Some(error) = &detection.error {
            flags.push(
                Flag::new("AI_DETECTION_ERROR", format!("AI detection failed: {}", error))
                    .with_severity("low"),
            );
        } else if detection.is_ai_generated {
            authentic = false;
            let p = detection.ai_probability;
            let flag = match detection.confidence {
                DetectionConfidence::High => Flag::new(
                    "AI_GENERATED_HIGH",
                    format!("High confidence (AI probability: {}) that this essay was AI-generated", p),
                )
                .with_severity("high"),
                DetectionConfidence::Medium => Flag::new(
                    "AI_GENERATED_MEDIUM",
                    format!("Medium confidence (AI probability: {}) that this essay may be AI-generated", p),
                )
                .with_severity("medium"),
                DetectionConfidence::Low | DetectionConfidence::Unknown => Flag::new(
                    "AI_SUSPECTED",
                    format!("Low confidence (AI probability: {}) that this essay may be AI-generated", p),
                )
                .with_severity("low"),
            };
            flags.push(flag);
        }

        Self {
            authentic,
            flags,
            ai_detection: Some(detection),
        }
    }

    /// Merge this verdict into a result: append flags, set `is_authentic`.
    pub fn apply_to(&self, result: &mut RawGradeResult) {
        result.flags.extend(self.flags.iter().cloned());
        result.is_authentic = Some(self.authentic);
    }
}
