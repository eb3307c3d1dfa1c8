//! Rubric parsing from YAML/JSON and grading-scale resolution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_rubric_schema;
use crate::scale::{GradingScale, DEFAULT_MAX_POINTS, DEFAULT_PASSING_THRESHOLD};

/// Errors that can occur when loading rubrics.
#[derive(Error, Debug)]
pub enum RubricError {
    #[error("Failed to read rubric file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Rubric validation failed: {0}")]
    ValidationError(String),
}

/// A single grading criterion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Stable identifier echoed back by the model (e.g., "thesis")
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Points available for this criterion; 1 when omitted
    #[serde(default = "default_criterion_points")]
    pub max_points: f64,

    #[serde(default)]
    pub description: String,
}

fn default_criterion_points() -> f64 {
    1.0
}

impl Criterion {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        max_points: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            max_points,
            description: description.into(),
        }
    }

    /// The name, or the id when no name was given.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// A grading rubric as supplied by the caller.
///
/// The scale may be given in the current form (`grading_scale` with a
/// `type` key) or in the legacy form (`grading_scale_type` plus
/// `scale_total` / `pass_threshold`). Use [`RubricDescriptor::resolved_scale`]
/// to get the scale that conversion should apply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RubricDescriptor {
    /// Rubric kind, e.g. "ESSAY"
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Scale descriptor mapping, current form
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_scale: Option<Value>,

    /// Legacy scale tag: "points", "pass_fail" or "letter_grade"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_scale_type: Option<String>,

    /// Legacy `max_points` for the "points" scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_total: Option<f64>,

    /// Legacy threshold for the "pass_fail" scale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_threshold: Option<f64>,

    #[serde(default)]
    pub criteria: Vec<Criterion>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub must_quote_evidence: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_evidence_quotes: Option<u32>,
}

impl RubricDescriptor {
    /// The built-in essay rubric, worth 10 points on a numeric scale.
    pub fn default_essay() -> Self {
        Self {
            kind: Some("ESSAY".to_string()),
            grading_scale: Some(GradingScale::default().to_descriptor()),
            grading_scale_type: None,
            scale_total: None,
            pass_threshold: None,
            criteria: vec![
                Criterion::new("thesis", "Thesis/Claim", 2.0, "Clear, specific main claim."),
                Criterion::new(
                    "evidence",
                    "Evidence/Support",
                    3.0,
                    "Uses relevant evidence/examples and explains them.",
                ),
                Criterion::new("organization", "Organization", 2.0, "Logical flow; clear structure."),
                Criterion::new("clarity", "Clarity", 2.0, "Clear wording; minimal ambiguity."),
                Criterion::new("grammar", "Grammar/Mechanics", 1.0, "Few grammar/spelling errors."),
            ],
            must_quote_evidence: Some(true),
            max_evidence_quotes: Some(3),
        }
    }

    /// Parse a rubric from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, RubricError> {
        let value: Value = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a rubric from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, RubricError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a rubric from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse a rubric from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse a rubric file, choosing the format from its extension.
    ///
    /// `.json` is read as JSON, everything else as YAML (a superset).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RubricError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_file(path)
        } else {
            Self::from_yaml_file(path)
        }
    }

    /// Validate a JSON value against the schema and deserialize it.
    pub fn from_value(value: Value) -> Result<Self, RubricError> {
        validate_rubric_schema(&value)
            .map_err(|errors| RubricError::ValidationError(errors.join("; ")))?;

        let rubric: RubricDescriptor = serde_json::from_value(value)?;
        rubric.validate()?;
        Ok(rubric)
    }

    fn validate(&self) -> Result<(), RubricError> {
        let mut seen = std::collections::HashSet::new();
        for criterion in &self.criteria {
            if !seen.insert(criterion.id.as_str()) {
                return Err(RubricError::ValidationError(format!(
                    "Duplicate criterion ID: {}",
                    criterion.id
                )));
            }
        }
        Ok(())
    }

    /// Resolve the grading scale, migrating the legacy form when needed.
    ///
    /// - No `grading_scale` at all: `default_scale`.
    /// - `grading_scale` with a `type` key: read as-is.
    /// - `grading_scale` without `type`: migrate from `grading_scale_type`
    ///   (`points`, `pass_fail`, `letter_grade`); any other legacy tag
    ///   falls through to a numeric scale read from the type-less mapping.
    pub fn resolved_scale(&self, default_scale: &GradingScale) -> GradingScale {
        let Some(descriptor) = &self.grading_scale else {
            return default_scale.clone();
        };

        if !descriptor.is_object() {
            tracing::debug!(?descriptor, "grading_scale is not a mapping, using default");
            return default_scale.clone();
        }

        if descriptor.get("type").is_some() {
            return GradingScale::from_descriptor(descriptor);
        }

        let legacy = self.grading_scale_type.as_deref().unwrap_or("numeric");
        let migrated = match legacy {
            "points" => Some(GradingScale::numeric(
                self.scale_total.unwrap_or(DEFAULT_MAX_POINTS),
            )),
            "pass_fail" => Some(GradingScale::pass_fail(
                self.pass_threshold.unwrap_or(DEFAULT_PASSING_THRESHOLD),
            )),
            "letter_grade" => Some(GradingScale::letter()),
            _ => None,
        };

        match migrated {
            Some(scale) => {
                tracing::debug!(legacy, scale = scale.kind(), "migrated legacy grading scale");
                scale
            }
            None => GradingScale::from_descriptor(descriptor),
        }
    }

    /// Sum of `max_points` over all criteria.
    pub fn total_points(&self) -> f64 {
        self.criteria.iter().map(|c| c.max_points).sum()
    }
}
