//! JSON Schema validation for rubrics.
//!
//! Rubrics loaded from files are validated against `schema/rubric.schema.json`
//! before they are deserialized.

use std::sync::OnceLock;

/// Embedded rubric schema (loaded at compile time).
const RUBRIC_SCHEMA_JSON: &str = include_str!("../../schema/rubric.schema.json");

/// Compiled JSON Schema validator (initialized once, reused).
static COMPILED_SCHEMA: OnceLock<Result<jsonschema::Validator, String>> = OnceLock::new();

fn get_validator() -> Result<&'static jsonschema::Validator, String> {
    let result = COMPILED_SCHEMA.get_or_init(|| {
        let schema_value: serde_json::Value = serde_json::from_str(RUBRIC_SCHEMA_JSON)
            .map_err(|e| format!("Invalid schema JSON: {}", e))?;

        jsonschema::options()
            .build(&schema_value)
            .map_err(|e| format!("Failed to compile schema: {}", e))
    });

    result.as_ref().map_err(Clone::clone)
}

/// Validate a rubric JSON value against the schema.
///
/// Returns every violation as `"<message> at <instance path>"`.
pub fn validate_rubric_schema(rubric_json: &serde_json::Value) -> Result<(), Vec<String>> {
    let validator = get_validator().map_err(|e| vec![e])?;

    let errors: Vec<String> = validator
        .iter_errors(rubric_json)
        .map(|e| format!("{} at {}", e, e.instance_path))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_rubric_passes_schema() {
        let value = json!({
            "type": "ESSAY",
            "grading_scale": {"type": "letter"},
            "criteria": [
                {"id": "thesis", "name": "Thesis", "max_points": 2, "description": "Clear claim."}
            ],
            "must_quote_evidence": true,
            "max_evidence_quotes": 3
        });
        assert!(validate_rubric_schema(&value).is_ok());
    }

    #[test]
    fn test_empty_mapping_is_valid() {
        assert!(validate_rubric_schema(&json!({})).is_ok());
    }

    #[test]
    fn test_criterion_without_id_fails() {
        let value = json!({"criteria": [{"name": "Thesis", "max_points": 2}]});
        let errors = validate_rubric_schema(&value).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors[0].contains("/criteria/0"));
    }

    #[test]
    fn test_negative_points_fail() {
        let value = json!({"criteria": [{"id": "a", "max_points": -1}]});
        assert!(validate_rubric_schema(&value).is_err());
    }

    #[test]
    fn test_non_object_fails() {
        assert!(validate_rubric_schema(&json!(["not", "a", "rubric"])).is_err());
    }
}
