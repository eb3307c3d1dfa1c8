//! Field readers for untrusted JSON.
//!
//! Each reader returns a default instead of failing, so one malformed field
//! never discards the rest of an upstream response.

use serde_json::{Map, Value};

use crate::scale::as_number;

pub(crate) fn number(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(as_number)
}

pub(crate) fn number_or(obj: &Map<String, Value>, key: &str, default: f64) -> f64 {
    number(obj, key).unwrap_or(default)
}

/// Any scalar is accepted and rendered as text; null and missing give "".
pub(crate) fn text(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key).map(scalar_text).unwrap_or_default()
}

pub(crate) fn optional_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key) {
        None | Some(Value::Null) => None,
        Some(v) => Some(scalar_text(v)),
    }
}

pub(crate) fn boolean(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        _ => false,
    }
}

/// A list of strings; non-array values give an empty list, nulls are dropped.
pub(crate) fn text_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(scalar_text)
            .collect(),
        _ => Vec::new(),
    }
}

/// A list of objects, each parsed by `parse`; non-object items are dropped.
pub(crate) fn object_list<T>(
    obj: &Map<String, Value>,
    key: &str,
    parse: impl Fn(&Map<String, Value>) -> T,
) -> Vec<T> {
    match obj.get(key) {
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).map(parse).collect(),
        _ => Vec::new(),
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_number_accepts_strings() {
        let obj = map(json!({"a": 3, "b": "4.5", "c": "x", "d": null}));
        assert_eq!(number(&obj, "a"), Some(3.0));
        assert_eq!(number(&obj, "b"), Some(4.5));
        assert_eq!(number(&obj, "c"), None);
        assert_eq!(number_or(&obj, "d", 1.0), 1.0);
    }

    #[test]
    fn test_text_renders_scalars() {
        let obj = map(json!({"s": "hi", "n": 3, "b": true, "z": null}));
        assert_eq!(text(&obj, "s"), "hi");
        assert_eq!(text(&obj, "n"), "3");
        assert_eq!(text(&obj, "b"), "true");
        assert_eq!(text(&obj, "z"), "");
        assert_eq!(text(&obj, "missing"), "");
        assert_eq!(optional_text(&obj, "z"), None);
    }

    #[test]
    fn test_lists_drop_garbage() {
        let obj = map(json!({
            "quotes": ["a", null, 2],
            "items": [{"k": 1}, "junk", {"k": 2}],
            "wrong": "not a list"
        }));
        assert_eq!(text_list(&obj, "quotes"), vec!["a", "2"]);
        assert_eq!(object_list(&obj, "items", |o| number_or(o, "k", 0.0)), vec![1.0, 2.0]);
        assert!(text_list(&obj, "wrong").is_empty());
    }

    #[test]
    fn test_boolean_variants() {
        let obj = map(json!({"a": true, "b": "Yes", "c": 0, "d": "no"}));
        assert!(boolean(&obj, "a"));
        assert!(boolean(&obj, "b"));
        assert!(!boolean(&obj, "c"));
        assert!(!boolean(&obj, "d"));
    }
}
