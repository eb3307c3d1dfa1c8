//! Fallback when the upstream stays unavailable after retries.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// HTTP 429, the quota status name, or "rate limit" in any case.
    static ref RATE_LIMIT_SIGNATURE: Regex =
        Regex::new(r"429|RESOURCE_EXHAUSTED|(?i:rate limit)").unwrap();
}

/// What to do when the final attempt failed with a rate-limit error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Substitute the deterministic mock grade, flagged `MOCK_GRADE`
    #[default]
    MockGrade,

    /// Surface the error to the caller
    Fail,
}

impl FallbackStrategy {
    pub fn substitutes_mock(&self) -> bool {
        matches!(self, FallbackStrategy::MockGrade)
    }
}

/// True when an error message looks like an upstream quota/rate-limit error.
pub fn matches_rate_limit_signature(message: &str) -> bool {
    RATE_LIMIT_SIGNATURE.is_match(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rate_limit_signatures() {
        assert!(matches_rate_limit_signature("HTTP 429 Too Many Requests"));
        assert!(matches_rate_limit_signature("status: RESOURCE_EXHAUSTED"));
        assert!(matches_rate_limit_signature("Rate Limit exceeded for project"));
        assert!(matches_rate_limit_signature("hit the rate limit"));

        assert!(!matches_rate_limit_signature("connection reset by peer"));
        assert!(!matches_rate_limit_signature("resource_exhausted"));
        assert!(!matches_rate_limit_signature("ratelimited"));
    }

    #[test]
    fn test_strategy_serde() {
        let strategy: FallbackStrategy = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(strategy, FallbackStrategy::Fail);
        assert!(!strategy.substitutes_mock());

        assert_eq!(
            serde_json::to_string(&FallbackStrategy::default()).unwrap(),
            "\"mock_grade\""
        );
        assert!(FallbackStrategy::MockGrade.substitutes_mock());
    }

    proptest! {
        #[test]
        fn prop_status_429_always_matches(prefix in "[a-z ]{0,20}", suffix in "[a-z ]{0,20}") {
            let message = format!("{}429{}", prefix, suffix);
            prop_assert!(matches_rate_limit_signature(&message));
        }

        #[test]
        fn prop_lowercase_letters_never_match(message in "[a-qs-z ]{0,40}") {
            prop_assert!(!matches_rate_limit_signature(&message));
        }
    }
}
