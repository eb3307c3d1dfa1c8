//! Batch report for sequential multi-submission grading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gradewise_core::{ErrorReport, NormalizedGradeResult};

/// Outcome for one submission in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    /// File path or text preview of the submission
    pub submission: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<NormalizedGradeResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl BatchEntry {
    pub fn graded(submission: impl Into<String>, result: NormalizedGradeResult) -> Self {
        Self {
            submission: submission.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(submission: impl Into<String>, error: ErrorReport) -> Self {
        Self {
            submission: submission.into(),
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// All outcomes of a batch, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<BatchEntry>,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub generated_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn from_entries(results: Vec<BatchEntry>) -> Self {
        let succeeded = results.iter().filter(|e| e.is_success()).count();
        Self {
            total: results.len(),
            failed: results.len() - succeeded,
            succeeded,
            results,
            generated_at: Utc::now(),
        }
    }

    /// Number of successful results that are synthetic mock grades.
    pub fn mock_count(&self) -> usize {
        self.results
            .iter()
            .filter_map(|e| e.result.as_ref())
            .filter(|r| r.has_flag(gradewise_core::MOCK_GRADE_FLAG))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradewise_core::{mock_grade, Normalizer, RubricDescriptor};

    #[test]
    fn test_counts() {
        let rubric = RubricDescriptor::default_essay();
        let mocked = Normalizer::new().normalize(mock_grade(&rubric), &rubric);

        let report = BatchReport::from_entries(vec![
            BatchEntry::graded("a.txt", mocked),
            BatchEntry::failed("b.exe", ErrorReport::new("Unsupported file type: .exe")),
        ]);

        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.mock_count(), 1);

        let value = serde_json::to_value(&report).unwrap();
        assert!(value["results"][0].get("error").is_none());
        assert_eq!(value["results"][1]["error"]["error"], "Unsupported file type: .exe");
        assert!(value["generated_at"].is_string());
    }

    #[test]
    fn test_empty_batch() {
        let report = BatchReport::from_entries(Vec::new());
        assert_eq!(report.total, 0);
        assert_eq!(report.failed, 0);
    }
}
