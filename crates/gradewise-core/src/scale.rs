//! Grading scales and raw-score conversion.
//!
//! The upstream model always scores on a 0-10 scale. A [`GradingScale`]
//! re-expresses that raw score as points, a letter grade, or pass/fail.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value};

/// Maximum of the raw score produced by the model.
pub const RAW_SCORE_MAX: f64 = 10.0;

/// Default `max_points` for the numeric scale.
pub const DEFAULT_MAX_POINTS: f64 = 10.0;

/// Default pass threshold, in percent.
pub const DEFAULT_PASSING_THRESHOLD: f64 = 70.0;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Letter grade floors, keyed by letter, valued by minimum percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LetterBoundaries(BTreeMap<String, f64>);

impl LetterBoundaries {
    /// The standard plus/minus table, with an `F` floor at 0.
    pub fn standard() -> Self {
        let table = [
            ("A", 93.0),
            ("A-", 90.0),
            ("B+", 87.0),
            ("B", 83.0),
            ("B-", 80.0),
            ("C+", 77.0),
            ("C", 73.0),
            ("C-", 70.0),
            ("D+", 67.0),
            ("D", 63.0),
            ("D-", 60.0),
            ("F", 0.0),
        ];
        Self(
            table
                .into_iter()
                .map(|(letter, floor)| (letter.to_string(), floor))
                .collect(),
        )
    }

    /// Build from arbitrary `(letter, floor)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self(pairs.into_iter().map(|(l, f)| (l.into(), f)).collect())
    }

    /// Entries sorted by floor, highest first. Ties keep letter order.
    pub fn descending(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<(&str, f64)> =
            self.0.iter().map(|(l, f)| (l.as_str(), *f)).collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        entries
    }

    /// First letter whose floor is at or below `percentage`, else `F`.
    pub fn letter_for(&self, percentage: f64) -> String {
        self.descending()
            .into_iter()
            .find(|(_, floor)| percentage >= *floor)
            .map(|(letter, _)| letter.to_string())
            .unwrap_or_else(|| "F".to_string())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for LetterBoundaries {
    fn default() -> Self {
        Self::standard()
    }
}

/// Pass/fail outcome, serialized as `"P"` / `"F"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassFail {
    #[serde(rename = "P")]
    Pass,
    #[serde(rename = "F")]
    Fail,
}

impl fmt::Display for PassFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassFail::Pass => write!(f, "P"),
            PassFail::Fail => write!(f, "F"),
        }
    }
}

/// The representation a final score is expressed in.
///
/// Serialized as a tagged mapping (`{"type": "numeric", "max_points": 10}`).
/// Deserialization never fails on a mapping: unknown `type` values become
/// [`GradingScale::Unrecognized`] and missing parameters take their defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum GradingScale {
    Numeric { max_points: f64 },
    Letter { boundaries: LetterBoundaries },
    PassFail { passing_threshold: f64 },
    /// A scale type this crate does not know; conversion passes the raw score through.
    Unrecognized { kind: String },
}

impl Default for GradingScale {
    fn default() -> Self {
        GradingScale::Numeric {
            max_points: DEFAULT_MAX_POINTS,
        }
    }
}

impl GradingScale {
    pub fn numeric(max_points: f64) -> Self {
        GradingScale::Numeric { max_points }
    }

    /// Letter scale with the standard boundary table.
    pub fn letter() -> Self {
        GradingScale::Letter {
            boundaries: LetterBoundaries::standard(),
        }
    }

    pub fn pass_fail(passing_threshold: f64) -> Self {
        GradingScale::PassFail { passing_threshold }
    }

    /// Wire name of the scale type.
    pub fn kind(&self) -> &str {
        match self {
            GradingScale::Numeric { .. } => "numeric",
            GradingScale::Letter { .. } => "letter",
            GradingScale::PassFail { .. } => "pass_fail",
            GradingScale::Unrecognized { kind } => kind,
        }
    }

    /// Read a scale from a descriptor mapping that carries a `type` key.
    ///
    /// A mapping without `type` is treated as numeric, which is the
    /// historical default.
    pub fn from_descriptor(descriptor: &Value) -> Self {
        let kind = descriptor
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("numeric");

        match kind {
            "numeric" => GradingScale::Numeric {
                max_points: number_field(descriptor, "max_points").unwrap_or(DEFAULT_MAX_POINTS),
            },
            "letter" => GradingScale::Letter {
                boundaries: descriptor
                    .get("boundaries")
                    .and_then(boundaries_from_value)
                    .unwrap_or_default(),
            },
            "pass_fail" => GradingScale::PassFail {
                passing_threshold: number_field(descriptor, "passing_threshold")
                    .unwrap_or(DEFAULT_PASSING_THRESHOLD),
            },
            other => GradingScale::Unrecognized {
                kind: other.to_string(),
            },
        }
    }

    /// The descriptor mapping for this scale.
    pub fn to_descriptor(&self) -> Value {
        match self {
            GradingScale::Numeric { max_points } => {
                json!({"type": "numeric", "max_points": max_points})
            }
            GradingScale::Letter { boundaries } => {
                json!({"type": "letter", "boundaries": boundaries})
            }
            GradingScale::PassFail { passing_threshold } => {
                json!({"type": "pass_fail", "passing_threshold": passing_threshold})
            }
            GradingScale::Unrecognized { kind } => json!({"type": kind}),
        }
    }

    /// Convert a raw 0-10 score onto this scale.
    pub fn convert(&self, raw_score: f64) -> ScoreConversion {
        let percentage = raw_score / RAW_SCORE_MAX * 100.0;

        let mut conversion = ScoreConversion {
            score_raw: raw_score,
            percentage: round2(percentage),
            score_total: raw_score,
            grade_letter: None,
            pass_fail: None,
        };

        match self {
            GradingScale::Numeric { max_points } => {
                conversion.score_total = round2(raw_score / RAW_SCORE_MAX * max_points);
            }
            // Letter and pass/fail keep the raw score as score_total.
            GradingScale::Letter { boundaries } => {
                conversion.grade_letter = Some(boundaries.letter_for(percentage));
            }
            GradingScale::PassFail { passing_threshold } => {
                conversion.pass_fail = Some(if percentage >= *passing_threshold {
                    PassFail::Pass
                } else {
                    PassFail::Fail
                });
            }
            GradingScale::Unrecognized { .. } => {}
        }

        conversion
    }
}

impl Serialize for GradingScale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_descriptor().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for GradingScale {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if !value.is_object() {
            return Err(serde::de::Error::custom("grading scale must be a mapping"));
        }
        Ok(GradingScale::from_descriptor(&value))
    }
}

/// A raw score re-expressed on a grading scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreConversion {
    /// The raw 0-10 score as received
    pub score_raw: f64,

    /// raw / 10 * 100, rounded to two decimals
    pub percentage: f64,

    /// Score in the target scale (raw score for letter and pass/fail)
    pub score_total: f64,

    pub grade_letter: Option<String>,

    pub pass_fail: Option<PassFail>,
}

/// Read a number that may arrive as a JSON number or a numeric string.
/// Non-finite values ("inf", "NaN") read as absent.
pub(crate) fn number_field(value: &Value, key: &str) -> Option<f64> {
    as_number(value.get(key)?)
}

pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

fn boundaries_from_value(value: &Value) -> Option<LetterBoundaries> {
    let map = value.as_object()?;
    let pairs: Vec<(String, f64)> = map
        .iter()
        .filter_map(|(letter, floor)| as_number(floor).map(|f| (letter.clone(), f)))
        .collect();
    (!pairs.is_empty()).then(|| LetterBoundaries::from_pairs(pairs))
}
