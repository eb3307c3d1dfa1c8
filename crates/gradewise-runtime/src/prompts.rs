//! Prompts and content layout for grading requests.
//!
//! A request is assembled from three pieces:
//! 1. the system instruction (output schema + grading rules + feedback style)
//! 2. the rubric, framed by a banner
//! 3. the submission, framed by a banner, followed by a closing instruction

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::providers::ContentPart;

/// Base system instruction shared by every grading request.
///
/// The JSON layout here is the contract the normalizer reads; keep the two
/// in step.
pub const BASE_SYSTEM_PROMPT: &str = r#"You are an expert educational grading assistant.
You grade student essays/submissions based on a provided rubric and give feedback.

You MUST respond with a JSON object with this EXACT schema:
{"score_total": <number>,
 "score_breakdown": [{"criterion_id": "<id>", "points": <number>, "max_points": <number>, "rationale": "<why this score>"}],
 "rubric_checks": [{"criterion_id": "<id>", "met": <boolean>, "evidence_quote": "<direct quote from submission>"}],
 "evidence_quotes": ["<direct quote 1>", "<direct quote 2>"],
 "feedback_short": "<1-2 sentence summary>",
 "feedback_detailed": {
   "overall": "<2-4 sentence overall assessment>",
   "strengths": ["<specific strength 1>"],
   "weaknesses": ["<specific weakness 1>"],
   "criteria_feedback": [{"criterion_id": "<id>", "status": "<met|partial|not_met>", "feedback": "<feedback>", "how_to_improve": "<advice or null>"}],
   "grammar_issues": [{"location": "<where>", "original": "<text>", "correction": "<fix>", "rule": "<rule>"}],
   "suggestions": ["<suggestion 1>"]
 },
 "flags": [{"code": "<FLAG_CODE>", "message": "<explanation>"}],
 "confidence": <number between 0.0 and 1.0>
}

Rules:
- Read the rubric carefully and grade each criterion.
- score_total is on a 0-10 scale.
- Quote directly from the submission as evidence.
- This is a DRAFT grade. A professor will review it.
- Add flags like LOW_EVIDENCE, AMBIGUOUS_RUBRIC_MATCH if applicable.
- Return ONLY valid JSON.
"#;

/// Feedback style section for brief feedback.
pub const BRIEF_FEEDBACK_STYLE: &str = r#"
Feedback style: BRIEF
- feedback_short: 1-2 sentences only.
- feedback_detailed.overall: 1-2 sentences max.
- criteria_feedback: 1 sentence per criterion.
- grammar_issues: top 3 only.
- suggestions: 1-2 only.
- Keep everything concise and to the point.
"#;

/// Feedback style section for detailed feedback.
pub const DETAILED_FEEDBACK_STYLE: &str = r#"
Feedback style: DETAILED
- feedback_detailed.overall: 2-4 sentences.
- criteria_feedback: thorough explanation per criterion.
- grammar_issues: list ALL found.
- suggestions: 2-4 actionable suggestions.
- Be as thorough and helpful as possible.
"#;

pub const RUBRIC_BANNER: &str = "=== RUBRIC (grading criteria) ===";
pub const SUBMISSION_BANNER: &str = "\n=== STUDENT SUBMISSION (grade this) ===";
pub const CLOSING_INSTRUCTION: &str = "\nGrade this submission according to the rubric. Provide detailed feedback for each criterion. Return JSON only.";

/// How much feedback the model should write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStyle {
    Brief,
    #[default]
    Detailed,
}

impl FeedbackStyle {
    pub fn prompt_section(&self) -> &'static str {
        match self {
            FeedbackStyle::Brief => BRIEF_FEEDBACK_STYLE,
            FeedbackStyle::Detailed => DETAILED_FEEDBACK_STYLE,
        }
    }
}

impl std::str::FromStr for FeedbackStyle {
    type Err = String;

    /// Anything other than "brief" is detailed.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("brief") {
            Ok(FeedbackStyle::Brief)
        } else {
            Ok(FeedbackStyle::Detailed)
        }
    }
}

/// Full system instruction for a feedback style.
pub fn system_instruction(style: FeedbackStyle) -> String {
    format!("{}{}", BASE_SYSTEM_PROMPT, style.prompt_section())
}

/// Order the request contents: rubric banner, rubric, submission banner,
/// submission, closing instruction.
pub fn build_contents(rubric_parts: Vec<ContentPart>, submission_parts: Vec<ContentPart>) -> Vec<ContentPart> {
    let mut contents = Vec::with_capacity(rubric_parts.len() + submission_parts.len() + 3);
    contents.push(ContentPart::text(RUBRIC_BANNER));
    contents.extend(rubric_parts);
    contents.push(ContentPart::text(SUBMISSION_BANNER));
    contents.extend(submission_parts);
    contents.push(ContentPart::text(CLOSING_INSTRUCTION));
    contents
}

/// Structured-output schema matching [`BASE_SYSTEM_PROMPT`].
///
/// Uses the upstream's OpenAPI-style type names.
pub fn response_schema() -> JsonValue {
    let string = json!({"type": "STRING"});
    let number = json!({"type": "NUMBER"});
    let strings = json!({"type": "ARRAY", "items": {"type": "STRING"}});

    json!({
        "type": "OBJECT",
        "properties": {
            "score_total": number,
            "score_breakdown": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "criterion_id": string,
                        "points": number,
                        "max_points": number,
                        "rationale": string
                    },
                    "required": ["criterion_id", "points", "max_points", "rationale"]
                }
            },
            "rubric_checks": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "criterion_id": string,
                        "met": {"type": "BOOLEAN"},
                        "evidence_quote": string
                    }
                }
            },
            "evidence_quotes": strings,
            "feedback_short": string,
            "feedback_detailed": {
                "type": "OBJECT",
                "properties": {
                    "overall": string,
                    "strengths": strings,
                    "weaknesses": strings,
                    "criteria_feedback": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "criterion_id": string,
                                "status": {"type": "STRING", "enum": ["met", "partial", "not_met"]},
                                "feedback": string,
                                "how_to_improve": {"type": "STRING", "nullable": true}
                            }
                        }
                    },
                    "grammar_issues": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "location": string,
                                "original": string,
                                "correction": string,
                                "rule": string
                            }
                        }
                    },
                    "suggestions": strings
                }
            },
            "flags": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {"code": string, "message": string},
                    "required": ["code", "message"]
                }
            },
            "confidence": number
        },
        "required": ["score_total", "score_breakdown", "feedback_short", "feedback_detailed"]
    })
}
