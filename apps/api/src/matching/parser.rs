//! AI Response Parser: raw model reply → validated `AnalysisDraft`.
//!
//! The model's output format is not contractually guaranteed, so every field is
//! validated here and anything unusable degrades to a fallback draft. Nothing in
//! this module returns an error or panics.

use serde_json::{Map, Value};

use crate::llm_client::LlmError;
use crate::models::analysis::{AnalysisDraft, Provenance, Verdict};

/// Upper bound on the stored summary, in characters.
pub const MAX_SUMMARY_CHARS: usize = 2000;

pub const SUMMARY_PLACEHOLDER: &str = "No summary was provided by the analysis.";
pub const FEEDBACK_PLACEHOLDER: &str = "No feedback was provided by the analysis.";
pub const FALLBACK_SUMMARY: &str =
    "Analysis could not be completed for this resume. The score shown is a placeholder.";
pub const FALLBACK_FEEDBACK: &str =
    "Automated feedback is unavailable. Re-run the analysis or review this resume manually.";

/// Why an analysis fell back instead of using the model's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The resume text could not be obtained.
    Extraction(String),
    /// The model call failed (quota, timeout, transport, API error).
    Upstream { kind: &'static str, message: String },
    /// The reply held no usable structured content.
    Decode(String),
}

impl FallbackReason {
    pub fn upstream(err: &LlmError) -> Self {
        FallbackReason::Upstream {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            FallbackReason::Extraction(msg) => format!("extraction_failure: {msg}"),
            FallbackReason::Upstream { kind, message } => format!("{kind}: {message}"),
            FallbackReason::Decode(msg) => format!("decode_failure: {msg}"),
        }
    }
}

/// Tagged parse result.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Parsed(AnalysisDraft),
    Fallback(FallbackReason),
}

impl ParseOutcome {
    /// Collapses the outcome into a draft, substituting the fallback draft when needed.
    pub fn into_draft(self) -> AnalysisDraft {
        match self {
            ParseOutcome::Parsed(draft) => draft,
            ParseOutcome::Fallback(reason) => fallback_draft(&reason),
        }
    }
}

/// The deterministic low-confidence result used whenever analysis fails.
pub fn fallback_draft(reason: &FallbackReason) -> AnalysisDraft {
    AnalysisDraft {
        score: 0,
        verdict: Verdict::Low,
        summary: FALLBACK_SUMMARY.to_string(),
        feedback: FALLBACK_FEEDBACK.to_string(),
        missing_skills: Vec::new(),
        provenance: Provenance::Fallback,
        fallback_reason: Some(reason.describe()),
    }
}

/// Parses a raw model reply.
pub fn parse(raw: &str) -> ParseOutcome {
    let Some(object) = locate_json_object(raw) else {
        return ParseOutcome::Fallback(FallbackReason::Decode(
            "no JSON object found in model reply".to_string(),
        ));
    };

    let Some(score) = object.get("relevance_score").and_then(coerce_score) else {
        return ParseOutcome::Fallback(FallbackReason::Decode(
            "relevance_score is missing or not numeric".to_string(),
        ));
    };

    let verdict = first_field(&object, &["verdict", "fit_verdict"])
        .and_then(Value::as_str)
        .and_then(|v| v.parse::<Verdict>().ok())
        .unwrap_or(Verdict::Medium);

    let summary = text_field(&object, &["summary"])
        .map(|s| truncate_chars(&s, MAX_SUMMARY_CHARS))
        .unwrap_or_else(|| SUMMARY_PLACEHOLDER.to_string());

    let feedback = text_field(&object, &["feedback", "personalized_feedback"])
        .unwrap_or_else(|| FEEDBACK_PLACEHOLDER.to_string());

    let missing_skills = object
        .get("missing_skills")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    ParseOutcome::Parsed(AnalysisDraft {
        score,
        verdict,
        summary,
        feedback,
        missing_skills,
        provenance: Provenance::Model,
        fallback_reason: None,
    })
}

/// Finds the first decodable JSON object in the reply: the whole text, then the
/// contents of any ``` fence, then the outermost `{ … }` span.
pub(crate) fn locate_json_object(raw: &str) -> Option<Map<String, Value>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut candidates = vec![trimmed];
    candidates.extend(fenced_blocks(trimmed));
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates.into_iter().find_map(|candidate| {
        match serde_json::from_str::<Value>(candidate.trim()) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// Bodies of ``` fenced blocks, with an optional language tag on the opening line removed.
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find("```") {
        let after_open = &rest[open + 3..];
        let Some(close) = after_open.find("```") else {
            break;
        };
        let body = &after_open[..close];
        // Drop a language tag such as `json` sitting on the fence line.
        let body = match body.find('\n') {
            Some(nl) if !body[..nl].contains('{') => &body[nl + 1..],
            _ => body,
        };
        blocks.push(body);
        rest = &after_open[close + 3..];
    }
    blocks
}

/// Integer, float (rounded) or numeric string, clamped to 0..=100.
fn coerce_score(value: &Value) -> Option<u8> {
    let number = match value {
        Value::Number(n) => n
            .as_i64()
            .map(|i| i as f64)
            .or_else(|| n.as_f64())?,
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !number.is_finite() {
        return None;
    }
    Some(number.round().clamp(0.0, 100.0) as u8)
}

fn first_field<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| object.get(*key))
}

/// Non-blank string under any of `keys`, trimmed.
fn text_field(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| object.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(String::from)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    const VALID: &str = r#"{
        "relevance_score": 82,
        "verdict": "High",
        "summary": "Strong Rust background.",
        "feedback": "Quantify the impact of the caching work.",
        "missing_skills": ["Kubernetes", "Kafka"]
    }"#;

    fn parsed(raw: &str) -> AnalysisDraft {
        match parse(raw) {
            ParseOutcome::Parsed(draft) => draft,
            ParseOutcome::Fallback(reason) => panic!("unexpected fallback: {reason:?}"),
        }
    }

    fn with_score(score: &str) -> String {
        format!(
            r#"{{"relevance_score": {score}, "verdict": "Low", "summary": "s", "feedback": "f", "missing_skills": []}}"#
        )
    }

    #[test]
    fn test_valid_reply_parses_every_field() {
        let draft = parsed(VALID);
        assert_eq!(draft.score, 82);
        assert_eq!(draft.verdict, Verdict::High);
        assert_eq!(draft.summary, "Strong Rust background.");
        assert_eq!(draft.feedback, "Quantify the impact of the caching work.");
        assert_eq!(draft.missing_skills, vec!["Kubernetes", "Kafka"]);
        assert_eq!(draft.provenance, Provenance::Model);
        assert!(draft.fallback_reason.is_none());
    }

    #[test]
    fn test_out_of_range_scores_are_clamped() {
        assert_eq!(parsed(&with_score("150")).score, 100);
        assert_eq!(parsed(&with_score("-5")).score, 0);
        assert_eq!(parsed(&with_score("0")).score, 0);
        assert_eq!(parsed(&with_score("100")).score, 100);
    }

    #[test]
    fn test_score_coerces_from_float_and_string() {
        assert_eq!(parsed(&with_score("71.6")).score, 72);
        assert_eq!(parsed(&with_score(r#""64""#)).score, 64);
        assert_eq!(parsed(&with_score(r#""88%""#)).score, 88);
    }

    #[test]
    fn test_non_numeric_score_falls_back() {
        assert!(matches!(
            parse(&with_score(r#""excellent""#)),
            ParseOutcome::Fallback(FallbackReason::Decode(_))
        ));
        assert!(matches!(
            parse(r#"{"verdict": "High"}"#),
            ParseOutcome::Fallback(FallbackReason::Decode(_))
        ));
    }

    #[test]
    fn test_unrecognized_verdict_defaults_to_medium() {
        let draft = parsed(r#"{"relevance_score": 90, "verdict": "Great fit"}"#);
        assert_eq!(draft.verdict, Verdict::Medium);
        let draft = parsed(r#"{"relevance_score": 90}"#);
        assert_eq!(draft.verdict, Verdict::Medium);
    }

    #[test]
    fn test_verdict_is_case_insensitive_and_accepts_fit_verdict_key() {
        assert_eq!(
            parsed(r#"{"relevance_score": 10, "verdict": "low"}"#).verdict,
            Verdict::Low
        );
        assert_eq!(
            parsed(r#"{"relevance_score": 10, "fit_verdict": "HIGH"}"#).verdict,
            Verdict::High
        );
    }

    #[test]
    fn test_missing_text_fields_get_placeholders() {
        let draft = parsed(r#"{"relevance_score": 50, "summary": "   "}"#);
        assert_eq!(draft.summary, SUMMARY_PLACEHOLDER);
        assert_eq!(draft.feedback, FEEDBACK_PLACEHOLDER);
    }

    #[test]
    fn test_personalized_feedback_key_is_accepted() {
        let draft = parsed(r#"{"relevance_score": 50, "personalized_feedback": "Add metrics."}"#);
        assert_eq!(draft.feedback, "Add metrics.");
    }

    #[test]
    fn test_missing_skills_must_be_a_list() {
        let draft = parsed(r#"{"relevance_score": 50, "missing_skills": "Go, Rust"}"#);
        assert!(draft.missing_skills.is_empty());
        let draft = parsed(r#"{"relevance_score": 50, "missing_skills": ["Go", 3, " ", "SQL "]}"#);
        assert_eq!(draft.missing_skills, vec!["Go", "SQL"]);
    }

    #[test]
    fn test_summary_is_bounded() {
        let long = "x".repeat(MAX_SUMMARY_CHARS + 500);
        let raw = format!(r#"{{"relevance_score": 50, "summary": "{long}"}}"#);
        assert_eq!(parsed(&raw).summary.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn test_wrapped_reply_parses_identically_to_bare_reply() {
        let wrapped = format!(
            "Sure! Here is my assessment of the candidate:\n\n```json\n{VALID}\n```\n\nLet me know if you need more."
        );
        assert_eq!(parse(&wrapped), parse(VALID));

        let fenced_without_tag = format!("```\n{VALID}\n```");
        assert_eq!(parse(&fenced_without_tag), parse(VALID));

        let prose_only = format!("Result follows. {VALID} Hope this helps.");
        assert_eq!(parse(&prose_only), parse(VALID));
    }

    #[test]
    fn test_empty_reply_yields_fallback_draft() {
        let outcome = parse("");
        assert!(matches!(
            outcome,
            ParseOutcome::Fallback(FallbackReason::Decode(_))
        ));
        let draft = outcome.into_draft();
        assert_eq!(draft.score, 0);
        assert_eq!(draft.verdict, Verdict::Low);
        assert_eq!(draft.provenance, Provenance::Fallback);
        assert!(draft.fallback_reason.unwrap().starts_with("decode_failure"));
    }

    #[test]
    fn test_garbage_and_non_object_json_fall_back() {
        for raw in ["I cannot help with that.", "[1, 2, 3]", "{ not json }", "```json\n```"] {
            assert!(
                matches!(parse(raw), ParseOutcome::Fallback(_)),
                "expected fallback for {raw:?}"
            );
        }
    }

    #[test]
    fn test_upstream_reason_describes_error_kind() {
        let reason = FallbackReason::upstream(&LlmError::Timeout(Duration::from_secs(30)));
        let draft = fallback_draft(&reason);
        assert!(draft.fallback_reason.unwrap().starts_with("timeout:"));
        assert_eq!(draft.summary, FALLBACK_SUMMARY);
    }
}
