//! Recovers `{layman_explanation, example}` from free-form generation output.
//!
//! Small seq2seq and chat models rarely emit clean JSON, so extraction tries
//! progressively looser strategies and never fails.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use super::types::ExplanationRecord;

/// Which strategy produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The whole output was a JSON object.
    Direct,
    /// The outermost `{...}` span of the label-stripped output was a JSON object.
    BraceSpan,
    /// Nothing parsed; the cleaned text became the explanation.
    Fallback,
}

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?im)^[ \t]*(?:layman[_ ]explanation|explanation|example)[ \t]*:[ \t]*")
            .unwrap_or_else(|err| panic!("label pattern must compile: {err}"))
    })
}

pub fn extract_explanation(raw: &str) -> ExplanationRecord {
    extract_with_strategy(raw).0
}

pub fn extract_with_strategy(raw: &str) -> (ExplanationRecord, ExtractionStrategy) {
    if let Some(record) = parse_object(raw.trim()) {
        return (record, ExtractionStrategy::Direct);
    }

    let cleaned = strip_labels(raw);
    if let Some(record) = brace_span(&cleaned).and_then(parse_object) {
        return (record, ExtractionStrategy::BraceSpan);
    }

    let record = ExplanationRecord {
        layman_explanation: cleaned.trim().to_string(),
        example: String::new(),
    };
    (record, ExtractionStrategy::Fallback)
}

fn strip_labels(text: &str) -> String {
    label_pattern().replace_all(text, "").into_owned()
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

fn parse_object(text: &str) -> Option<ExplanationRecord> {
    match serde_json::from_str::<Value>(text).ok()? {
        Value::Object(map) => Some(ExplanationRecord {
            layman_explanation: field_text(&map, "layman_explanation"),
            example: field_text(&map, "example"),
        }),
        _ => None,
    }
}

fn field_text(map: &Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
