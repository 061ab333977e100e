//! Reading the answer out of raw backend text.
//!
//! Models are asked for `{"answer":"..."}` on the first line. Reasoning
//! models still emit `<think>` blocks, so those are removed first. Anything
//! that does not meet the contract is rejected rather than repaired.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Suffix appended to truncated answers.
pub const ELLIPSIS: &str = "...";

lazy_static! {
    /// Complete reasoning blocks, across lines, shortest match
    static ref THINK_BLOCK: Regex = Regex::new(r"(?s)<think>.*?</think>").unwrap();
}

/// Reasons a backend reply was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplyError {
    #[error("First line is not a JSON object: {0}")]
    NotJson(String),

    #[error("JSON object has no string 'answer' field")]
    MissingAnswer,

    #[error("Answer is empty")]
    EmptyAnswer,
}

/// Trim the text and strip `<think>` blocks and stray think tags.
pub fn sanitize(raw: &str) -> String {
    let without_blocks = THINK_BLOCK.replace_all(raw.trim(), "");
    without_blocks
        .replace("<think>", "")
        .replace("</think>", "")
        .trim()
        .to_string()
}

/// Parse the `answer` field from the first line of sanitized text.
///
/// The returned answer is trimmed and non-empty.
pub fn parse_answer(sanitized: &str) -> Result<String, ReplyError> {
    let first_line = sanitized.lines().next().unwrap_or("").trim();

    let value: JsonValue =
        serde_json::from_str(first_line).map_err(|e| ReplyError::NotJson(e.to_string()))?;

    let object = value
        .as_object()
        .ok_or_else(|| ReplyError::NotJson(format!("expected object, found {}", value)))?;

    let answer = object
        .get("answer")
        .and_then(|a| a.as_str())
        .ok_or(ReplyError::MissingAnswer)?
        .trim();

    if answer.is_empty() {
        return Err(ReplyError::EmptyAnswer);
    }
    Ok(answer.to_string())
}

/// Cap an answer at `max_chars` characters.
///
/// Longer answers keep their first `max_chars - 3` characters, lose any
/// trailing whitespace and gain `...`.
pub fn truncate(answer: &str, max_chars: usize) -> String {
    if answer.chars().count() <= max_chars {
        return answer.to_string();
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let head: String = answer.chars().take(keep).collect();
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sanitize_removes_think_blocks() {
        let raw = "  <think>\nLet me count...\n2 + 2\n</think>\n{\"answer\":\"Four!\"}  ";
        assert_eq!(sanitize(raw), "{\"answer\":\"Four!\"}");
    }

    #[test]
    fn test_sanitize_is_non_greedy() {
        let raw = "<think>a</think>{\"answer\":\"keep\"}<think>b</think>";
        assert_eq!(sanitize(raw), "{\"answer\":\"keep\"}");
    }

    #[test]
    fn test_sanitize_strips_stray_tags() {
        assert_eq!(sanitize("<think>{\"answer\":\"x\"}"), "{\"answer\":\"x\"}");
        assert_eq!(sanitize("{\"answer\":\"x\"}</think>"), "{\"answer\":\"x\"}");
    }

    #[test]
    fn test_parse_first_line_only() {
        let text = "{\"answer\":\"Plants need sunlight.\"}\nExtra rambling here";
        assert_eq!(parse_answer(text).unwrap(), "Plants need sunlight.");
    }

    #[test]
    fn test_parse_trims_answer() {
        assert_eq!(parse_answer("{\"answer\":\"  hi  \"}").unwrap(), "hi");
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(matches!(
            parse_answer("Sure! The answer is 4."),
            Err(ReplyError::NotJson(_))
        ));
        assert!(matches!(parse_answer(""), Err(ReplyError::NotJson(_))));
        assert!(matches!(parse_answer("[1, 2]"), Err(ReplyError::NotJson(_))));
    }

    #[test]
    fn test_parse_rejects_missing_or_non_string_answer() {
        assert_eq!(parse_answer("{\"reply\":\"x\"}"), Err(ReplyError::MissingAnswer));
        assert_eq!(parse_answer("{\"answer\":4}"), Err(ReplyError::MissingAnswer));
    }

    #[test]
    fn test_parse_rejects_blank_answer() {
        assert_eq!(parse_answer("{\"answer\":\"   \"}"), Err(ReplyError::EmptyAnswer));
    }

    #[test]
    fn test_truncate_short_answer_untouched() {
        let answer = "a".repeat(140);
        assert_eq!(truncate(&answer, 140), answer);
    }

    #[test]
    fn test_truncate_long_answer() {
        let answer = "b".repeat(200);
        let truncated = truncate(&answer, 140);
        assert_eq!(truncated.chars().count(), 140);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_truncate_trims_before_ellipsis() {
        let answer = format!("{} {}", "c".repeat(136), "d".repeat(20));
        let truncated = truncate(&answer, 140);
        assert_eq!(truncated, format!("{}...", "c".repeat(136)));
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        let answer = "ñ".repeat(141);
        let truncated = truncate(&answer, 140);
        assert_eq!(truncated, format!("{}...", "ñ".repeat(137)));
    }

    proptest! {
        #[test]
        fn prop_truncate_never_exceeds_limit(text in "\\PC{0,300}") {
            prop_assert!(truncate(&text, 140).chars().count() <= 140);
        }

        #[test]
        fn prop_sanitize_leaves_no_think_tags(text in "(<think>|</think>|[a-z {}\"]){0,40}") {
            let clean = sanitize(&text);
            prop_assert!(!clean.contains("<think>"));
            prop_assert!(!clean.contains("</think>"));
        }
    }
}
