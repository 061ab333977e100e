//! Arithmetic question detection.
//!
//! Turns free text such as "What is 12 plus 7?" into a normalized
//! expression string ("12 + 7") that the evaluator understands.
//!
//! The word substitutions run in a fixed order over the whole lowercased
//! string. They are plain textual replacements, so an earlier rule can
//! change what a later rule sees ("box" becomes "bo*"). That order is part
//! of the behavior and must not be reshuffled.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Any ASCII digit anywhere in the message
    static ref DIGIT_PATTERN: Regex = Regex::new(r"[0-9]").unwrap();

    /// Ordered word -> symbol substitutions
    static ref SUBSTITUTIONS: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"plus").unwrap(), "+"),
        (Regex::new(r"minus").unwrap(), "-"),
        (Regex::new(r"times|multiplied by|multiply by").unwrap(), "*"),
        (Regex::new(r"x\b").unwrap(), "*"),
        (Regex::new(r"divided by|over|divide by").unwrap(), "/"),
        (Regex::new(r"what is|what's|calculate|compute|=").unwrap(), ""),
        (Regex::new(r"\?").unwrap(), ""),
    ];

    /// Contiguous run of expression characters
    static ref EXPRESSION_RUN: Regex = Regex::new(r"[0-9\s+\-*/().]+").unwrap();

    /// At least one binary operator symbol
    static ref OPERATOR_PATTERN: Regex = Regex::new(r"[+\-*/]").unwrap();
}

/// Check if text contains at least one ASCII digit.
pub fn contains_digit(text: &str) -> bool {
    DIGIT_PATTERN.is_match(text)
}

/// Apply the ordered word -> symbol substitutions to lowercased text.
pub fn normalize_operators(text: &str) -> String {
    let mut normalized = text.to_lowercase();
    for (pattern, replacement) in SUBSTITUTIONS.iter() {
        normalized = pattern.replace_all(&normalized, *replacement).into_owned();
    }
    normalized
}

/// Pick the longest run of expression characters; ties go to the leftmost.
fn longest_run(text: &str) -> Option<&str> {
    let mut best: Option<&str> = None;
    for m in EXPRESSION_RUN.find_iter(text) {
        if best.map_or(true, |b| m.as_str().len() > b.len()) {
            best = Some(m.as_str());
        }
    }
    best
}

/// Extract a candidate arithmetic expression from a student message.
///
/// Returns `None` when the message has no digit, no run of expression
/// characters, or no operator symbol. A bare number is not an expression.
pub fn extract_expression(text: &str) -> Option<String> {
    if text.is_empty() || !contains_digit(text) {
        return None;
    }

    let normalized = normalize_operators(text);
    let expression = longest_run(&normalized)?.trim();

    if expression.is_empty() || !OPERATOR_PATTERN.is_match(expression) {
        return None;
    }

    Some(expression.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_operators() {
        assert_eq!(extract_expression("What is 12 plus 7?").as_deref(), Some("12 + 7"));
        assert_eq!(extract_expression("9 minus 4").as_deref(), Some("9 - 4"));
        assert_eq!(extract_expression("3 times 5").as_deref(), Some("3 * 5"));
        assert_eq!(extract_expression("8 divided by 2").as_deref(), Some("8 / 2"));
        assert_eq!(extract_expression("6 multiplied by 7").as_deref(), Some("6 * 7"));
        assert_eq!(extract_expression("10 over 4").as_deref(), Some("10 / 4"));
    }

    #[test]
    fn test_standalone_x_is_multiplication() {
        assert_eq!(extract_expression("what's 6 x 7?").as_deref(), Some("6 * 7"));
    }

    #[test]
    fn test_symbolic_input_passes_through() {
        assert_eq!(extract_expression("calculate (2+3)*4").as_deref(), Some("(2+3)*4"));
        assert_eq!(extract_expression("10 / 2 =").as_deref(), Some("10 / 2"));
    }

    #[test]
    fn test_no_digit_is_miss() {
        assert_eq!(extract_expression("What is addition?"), None);
        assert_eq!(extract_expression(""), None);
        assert_eq!(extract_expression("plus minus times"), None);
    }

    #[test]
    fn test_non_ascii_digits_are_not_digits() {
        // Arabic-Indic and fullwidth digits
        assert!(!contains_digit("٣ plus ٤"));
        assert!(!contains_digit("３ plus ４"));
        assert_eq!(extract_expression("what is ٣ plus ٤?"), None);
        assert!(contains_digit("3 plus ٤"));
    }

    #[test]
    fn test_bare_number_is_miss() {
        assert_eq!(extract_expression("I am 7 years old"), None);
        assert_eq!(extract_expression("42"), None);
    }

    #[test]
    fn test_longest_run_wins_over_leading_whitespace() {
        // "can you tell me" leaves single spaces ahead of the real expression
        assert_eq!(
            extract_expression("Can you tell me what is 12 plus 7?").as_deref(),
            Some("12 + 7")
        );
    }

    #[test]
    fn test_substitution_order_is_preserved() {
        // "times" is rewritten before "minus"; both become symbols in place
        assert_eq!(
            extract_expression("what is 4 times 2 minus 1").as_deref(),
            Some("4 * 2 - 1")
        );
        // "x" at a word end inside another word is still rewritten
        assert_eq!(normalize_operators("box"), "bo*");
    }

    #[test]
    fn test_lowercases_before_matching() {
        assert_eq!(extract_expression("5 PLUS 5").as_deref(), Some("5 + 5"));
    }
}
