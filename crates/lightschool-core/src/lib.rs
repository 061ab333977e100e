//! # lightschool-core
//!
//! Deterministic building blocks of the LightSchool tutor.
//!
//! This crate answers the parts of a student question that never need a
//! network call:
//! - Is this message secretly arithmetic? ([`extract_expression`])
//! - What is its value? ([`evaluate`], a whitelisting tree walker)
//! - What do we say when nothing else worked? ([`RuleTable`])
//!
//! It also holds the lesson-pack and progress types used by the host
//! application.
//!
//! ## Key Guarantees
//!
//! 1. **No code execution**: expressions are parsed against a fixed grammar
//! 2. **No network**: the LLM backend lives in `lightschool-runtime`
//! 3. **Always a reply**: [`RuleTable::reply`] cannot fail
//!
//! ## Example
//!
//! ```rust
//! use lightschool_core::{extract_expression, evaluate, RuleTable};
//!
//! let expression = extract_expression("What is 12 plus 7?").unwrap();
//! assert_eq!(evaluate(&expression).unwrap().to_string(), "19");
//!
//! let rules = RuleTable::builtin();
//! assert!(!rules.reply("Tell me a joke", "math", "en").is_empty());
//! ```

pub mod expr;
pub mod lessons;
pub mod progress;
pub mod rules;
pub mod types;

// Re-export main types at crate root
pub use expr::{evaluate, extract_expression, solve, EvaluationError, Number};
pub use lessons::{score_quiz, LessonError, LessonPack, LessonStore, QuizQuestion, Unit};
pub use progress::{ProgressBook, UnitProgress};
pub use rules::{RuleError, RuleTable};
pub use types::{ReplySource, TutorReply, TutorRequest};

/// Answer a message with the calculator stage only.
///
/// Returns `Some` only when an expression was found and evaluated; any
/// evaluation error is treated as "not arithmetic".
pub fn calculator_reply(message: &str) -> Option<TutorReply> {
    match solve(message)? {
        Ok(value) => Some(TutorReply::calculator(value.to_string())),
        Err(e) => {
            tracing::debug!(error = %e, "Extracted expression did not evaluate");
            None
        }
    }
}
