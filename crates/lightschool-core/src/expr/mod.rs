//! Arithmetic short-circuit for the tutor.
//!
//! Student text never reaches a general-purpose evaluator. The flow is:
//! [`extract_expression`] normalizes words to symbols, [`parser`] builds a
//! tree from a fixed grammar, and [`evaluate`] walks that tree.

pub mod eval;
pub mod extract;
pub mod parser;

pub use eval::{evaluate, Number};
pub use extract::extract_expression;
pub use parser::{parse, Expr};

use thiserror::Error;

/// Errors from parsing or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Empty expression")]
    Empty,

    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of expression")]
    UnexpectedEnd,

    #[error("Unbalanced parentheses")]
    UnbalancedParens,

    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("Expression longer than {0} tokens")]
    TooLong(usize),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Result is not a finite number")]
    NonFinite,
}

/// Extract and evaluate in one step.
///
/// Returns `None` when the text is not arithmetic, `Some(Err(_))` when it
/// looked like arithmetic but could not be evaluated.
pub fn solve(text: &str) -> Option<Result<Number, EvaluationError>> {
    extract_expression(text).map(|expression| evaluate(&expression))
}
