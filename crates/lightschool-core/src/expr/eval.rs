//! Tree-walking evaluator for parsed arithmetic.

use serde::Serialize;
use std::fmt;

use super::parser::{parse, BinaryOp, Expr, UnaryOp};
use super::EvaluationError;

/// Result of evaluating an arithmetic expression.
///
/// Integral values display without a fractional part ("5", not "5.0").
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Number(f64);

impl Number {
    pub fn value(&self) -> f64 {
        self.0
    }

    /// Whether the value has no fractional part.
    pub fn is_integral(&self) -> bool {
        self.0.fract() == 0.0
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -0.0 shows as "0"
        if self.is_integral() && self.0.abs() < 1e16 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Walk an expression tree. Only the whitelisted node kinds exist.
pub fn eval_expr(expr: &Expr) -> Result<f64, EvaluationError> {
    let value = match expr {
        Expr::Number(value) => *value,
        Expr::Unary { op, operand } => {
            let value = eval_expr(operand)?;
            match op {
                UnaryOp::Plus => value,
                UnaryOp::Minus => -value,
            }
        }
        Expr::Binary { op, left, right } => {
            let left = eval_expr(left)?;
            let right = eval_expr(right)?;
            match op {
                BinaryOp::Add => left + right,
                BinaryOp::Sub => left - right,
                BinaryOp::Mul => left * right,
                BinaryOp::Div => {
                    if right == 0.0 {
                        return Err(EvaluationError::DivisionByZero);
                    }
                    left / right
                }
            }
        }
    };

    if !value.is_finite() {
        return Err(EvaluationError::NonFinite);
    }
    Ok(value)
}

/// Parse and evaluate expression text.
pub fn evaluate(input: &str) -> Result<Number, EvaluationError> {
    let expr = parse(input)?;
    eval_expr(&expr).map(Number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(input: &str) -> String {
        evaluate(input).unwrap().to_string()
    }

    #[test]
    fn test_basic_arithmetic() {
        assert_eq!(eval_str("12 + 7"), "19");
        assert_eq!(eval_str("9 - 4"), "5");
        assert_eq!(eval_str("3 * 5"), "15");
        assert_eq!(eval_str("10 / 4"), "2.5");
    }

    #[test]
    fn test_integral_division_has_no_decimal_point() {
        assert_eq!(eval_str("10 / 2"), "5");
        assert_eq!(eval_str("7.5 * 2"), "15");
    }

    #[test]
    fn test_precedence_and_associativity() {
        assert_eq!(eval_str("2 + 3 * 4"), "14");
        assert_eq!(eval_str("(2 + 3) * 4"), "20");
        assert_eq!(eval_str("10 - 4 - 3"), "3");
        assert_eq!(eval_str("100 / 10 / 5"), "2");
    }

    #[test]
    fn test_unary_operators() {
        assert_eq!(eval_str("-3 + 5"), "2");
        assert_eq!(eval_str("+4"), "4");
        assert_eq!(eval_str("2 * -3"), "-6");
        assert_eq!(eval_str("--2"), "2");
        assert_eq!(eval_str("-(1 + 1)"), "-2");
    }

    #[test]
    fn test_negative_zero_displays_as_zero() {
        assert_eq!(eval_str("-0"), "0");
    }

    #[test]
    fn test_decimals() {
        assert_eq!(eval_str("0.1 + 0.2"), (0.1f64 + 0.2).to_string());
        assert_eq!(eval_str("1 / 3"), (1.0f64 / 3.0).to_string());
        assert_eq!(eval_str(".5 + .5"), "1");
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(evaluate("5 / 0"), Err(EvaluationError::DivisionByZero)));
        assert!(matches!(evaluate("5 / (2 - 2)"), Err(EvaluationError::DivisionByZero)));
    }

    #[test]
    fn test_disallowed_constructs() {
        for input in ["abs(-3)", "2 < 3", "2 == 2", "x + 1", "os.system", "2 ** 8", "1; 2"] {
            assert!(evaluate(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn test_overflow_is_rejected() {
        let huge = format!("{} * {}", "9".repeat(200), "9".repeat(200));
        assert!(matches!(evaluate(&huge), Err(EvaluationError::NonFinite)));
    }
}
