//! Tokenizer and recursive-descent parser for the restricted arithmetic grammar.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | primary
//! primary := NUMBER | '(' expr ')'
//! ```
//!
//! Anything outside this grammar (identifiers, calls, comparisons,
//! exponents) is rejected while tokenizing or parsing. Nothing here ever
//! executes input.

use super::EvaluationError;

/// Maximum nesting of parentheses and unary operators.
pub const MAX_DEPTH: usize = 64;

/// Maximum number of tokens in one expression.
///
/// Operator chains parse into a left-deep tree that both evaluation and
/// drop walk recursively, so the tree size has to be bounded up front.
pub const MAX_TOKENS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

/// Unary operators allowed in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

/// Binary operators allowed in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Parsed expression tree. These are the only node kinds the evaluator walks.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

/// Split expression text into tokens.
///
/// Fails with [`EvaluationError::TooLong`] as soon as more than
/// [`MAX_TOKENS`] tokens are produced.
pub fn tokenize(input: &str) -> Result<Vec<Token>, EvaluationError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                let mut seen_dot = false;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    if chars[i] == '.' {
                        if seen_dot {
                            break;
                        }
                        seen_dot = true;
                    }
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if literal == "." {
                    return Err(EvaluationError::InvalidNumber(literal));
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| EvaluationError::InvalidNumber(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            other => {
                return Err(EvaluationError::UnexpectedChar {
                    ch: other,
                    position: i,
                });
            }
        }

        if tokens.len() > MAX_TOKENS {
            return Err(EvaluationError::TooLong(MAX_TOKENS));
        }
    }

    Ok(tokens)
}

/// Parse expression text into an [`Expr`] tree.
pub fn parse(input: &str) -> Result<Expr, EvaluationError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvaluationError::Empty);
    }

    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.expr(0)?;

    if let Some(token) = parser.peek() {
        return Err(EvaluationError::UnexpectedToken(format!("{:?}", token)));
    }

    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expr(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.term(depth)?;

        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let right = self.term(depth)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn term(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        let mut left = self.unary(depth)?;

        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => break,
            };
            self.pos += 1;
            let right = self.unary(depth)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn unary(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        if depth > MAX_DEPTH {
            return Err(EvaluationError::TooDeep(MAX_DEPTH));
        }

        let op = match self.peek() {
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Minus) => UnaryOp::Minus,
            _ => return self.primary(depth),
        };
        self.pos += 1;
        let operand = self.unary(depth + 1)?;

        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn primary(&mut self, depth: usize) -> Result<Expr, EvaluationError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LParen) => {
                let inner = self.expr(depth + 1)?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(EvaluationError::UnexpectedToken(format!("{:?}", other))),
                    None => Err(EvaluationError::UnbalancedParens),
                }
            }
            Some(Token::RParen) => Err(EvaluationError::UnbalancedParens),
            Some(other) => Err(EvaluationError::UnexpectedToken(format!("{:?}", other))),
            None => Err(EvaluationError::UnexpectedEnd),
        }
    }
}
