//! Arithmetic evaluation.
//!
//! Grammar:
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```
//!
//! Anything the grammar does not cover evaluates to `0`, as does division by
//! zero. The zero is a deliberate simplification, not an error signal.

use async_trait::async_trait;
use parley_conversation::{ParameterKind, ParameterSpec, Tool, ToolContext, ToolFailure};
use serde::Deserialize;
use std::iter::Peekable;
use std::str::Chars;
use tracing::debug;

/// Evaluates an arithmetic expression, yielding `0.0` on any failure.
#[must_use]
pub fn evaluate(expression: &str) -> f64 {
    match Parser::new(expression).parse() {
        Some(value) if value.is_finite() => value,
        _ => {
            debug!(expression, "expression did not evaluate, using 0");
            0.0
        }
    }
}

/// Deepest run of parentheses and unary signs accepted.
const MAX_NESTING: usize = 256;

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            depth: 0,
        }
    }

    fn parse(mut self) -> Option<f64> {
        let value = self.expr()?;
        self.skip_whitespace();
        // Trailing input means the expression was malformed.
        self.chars.peek().is_none().then_some(value)
    }

    fn expr(&mut self) -> Option<f64> {
        let mut value = self.term()?;
        loop {
            match self.peek_op() {
                Some('+') => {
                    self.chars.next();
                    value += self.term()?;
                }
                Some('-') => {
                    self.chars.next();
                    value -= self.term()?;
                }
                _ => return Some(value),
            }
        }
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        loop {
            match self.peek_op() {
                Some('*') => {
                    self.chars.next();
                    value *= self.factor()?;
                }
                Some('/') => {
                    self.chars.next();
                    let divisor = self.factor()?;
                    if divisor == 0.0 {
                        return None;
                    }
                    value /= divisor;
                }
                _ => return Some(value),
            }
        }
    }

    fn factor(&mut self) -> Option<f64> {
        if self.depth >= MAX_NESTING {
            return None;
        }
        self.depth += 1;
        let value = self.primary();
        self.depth -= 1;
        value
    }

    fn primary(&mut self) -> Option<f64> {
        match self.peek_op()? {
            '+' => {
                self.chars.next();
                self.factor()
            }
            '-' => {
                self.chars.next();
                self.factor().map(|v| -v)
            }
            '(' => {
                self.chars.next();
                let value = self.expr()?;
                if self.peek_op()? != ')' {
                    return None;
                }
                self.chars.next();
                Some(value)
            }
            c if c.is_ascii_digit() || c == '.' => self.number(),
            _ => None,
        }
    }

    fn number(&mut self) -> Option<f64> {
        let mut literal = String::new();
        while let Some(&c) = self.chars.peek() {
            if !(c.is_ascii_digit() || c == '.') {
                break;
            }
            literal.push(c);
            self.chars.next();
        }
        literal.parse().ok()
    }

    fn peek_op(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|c| c.is_whitespace()).is_some() {}
    }
}

/// Evaluates an arithmetic expression for the model.
pub struct Calculate;

/// Arguments for [`Calculate`].
#[derive(Debug, Deserialize)]
pub struct CalculateArgs {
    /// The expression to evaluate.
    pub expression: String,
}

#[async_trait]
impl Tool for Calculate {
    type Args = CalculateArgs;

    fn name(&self) -> &'static str {
        "calculate"
    }

    fn description(&self) -> &'static str {
        "Performs mathematical calculations on a given expression"
    }

    fn parameters(&self) -> Vec<ParameterSpec> {
        vec![ParameterSpec::required(
            "expression",
            ParameterKind::String,
            "Mathematical expression to evaluate",
        )]
    }

    async fn call(&self, _ctx: &ToolContext, args: CalculateArgs) -> Result<String, ToolFailure> {
        Ok(evaluate(&args.expression).to_string())
    }
}
