//! Calculator tool
//!
//! Evaluates arithmetic with a small recursive-descent parser instead of
//! handing text to any kind of interpreter. Supported: `+ - * /`,
//! parentheses, unary minus, `sqrt(x)` and the constant `pi`. Text after
//! `#` is a comment.

use crate::errors::{AgentError, Result};
use crate::tools::registry::Tool;
use crate::tools::types::ToolInput;
use async_trait::async_trait;

/// Registry name of the calculator
pub const CALCULATOR_TOOL: &str = "calculator";

/// Deepest nesting of parentheses, `sqrt(` and unary signs accepted
pub const MAX_NESTING: usize = 256;

/// Arithmetic calculator
#[derive(Debug, Clone)]
pub struct CalculatorTool {
    name: String,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self::named(CALCULATOR_TOOL)
    }

    /// Register the calculator under another name
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression (+, -, *, /, parentheses, sqrt(x), pi); text after # is ignored"
    }

    async fn invoke(&self, input: &ToolInput) -> Result<String> {
        let expression = input.text().unwrap_or_default();
        evaluate(expression)
            .map(format_number)
            .map_err(|message| AgentError::tool(&self.name, message))
    }
}

/// Evaluate an expression to a number
pub fn evaluate(expression: &str) -> std::result::Result<f64, String> {
    let expression = expression
        .split_once('#')
        .map_or(expression, |(code, _)| code);
    if expression.trim().is_empty() {
        return Err("expression cannot be empty".to_string());
    }

    let mut parser = ExprParser {
        chars: expression.chars().filter(|c| !c.is_whitespace()).collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.chars.len() {
        return Err(format!(
            "unexpected '{}' at position {}",
            parser.chars[parser.pos], parser.pos
        ));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

/// Whole numbers print without a fractional part
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

struct ExprParser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn descend(&mut self) -> std::result::Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err("expression nested too deeply".to_string());
        }
        Ok(())
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        self.descend()?;
        let value = self.sum();
        self.depth -= 1;
        value
    }

    // expr := term (('+' | '-') term)*
    fn sum(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    // term := factor (('*' | '/') factor)*
    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.factor()?;
        loop {
            if self.eat('*') {
                value *= self.factor()?;
            } else if self.eat('/') {
                let divisor = self.factor()?;
                if divisor == 0.0 {
                    return Err("division by zero".to_string());
                }
                value /= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    fn factor(&mut self) -> std::result::Result<f64, String> {
        self.descend()?;
        let value = self.unary();
        self.depth -= 1;
        value
    }

    // factor := ('-' | '+') factor | primary
    fn unary(&mut self) -> std::result::Result<f64, String> {
        if self.eat('-') {
            return Ok(-self.factor()?);
        }
        if self.eat('+') {
            return self.factor();
        }
        self.primary()
    }

    fn primary(&mut self) -> std::result::Result<f64, String> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if !self.eat(')') {
                    return Err("missing closing parenthesis".to_string());
                }
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) if c.is_alphabetic() => self.identifier(),
            Some(c) => Err(format!("unexpected '{}' at position {}", c, self.pos)),
            None => Err("unexpected end of expression".to_string()),
        }
    }

    fn number(&mut self) -> std::result::Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let literal: String = self.chars[start..self.pos].iter().collect();
        literal
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", literal))
    }

    fn identifier(&mut self) -> std::result::Result<f64, String> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let ident: String = self.chars[start..self.pos].iter().collect();

        match ident.as_str() {
            "pi" => Ok(std::f64::consts::PI),
            "sqrt" => {
                if !self.eat('(') {
                    return Err("sqrt expects '('".to_string());
                }
                let arg = self.expr()?;
                if !self.eat(')') {
                    return Err("missing closing parenthesis".to_string());
                }
                if arg < 0.0 {
                    return Err("sqrt of a negative number".to_string());
                }
                Ok(arg.sqrt())
            }
            other => Err(format!("unknown name '{}'", other)),
        }
    }
}
