//! Restricted expression evaluation for data-driven transformations
//!
//! Expressions are small arithmetic or boolean formulas such as
//! `value * 1.05 + fee` or `premium > 1000 && state == "CA"`. They are never
//! compiled or executed as host code: every expression first passes a
//! character/identifier safety gate, then is tokenized and evaluated by a
//! recursive-descent parser over a fixed grammar against a variable map.
//!
//! # Module Organization
//!
//! - [`lexer`] - Safety gate and tokenizer
//! - [`parser`] - Grammar, AST and evaluation
//!
//! # Examples
//!
//! ```
//! use ratebridge_core::expression::{evaluate_arithmetic, Variables};
//! use serde_json::json;
//!
//! let vars = Variables::from_source(&json!(200), &json!({"fee": 25}));
//! assert_eq!(evaluate_arithmetic("value * 2 + fee", &vars).unwrap(), 425.0);
//! ```
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

pub mod lexer;
pub mod parser;

use crate::path;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

pub use lexer::{check_safety, tokenize, Token};
pub use parser::{Expr, Parser};

/// Errors raised while validating or evaluating an expression
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// The expression failed the safety gate and was never evaluated
    #[error("Unsafe expression '{expression}': {reason}")]
    Unsafe { expression: String, reason: String },

    /// The expression passed the gate but could not be parsed or evaluated
    #[error("Expression evaluation failed for '{expression}': {message}")]
    Evaluation { expression: String, message: String },
}

impl ExpressionError {
    pub(crate) fn unsafe_expr(expression: &str, reason: impl Into<String>) -> Self {
        ExpressionError::Unsafe {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn evaluation(expression: &str, message: impl Into<String>) -> Self {
        ExpressionError::Evaluation {
            expression: expression.to_string(),
            message: message.into(),
        }
    }
}

/// What kind of expression is being evaluated
///
/// Arithmetic expressions only admit digits, whitespace and `+ - * / % ( )`
/// once variables are resolved. Conditions additionally admit comparison and
/// logical operators and quoted string literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpressionMode {
    Arithmetic,
    Condition,
}

/// A scalar value produced or consumed by expressions
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Number(f64),
    Bool(bool),
    Text(String),
    Null,
}

impl Scalar {
    /// Convert a JSON value; numeric strings become numbers
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => {
                let trimmed = s.trim();
                match trimmed.parse::<f64>() {
                    Ok(n) if !trimmed.is_empty() && n.is_finite() => Some(Scalar::Number(n)),
                    _ => Some(Scalar::Text(s.clone())),
                }
            }
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// JavaScript-like truthiness
    pub fn truthy(&self) -> bool {
        match self {
            Scalar::Number(n) => *n != 0.0 && !n.is_nan(),
            Scalar::Bool(b) => *b,
            Scalar::Text(s) => !s.is_empty(),
            Scalar::Null => false,
        }
    }

    /// Numeric view, if one exists
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|_| !s.trim().is_empty()),
            Scalar::Null => None,
        }
    }

    /// Back to JSON
    pub fn to_json(&self) -> Value {
        match self {
            Scalar::Number(n) => crate::types::number_value(*n).unwrap_or(Value::Null),
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Text(s) => Value::String(s.clone()),
            Scalar::Null => Value::Null,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Text(s) => write!(f, "{}", s),
            Scalar::Null => write!(f, "null"),
        }
    }
}

/// Variables available to an expression
#[derive(Debug, Clone, Default)]
pub struct Variables {
    values: HashMap<String, Scalar>,
}

impl Variables {
    /// Create an empty variable map
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard context: every scalar leaf of `source`, flattened
    /// with `_`-joined keys, plus `value` bound to the field's own value
    pub fn from_source(value: &Value, source: &Value) -> Self {
        let mut vars = Self::new();
        for (name, leaf) in path::flatten_scalars(source) {
            vars.insert(name, &leaf);
        }
        vars.insert("value", value);
        vars
    }

    /// Bind a name to a JSON scalar; arrays and objects are ignored
    pub fn insert(&mut self, name: impl Into<String>, value: &Value) {
        if let Some(scalar) = Scalar::from_json(value) {
            self.values.insert(name.into(), scalar);
        }
    }

    /// Look up a variable
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    /// Whether a variable is bound
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no variables are bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validate, parse and evaluate an expression
pub fn evaluate(expression: &str, vars: &Variables, mode: ExpressionMode) -> Result<Scalar, ExpressionError> {
    check_safety(expression, vars, mode)?;
    let tokens = tokenize(expression)?;
    let ast = Parser::new(expression, tokens).parse()?;
    ast.evaluate(expression, vars)
}

/// Evaluate an arithmetic expression to a finite number
pub fn evaluate_arithmetic(expression: &str, vars: &Variables) -> Result<f64, ExpressionError> {
    match evaluate(expression, vars, ExpressionMode::Arithmetic)? {
        Scalar::Number(n) if n.is_finite() => Ok(n),
        Scalar::Number(n) => Err(ExpressionError::evaluation(
            expression,
            format!("result is not finite ({})", n),
        )),
        other => Err(ExpressionError::evaluation(
            expression,
            format!("expected a numeric result, got {}", other),
        )),
    }
}

/// Evaluate a condition to a boolean using truthiness
pub fn evaluate_condition(expression: &str, vars: &Variables) -> Result<bool, ExpressionError> {
    evaluate(expression, vars, ExpressionMode::Condition).map(|s| s.truthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars() -> Variables {
        Variables::from_source(
            &json!("1200.50"),
            &json!({"premium": 1000, "state": "CA", "risk": {"units": 4}, "active": true}),
        )
    }

    #[test]
    fn test_arithmetic_with_variables() {
        let v = vars();
        assert_eq!(evaluate_arithmetic("value * 2", &v).unwrap(), 2401.0);
        assert_eq!(evaluate_arithmetic("(premium + 200) / risk_units", &v).unwrap(), 300.0);
        assert_eq!(evaluate_arithmetic("premium % 300", &v).unwrap(), 100.0);
        assert_eq!(evaluate_arithmetic("-premium + 1", &v).unwrap(), -999.0);
    }

    #[test]
    fn test_operator_precedence() {
        let v = Variables::new();
        assert_eq!(evaluate_arithmetic("2 + 3 * 4", &v).unwrap(), 14.0);
        assert_eq!(evaluate_arithmetic("(2 + 3) * 4", &v).unwrap(), 20.0);
        assert_eq!(evaluate_arithmetic("10 - 4 - 3", &v).unwrap(), 3.0);
    }

    #[test]
    fn test_conditions() {
        let v = vars();
        assert!(evaluate_condition("premium >= 1000 && state == \"CA\"", &v).unwrap());
        assert!(!evaluate_condition("premium > 1000 || state != 'CA'", &v).unwrap());
        assert!(evaluate_condition("!(premium < 10)", &v).unwrap());
        assert!(evaluate_condition("active", &v).unwrap());
        assert!(evaluate_condition("value === 1200.5", &v).unwrap());
    }

    #[test]
    fn test_unsafe_expression_rejected_before_evaluation() {
        let v = vars();
        let err = evaluate_arithmetic("value; process.exit(1)", &v).unwrap_err();
        assert!(matches!(err, ExpressionError::Unsafe { .. }));

        let err = evaluate_condition("require('fs')", &v).unwrap_err();
        assert!(matches!(err, ExpressionError::Unsafe { .. }));
    }

    #[test]
    fn test_arithmetic_rejects_comparison_characters() {
        let err = evaluate_arithmetic("premium > 5", &vars()).unwrap_err();
        assert!(matches!(err, ExpressionError::Unsafe { .. }));
    }

    #[test]
    fn test_arithmetic_rejects_text_variables() {
        let err = evaluate_arithmetic("state + 1", &vars()).unwrap_err();
        assert!(matches!(err, ExpressionError::Unsafe { .. }));
    }

    #[test]
    fn test_malformed_expression_fails_evaluation() {
        let err = evaluate_arithmetic("(1 + 2", &Variables::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation { .. }));

        let err = evaluate_arithmetic("1 +", &Variables::new()).unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation { .. }));
    }

    #[test]
    fn test_division_by_zero_is_an_error() {
        let err = evaluate_arithmetic("premium / 0", &vars()).unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation { .. }));
    }

    #[test]
    fn test_scalar_from_json() {
        assert_eq!(Scalar::from_json(&json!("42")), Some(Scalar::Number(42.0)));
        assert_eq!(Scalar::from_json(&json!("CA")), Some(Scalar::Text("CA".into())));
        assert_eq!(Scalar::from_json(&json!("")), Some(Scalar::Text(String::new())));
        assert_eq!(Scalar::from_json(&json!([1])), None);
    }
}
