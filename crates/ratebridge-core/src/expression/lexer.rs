//! Safety gate and tokenizer for restricted expressions
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::{ExpressionError, ExpressionMode, Scalar, Variables};

const ARITHMETIC_CHARS: &str = "0123456789.+-*/%() \t\r\n";
const CONDITION_CHARS: &str = "<>=!&|\"'";
const KEYWORDS: [&str; 3] = ["true", "false", "null"];

/// Lexical tokens of the expression grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Not,
}

/// Reject anything outside the permitted character set
///
/// Identifiers must name a bound variable; in arithmetic mode that variable
/// must also be numeric, so that after substitution the expression contains
/// only digits, whitespace and arithmetic operators. Conditions may also use
/// comparison and logical operators, quoted string literals and the keywords
/// `true`, `false` and `null`.
pub fn check_safety(expression: &str, vars: &Variables, mode: ExpressionMode) -> Result<(), ExpressionError> {
    if expression.trim().is_empty() {
        return Err(ExpressionError::unsafe_expr(expression, "expression is empty"));
    }

    let chars: Vec<char> = expression.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            check_identifier(expression, &ident, vars, mode)?;
            continue;
        }

        if mode == ExpressionMode::Condition && (ch == '"' || ch == '\'') {
            let close = chars[i + 1..].iter().position(|c| *c == ch).ok_or_else(|| {
                ExpressionError::unsafe_expr(expression, "unterminated string literal")
            })?;
            i += close + 2;
            continue;
        }

        let allowed = ARITHMETIC_CHARS.contains(ch)
            || (mode == ExpressionMode::Condition && CONDITION_CHARS.contains(ch));
        if !allowed {
            return Err(ExpressionError::unsafe_expr(
                expression,
                format!("character '{}' is not permitted", ch),
            ));
        }
        i += 1;
    }

    Ok(())
}

fn check_identifier(
    expression: &str,
    ident: &str,
    vars: &Variables,
    mode: ExpressionMode,
) -> Result<(), ExpressionError> {
    match (vars.get(ident), mode) {
        (Some(Scalar::Number(_)), _) => Ok(()),
        (Some(_), ExpressionMode::Condition) => Ok(()),
        (Some(_), ExpressionMode::Arithmetic) => Err(ExpressionError::unsafe_expr(
            expression,
            format!("variable '{}' is not numeric", ident),
        )),
        (None, ExpressionMode::Condition) if KEYWORDS.contains(&ident) => Ok(()),
        (None, _) => Err(ExpressionError::unsafe_expr(
            expression,
            format!("unknown identifier '{}'", ident),
        )),
    }
}

/// Split an expression into tokens
pub fn tokenize(expression: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = expression.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && next.is_some_and(|c| c.is_ascii_digit())) {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let literal: String = chars[start..i].iter().collect();
            let number = literal.parse::<f64>().map_err(|_| {
                ExpressionError::evaluation(expression, format!("invalid number '{}'", literal))
            })?;
            tokens.push(Token::Number(number));
            continue;
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if ch == '"' || ch == '\'' {
            let close = chars[i + 1..].iter().position(|c| *c == ch).ok_or_else(|| {
                ExpressionError::evaluation(expression, "unterminated string literal")
            })?;
            tokens.push(Token::Str(chars[i + 1..i + 1 + close].iter().collect()));
            i += close + 2;
            continue;
        }

        let (token, width) = match (ch, next) {
            ('+', _) => (Token::Plus, 1),
            ('-', _) => (Token::Minus, 1),
            ('*', _) => (Token::Star, 1),
            ('/', _) => (Token::Slash, 1),
            ('%', _) => (Token::Percent, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('<', Some('=')) => (Token::Le, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', Some('=')) => (Token::Ge, 2),
            ('>', _) => (Token::Gt, 1),
            ('=', Some('=')) => (Token::Eq, if chars.get(i + 2) == Some(&'=') { 3 } else { 2 }),
            ('!', Some('=')) => (Token::Ne, if chars.get(i + 2) == Some(&'=') { 3 } else { 2 }),
            ('!', _) => (Token::Not, 1),
            ('&', Some('&')) => (Token::And, 2),
            ('|', Some('|')) => (Token::Or, 2),
            _ => {
                return Err(ExpressionError::evaluation(
                    expression,
                    format!("unexpected character '{}' at position {}", ch, i),
                ))
            }
        };
        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("a >= 1.5 && b !== 'x'").unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".into()),
                Token::Ge,
                Token::Number(1.5),
                Token::And,
                Token::Ident("b".into()),
                Token::Ne,
                Token::Str("x".into()),
            ]
        );
    }

    #[test]
    fn test_single_equals_is_rejected() {
        let err = tokenize("a = 1").unwrap_err();
        assert!(matches!(err, ExpressionError::Evaluation { .. }));
    }

    #[test]
    fn test_safety_allows_literals_in_conditions() {
        let mut vars = Variables::new();
        vars.insert("state", &json!("CA"));
        assert!(check_safety("state == \"C;A\"", &vars, ExpressionMode::Condition).is_ok());
        assert!(check_safety("state == \"CA\"", &vars, ExpressionMode::Arithmetic).is_err());
    }

    #[test]
    fn test_safety_rejects_member_access() {
        let mut vars = Variables::new();
        vars.insert("value", &json!(1));
        let err = check_safety("value.constructor", &vars, ExpressionMode::Arithmetic).unwrap_err();
        assert!(matches!(err, ExpressionError::Unsafe { .. }));
    }

    #[test]
    fn test_safety_rejects_brackets_and_backticks() {
        let vars = Variables::new();
        assert!(check_safety("[1][0]", &vars, ExpressionMode::Condition).is_err());
        assert!(check_safety("`1`", &vars, ExpressionMode::Condition).is_err());
    }
}
