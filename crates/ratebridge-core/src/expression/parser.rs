//! Recursive-descent parser and evaluator
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or         := and ( "||" and )*
//! and        := equality ( "&&" equality )*
//! equality   := comparison ( ( "==" | "!=" ) comparison )*
//! comparison := additive ( ( "<" | "<=" | ">" | ">=" ) additive )*
//! additive   := term ( ( "+" | "-" ) term )*
//! term       := unary ( ( "*" | "/" | "%" ) unary )*
//! unary      := ( "!" | "-" | "+" ) unary | primary
//! primary    := number | string | identifier | "(" or ")"
//! ```
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::lexer::Token;
use super::{ExpressionError, Scalar, Variables};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
}

/// Parsed expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Scalar),
    Variable(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

/// Parser over a token stream
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    /// Create a parser; `source` is kept for error messages
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self { source, tokens, pos: 0 }
    }

    /// Parse the whole token stream into one expression
    pub fn parse(mut self) -> Result<Expr, ExpressionError> {
        let expr = self.parse_or()?;
        if let Some(token) = self.peek() {
            return Err(self.error(format!("unexpected token {:?}", token)));
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> ExpressionError {
        ExpressionError::evaluation(self.source, message)
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, ExpressionError>,
        ops: &[(Token, BinaryOp)],
    ) -> Result<Expr, ExpressionError> {
        let mut left = next(self)?;
        loop {
            let op = match self.peek() {
                Some(token) => ops.iter().find(|(t, _)| t == token).map(|(_, op)| *op),
                None => None,
            };
            let Some(op) = op else { break };
            self.pos += 1;
            let right = next(self)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(Self::parse_and, &[(Token::Or, BinaryOp::Or)])
    }

    fn parse_and(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(Self::parse_equality, &[(Token::And, BinaryOp::And)])
    }

    fn parse_equality(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::parse_comparison,
            &[(Token::Eq, BinaryOp::Eq), (Token::Ne, BinaryOp::Ne)],
        )
    }

    fn parse_comparison(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::parse_additive,
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::parse_term,
            &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)],
        )
    }

    fn parse_term(&mut self) -> Result<Expr, ExpressionError> {
        self.binary_level(
            Self::parse_unary,
            &[
                (Token::Star, BinaryOp::Mul),
                (Token::Slash, BinaryOp::Div),
                (Token::Percent, BinaryOp::Rem),
            ],
        )
    }

    fn parse_unary(&mut self) -> Result<Expr, ExpressionError> {
        let op = match self.peek() {
            Some(Token::Not) => Some(UnaryOp::Not),
            Some(Token::Minus) => Some(UnaryOp::Neg),
            Some(Token::Plus) => Some(UnaryOp::Plus),
            _ => None,
        };
        match op {
            Some(op) => {
                self.pos += 1;
                let operand = self.parse_unary()?;
                Ok(Expr::Unary(op, Box::new(operand)))
            }
            None => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Literal(Scalar::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Scalar::Text(s))),
            Some(Token::Ident(name)) => Ok(match name.as_str() {
                "true" => Expr::Literal(Scalar::Bool(true)),
                "false" => Expr::Literal(Scalar::Bool(false)),
                "null" => Expr::Literal(Scalar::Null),
                _ => Expr::Variable(name),
            }),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("missing closing parenthesis")),
                }
            }
            Some(token) => Err(self.error(format!("unexpected token {:?}", token))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

impl Expr {
    /// Evaluate against a variable map
    pub fn evaluate(&self, source: &str, vars: &Variables) -> Result<Scalar, ExpressionError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => vars.get(name).cloned().ok_or_else(|| {
                ExpressionError::evaluation(source, format!("unbound variable '{}'", name))
            }),
            Expr::Unary(op, operand) => {
                let value = operand.evaluate(source, vars)?;
                match op {
                    UnaryOp::Not => Ok(Scalar::Bool(!value.truthy())),
                    UnaryOp::Neg => numeric(source, &value).map(|n| Scalar::Number(-n)),
                    UnaryOp::Plus => numeric(source, &value).map(Scalar::Number),
                }
            }
            Expr::Binary(BinaryOp::And, left, right) => {
                let l = left.evaluate(source, vars)?;
                if !l.truthy() {
                    return Ok(Scalar::Bool(false));
                }
                Ok(Scalar::Bool(right.evaluate(source, vars)?.truthy()))
            }
            Expr::Binary(BinaryOp::Or, left, right) => {
                let l = left.evaluate(source, vars)?;
                if l.truthy() {
                    return Ok(Scalar::Bool(true));
                }
                Ok(Scalar::Bool(right.evaluate(source, vars)?.truthy()))
            }
            Expr::Binary(op, left, right) => {
                let l = left.evaluate(source, vars)?;
                let r = right.evaluate(source, vars)?;
                apply_binary(source, *op, &l, &r)
            }
        }
    }
}

fn numeric(source: &str, value: &Scalar) -> Result<f64, ExpressionError> {
    value.as_number().ok_or_else(|| {
        ExpressionError::evaluation(source, format!("'{}' is not a number", value))
    })
}

fn apply_binary(source: &str, op: BinaryOp, l: &Scalar, r: &Scalar) -> Result<Scalar, ExpressionError> {
    match op {
        BinaryOp::Add => match (l, r) {
            (Scalar::Text(a), b) => Ok(Scalar::Text(format!("{}{}", a, b))),
            (a, Scalar::Text(b)) => Ok(Scalar::Text(format!("{}{}", a, b))),
            _ => Ok(Scalar::Number(numeric(source, l)? + numeric(source, r)?)),
        },
        BinaryOp::Sub => Ok(Scalar::Number(numeric(source, l)? - numeric(source, r)?)),
        BinaryOp::Mul => Ok(Scalar::Number(numeric(source, l)? * numeric(source, r)?)),
        BinaryOp::Div | BinaryOp::Rem => {
            let divisor = numeric(source, r)?;
            if divisor == 0.0 {
                return Err(ExpressionError::evaluation(source, "division by zero"));
            }
            let dividend = numeric(source, l)?;
            Ok(Scalar::Number(if op == BinaryOp::Div {
                dividend / divisor
            } else {
                dividend % divisor
            }))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (l.as_number(), r.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => Some(l.to_string().cmp(&r.to_string())),
            };
            let Some(ordering) = ordering else {
                return Ok(Scalar::Bool(false));
            };
            Ok(Scalar::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Eq => Ok(Scalar::Bool(loose_eq(l, r))),
        BinaryOp::Ne => Ok(Scalar::Bool(!loose_eq(l, r))),
        BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit in Expr::evaluate"),
    }
}

fn loose_eq(l: &Scalar, r: &Scalar) -> bool {
    match (l, r) {
        (Scalar::Null, Scalar::Null) => true,
        (Scalar::Null, _) | (_, Scalar::Null) => false,
        (Scalar::Text(a), Scalar::Text(b)) => a == b,
        (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
        _ => match (l.as_number(), r.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => l.to_string() == r.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::lexer::tokenize;

    fn parse(src: &str) -> Expr {
        Parser::new(src, tokenize(src).unwrap()).parse().unwrap()
    }

    #[test]
    fn test_parse_precedence_tree() {
        let expr = parse("1 + 2 * 3");
        assert_eq!(
            expr,
            Expr::Binary(
                BinaryOp::Add,
                Box::new(Expr::Literal(Scalar::Number(1.0))),
                Box::new(Expr::Binary(
                    BinaryOp::Mul,
                    Box::new(Expr::Literal(Scalar::Number(2.0))),
                    Box::new(Expr::Literal(Scalar::Number(3.0))),
                )),
            )
        );
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let tokens = tokenize("1 2").unwrap();
        assert!(Parser::new("1 2", tokens).parse().is_err());
    }

    #[test]
    fn test_short_circuit_skips_unbound_right_side() {
        let vars = Variables::new();
        let expr = parse("false && missing");
        assert_eq!(expr.evaluate("false && missing", &vars).unwrap(), Scalar::Bool(false));
    }

    #[test]
    fn test_loose_equality() {
        assert!(loose_eq(&Scalar::Text("5".into()), &Scalar::Number(5.0)));
        assert!(!loose_eq(&Scalar::Null, &Scalar::Number(0.0)));
        assert!(loose_eq(&Scalar::Bool(true), &Scalar::Number(1.0)));
    }
}
