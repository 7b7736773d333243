//! Rule records: conditions, actions and their kinds
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while applying a rule's actions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    /// Current or supplied value is not numeric
    #[error("Action '{action}' on {target}: value {value} is not numeric")]
    NotNumeric {
        action: String,
        target: String,
        value: String,
    },

    /// Division action with a zero operand
    #[error("Action 'divide' on {target}: division by zero")]
    DivisionByZero { target: String },

    /// Arithmetic produced NaN or infinity
    #[error("Action '{action}' on {target}: result is not finite")]
    NonFinite { action: String, target: String },
}

/// Comparison operators of a rule condition
///
/// Unrecognized operator names load as [`Operator::Unknown`], which never
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    IsEmpty,
    IsNotEmpty,
    Unknown(String),
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "==" | "===" => Operator::Equals,
            "not_equals" | "ne" | "!=" | "!==" => Operator::NotEquals,
            "greater_than" | "gt" | ">" => Operator::GreaterThan,
            "greater_than_or_equal" | "gte" | ">=" => Operator::GreaterThanOrEqual,
            "less_than" | "lt" | "<" => Operator::LessThan,
            "less_than_or_equal" | "lte" | "<=" => Operator::LessThanOrEqual,
            "contains" => Operator::Contains,
            "not_contains" => Operator::NotContains,
            "starts_with" => Operator::StartsWith,
            "ends_with" => Operator::EndsWith,
            "in" => Operator::In,
            "not_in" => Operator::NotIn,
            "is_null" => Operator::IsNull,
            "is_not_null" => Operator::IsNotNull,
            "is_empty" => Operator::IsEmpty,
            "is_not_empty" => Operator::IsNotEmpty,
            _ => Operator::Unknown(name),
        }
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        match op {
            Operator::Equals => "equals".into(),
            Operator::NotEquals => "not_equals".into(),
            Operator::GreaterThan => ">".into(),
            Operator::GreaterThanOrEqual => ">=".into(),
            Operator::LessThan => "<".into(),
            Operator::LessThanOrEqual => "<=".into(),
            Operator::Contains => "contains".into(),
            Operator::NotContains => "not_contains".into(),
            Operator::StartsWith => "starts_with".into(),
            Operator::EndsWith => "ends_with".into(),
            Operator::In => "in".into(),
            Operator::NotIn => "not_in".into(),
            Operator::IsNull => "is_null".into(),
            Operator::IsNotNull => "is_not_null".into(),
            Operator::IsEmpty => "is_empty".into(),
            Operator::IsNotEmpty => "is_not_empty".into(),
            Operator::Unknown(name) => name,
        }
    }
}

/// Mutation kinds of a rule action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
    Append,
    Remove,
    Unknown(String),
}

impl From<String> for ActionKind {
    fn from(name: String) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "set" | "set_value" => ActionKind::Set,
            "add" | "increment" => ActionKind::Add,
            "subtract" | "decrement" => ActionKind::Subtract,
            "multiply" => ActionKind::Multiply,
            "divide" => ActionKind::Divide,
            "append" => ActionKind::Append,
            "remove" => ActionKind::Remove,
            _ => ActionKind::Unknown(name),
        }
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Set => "set".into(),
            ActionKind::Add => "add".into(),
            ActionKind::Subtract => "subtract".into(),
            ActionKind::Multiply => "multiply".into(),
            ActionKind::Divide => "divide".into(),
            ActionKind::Append => "append".into(),
            ActionKind::Remove => "remove".into(),
            ActionKind::Unknown(name) => name,
        }
    }
}

/// One predicate over a field of the working data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    #[serde(alias = "field")]
    pub field_path: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

/// One mutation of the working data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleAction {
    #[serde(alias = "type")]
    pub action_type: ActionKind,
    #[serde(alias = "field")]
    pub target_field: String,
    #[serde(default)]
    pub value: Value,
}

/// Lifecycle state of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleStatus {
    #[default]
    Active,
    Draft,
    Archived,
}

/// Which side of an exchange a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    Request,
    Response,
    #[default]
    All,
}

impl RuleScope {
    /// Whether a rule with this scope runs in `phase`
    pub fn covers(&self, phase: RuleScope) -> bool {
        *self == RuleScope::All || phase == RuleScope::All || *self == phase
    }
}

/// A named unit of business logic: AND-combined conditions plus actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalRule {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    #[serde(default)]
    pub actions: Vec<RuleAction>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub exec_order: i32,
    #[serde(default)]
    pub status: RuleStatus,
    #[serde(default)]
    pub scope: RuleScope,
}

impl ConditionalRule {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            conditions: Vec::new(),
            actions: Vec::new(),
            priority: 0,
            exec_order: 0,
            status: RuleStatus::Active,
            scope: RuleScope::All,
        }
    }

    pub fn when(mut self, field_path: impl Into<String>, operator: impl Into<String>, value: Value) -> Self {
        self.conditions.push(RuleCondition {
            field_path: field_path.into(),
            operator: Operator::from(operator.into()),
            value,
        });
        self
    }

    pub fn then(mut self, action: impl Into<String>, target_field: impl Into<String>, value: Value) -> Self {
        self.actions.push(RuleAction {
            action_type: ActionKind::from(action.into()),
            target_field: target_field.into(),
            value,
        });
        self
    }

    pub fn with_order(mut self, exec_order: i32, priority: i32) -> Self {
        self.exec_order = exec_order;
        self.priority = priority;
        self
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_status(mut self, status: RuleStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == RuleStatus::Active
    }
}

/// A rule that matched and was applied
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedRule {
    pub rule_id: String,
    pub name: String,
    pub actions_applied: usize,
}

/// A rule that matched but whose actions failed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleFailure {
    pub rule_id: String,
    pub name: String,
    pub error: String,
}

/// Outcome of running a rule set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleExecutionResult {
    pub data: Value,
    pub applied_rules: Vec<AppliedRule>,
    pub evaluated: usize,
    pub failures: Vec<RuleFailure>,
}
