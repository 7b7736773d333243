//! Rule evaluation and application
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::types::{
    ActionKind, AppliedRule, ConditionalRule, Operator, RuleAction, RuleCondition, RuleError,
    RuleExecutionResult, RuleFailure, RuleScope,
};
use crate::path;
use crate::transform::types::{to_number, to_text};
use crate::types::number_value;
use serde_json::Value;

/// Evaluates and applies conditional rules
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Whether every condition of `rule` holds against `data`
    pub fn evaluate(&self, rule: &ConditionalRule, data: &Value) -> bool {
        rule.conditions.iter().all(|c| self.check_condition(c, data))
    }

    /// Evaluate a single condition
    pub fn check_condition(&self, condition: &RuleCondition, data: &Value) -> bool {
        let actual = path::get(data, &condition.field_path).unwrap_or(&Value::Null);
        let expected = &condition.value;

        match &condition.operator {
            Operator::Equals => loose_equals(actual, expected),
            Operator::NotEquals => !loose_equals(actual, expected),
            Operator::GreaterThan => compare(actual, expected, |a, b| a > b),
            Operator::GreaterThanOrEqual => compare(actual, expected, |a, b| a >= b),
            Operator::LessThan => compare(actual, expected, |a, b| a < b),
            Operator::LessThanOrEqual => compare(actual, expected, |a, b| a <= b),
            Operator::Contains => contains(actual, expected),
            Operator::NotContains => !contains(actual, expected),
            Operator::StartsWith => !actual.is_null() && to_text(actual).starts_with(&to_text(expected)),
            Operator::EndsWith => !actual.is_null() && to_text(actual).ends_with(&to_text(expected)),
            Operator::In => member_of(actual, expected),
            Operator::NotIn => !member_of(actual, expected),
            Operator::IsNull => actual.is_null(),
            Operator::IsNotNull => !actual.is_null(),
            Operator::IsEmpty => is_empty(actual),
            Operator::IsNotEmpty => !is_empty(actual),
            Operator::Unknown(name) => {
                log::warn!("Unknown rule operator '{}' on {}", name, condition.field_path);
                false
            }
        }
    }

    /// Apply `rule`'s actions in order
    ///
    /// Actions run against a copy of `data`; the copy replaces `data` only
    /// when every action succeeds. Returns the number of actions applied.
    pub fn apply(&self, rule: &ConditionalRule, data: &mut Value) -> Result<usize, RuleError> {
        let mut working = data.clone();
        let mut applied = 0;
        for action in &rule.actions {
            if self.apply_action(action, &mut working)? {
                applied += 1;
            }
        }
        *data = working;
        Ok(applied)
    }

    /// Returns `false` for ignored (unknown) actions
    fn apply_action(&self, action: &RuleAction, data: &mut Value) -> Result<bool, RuleError> {
        let target = action.target_field.as_str();
        match &action.action_type {
            ActionKind::Set => path::set(data, target, action.value.clone()),
            ActionKind::Add => arithmetic(data, action, "add", |a, b| Ok(a + b))?,
            ActionKind::Subtract => arithmetic(data, action, "subtract", |a, b| Ok(a - b))?,
            ActionKind::Multiply => arithmetic(data, action, "multiply", |a, b| Ok(a * b))?,
            ActionKind::Divide => arithmetic(data, action, "divide", |a, b| {
                if b == 0.0 {
                    Err(RuleError::DivisionByZero {
                        target: target.to_string(),
                    })
                } else {
                    Ok(a / b)
                }
            })?,
            ActionKind::Append => {
                let appended = match path::remove(data, target) {
                    None | Some(Value::Null) => Value::Array(vec![action.value.clone()]),
                    Some(Value::Array(mut items)) => {
                        items.push(action.value.clone());
                        Value::Array(items)
                    }
                    Some(other) => Value::Array(vec![other, action.value.clone()]),
                };
                path::set(data, target, appended);
            }
            ActionKind::Remove => {
                path::remove(data, target);
            }
            ActionKind::Unknown(name) => {
                log::warn!("Ignoring unknown rule action '{}' on {}", name, target);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run a rule set against `data`
    ///
    /// Only active rules whose scope covers `phase` take part. Rules run by
    /// ascending `execOrder`, then descending `priority`; a rule whose
    /// actions fail is recorded and skipped, and the remaining rules still
    /// run.
    pub fn execute(&self, rules: &[ConditionalRule], data: &Value, phase: RuleScope) -> RuleExecutionResult {
        let mut ordered: Vec<&ConditionalRule> = rules
            .iter()
            .filter(|r| r.is_active() && r.scope.covers(phase))
            .collect();
        ordered.sort_by(|a, b| a.exec_order.cmp(&b.exec_order).then(b.priority.cmp(&a.priority)));

        let mut result = RuleExecutionResult {
            data: data.clone(),
            applied_rules: Vec::new(),
            evaluated: 0,
            failures: Vec::new(),
        };

        for rule in ordered {
            result.evaluated += 1;
            if !self.evaluate(rule, &result.data) {
                continue;
            }
            match self.apply(rule, &mut result.data) {
                Ok(actions_applied) => {
                    log::debug!("Rule '{}' applied {} action(s)", rule.name, actions_applied);
                    result.applied_rules.push(AppliedRule {
                        rule_id: rule.id.clone(),
                        name: rule.name.clone(),
                        actions_applied,
                    });
                }
                Err(e) => {
                    log::warn!("Rule '{}' failed: {}", rule.name, e);
                    result.failures.push(RuleFailure {
                        rule_id: rule.id.clone(),
                        name: rule.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        result
    }
}

fn arithmetic(
    data: &mut Value,
    action: &RuleAction,
    name: &str,
    op: impl Fn(f64, f64) -> Result<f64, RuleError>,
) -> Result<(), RuleError> {
    let target = action.target_field.as_str();
    let not_numeric = |value: &Value| RuleError::NotNumeric {
        action: name.to_string(),
        target: target.to_string(),
        value: value.to_string(),
    };

    let current = match path::get(data, target) {
        None | Some(Value::Null) => 0.0,
        Some(value) => to_number(value).ok_or_else(|| not_numeric(value))?,
    };
    let operand = to_number(&action.value).ok_or_else(|| not_numeric(&action.value))?;
    let result = number_value(op(current, operand)?).ok_or_else(|| RuleError::NonFinite {
        action: name.to_string(),
        target: target.to_string(),
    })?;
    path::set(data, target, result);
    Ok(())
}

fn loose_equals(actual: &Value, expected: &Value) -> bool {
    if actual == expected {
        return true;
    }
    match (actual, expected) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => false,
        _ => match (to_number(actual), to_number(expected)) {
            (Some(a), Some(b)) if !actual.is_boolean() && !expected.is_boolean() => a == b,
            _ => to_text(actual) == to_text(expected),
        },
    }
}

fn compare(actual: &Value, expected: &Value, op: impl Fn(f64, f64) -> bool) -> bool {
    match (to_number(actual), to_number(expected)) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| loose_equals(item, expected)),
        Value::Null => false,
        Value::Object(map) => map.contains_key(&to_text(expected)),
        other => to_text(other).contains(&to_text(expected)),
    }
}

fn member_of(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(items) => items.iter().any(|item| loose_equals(actual, item)),
        Value::String(list) => {
            let needle = to_text(actual);
            list.split(',').any(|item| item.trim() == needle)
        }
        _ => false,
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
