//! Conditional business rules
//!
//! A [`ConditionalRule`] carries AND-combined [`RuleCondition`]s and an
//! ordered list of [`RuleAction`]s. The [`RuleEvaluator`] checks conditions
//! against a working data object and applies the actions of matching rules.
//! A failing rule never aborts the rule set.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

pub mod evaluator;
pub mod types;


pub use evaluator::RuleEvaluator;
pub use types::{
    ActionKind, AppliedRule, ConditionalRule, Operator, RuleAction, RuleCondition, RuleError,
    RuleExecutionResult, RuleFailure, RuleScope, RuleStatus,
};
