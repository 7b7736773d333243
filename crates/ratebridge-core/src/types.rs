//! Audit and result records returned by the engine
//!
//! These records describe what happened during a run: one [`FieldResult`] per
//! field mapping, one [`StepResult`] per executed pipeline step and an
//! [`ExecutionResult`] for the whole pipeline. They are serialized with
//! camelCase keys and never persisted by the core.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use crate::error::ErrorCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest integer that survives a round trip through `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert an `f64` into a JSON number
///
/// Integral values are emitted as integers so that `1200.0` serializes as
/// `1200`. Returns `None` for NaN and infinities.
pub fn number_value(n: f64) -> Option<Value> {
    if !n.is_finite() {
        return None;
    }
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        return Some(Value::from(n as i64));
    }
    serde_json::Number::from_f64(n).map(Value::Number)
}

/// Outcome of a single field mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    /// The transformation produced a value
    Success,
    /// Nothing was written for this field
    Skipped,
    /// The field failed and had no default to fall back to
    Error,
    /// The default value was used
    Default,
}

/// Per-field audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub source_path: String,
    pub target_path: String,
    pub status: FieldStatus,
    /// Transformation kind as configured
    pub transformation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when a required field had neither a value nor a default
    #[serde(default)]
    pub fatal: bool,
    pub duration_us: u64,
}

impl FieldResult {
    /// Whether this field wrote a value to its target path
    pub fn produced_output(&self) -> bool {
        matches!(self.status, FieldStatus::Success | FieldStatus::Default) && self.output_value.is_some()
    }
}

/// Outcome of a pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Failed,
}

/// Per-step audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
    pub step_order: i32,
    pub name: String,
    pub step_type: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Step-specific notes (counts, applied rules, system code, ...)
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl StepResult {
    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Result of a whole pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub pipeline_id: String,
    pub input: Value,
    pub output: Value,
    pub steps: Vec<StepResult>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
}

impl ExecutionResult {
    /// The step that stopped the run, if any
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}
