//! Transformation engine implementation
//!
//! Runs one [`FieldMapping`] against a source record and produces a
//! [`FieldResult`]; runs a whole [`Mapping`] and assembles its output.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::types::{
    parse_date, to_bool, to_number, to_text, FieldMapping, Mapping, MappingResult, RequiredPolicy,
    SkipBehavior, Transformation, TransformationError,
};
use crate::error::{Error, Result};
use crate::expression::{self, Variables};
use crate::lookup::{InMemoryLookup, LookupResolver};
use crate::path;
use crate::types::{number_value, FieldResult, FieldStatus};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;

/// Executes field mappings
#[derive(Clone)]
pub struct TransformationEngine {
    lookups: Arc<dyn LookupResolver>,
}

impl std::fmt::Debug for TransformationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformationEngine").finish_non_exhaustive()
    }
}

impl Default for TransformationEngine {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryLookup::new()))
    }
}

impl TransformationEngine {
    /// Create an engine that resolves `lookup` transformations through `lookups`
    pub fn new(lookups: Arc<dyn LookupResolver>) -> Self {
        Self { lookups }
    }

    /// Run one field mapping
    ///
    /// `source` is where the field value is read from; `context` is the
    /// record that `concat`, `expression` and `conditional` read other fields
    /// from. Errors never escape: they are reported on the result.
    pub async fn transform_field(&self, mapping: &FieldMapping, source: &Value, context: &Value) -> FieldResult {
        let start = Instant::now();
        let mut result = FieldResult {
            source_path: mapping.source_path.clone(),
            target_path: mapping.target_path.clone(),
            status: FieldStatus::Skipped,
            transformation: mapping.transformation_type.clone(),
            source_value: None,
            output_value: None,
            error: None,
            fatal: false,
            duration_us: 0,
        };

        if mapping.skip_mapping {
            if mapping.skip_behavior == SkipBehavior::UseDefault {
                if let Some(default) = mapping.coerced_default() {
                    result.status = FieldStatus::Default;
                    result.output_value = Some(default);
                }
            }
            return finish(result, start);
        }

        let value = match path::get_present(source, &mapping.source_path) {
            Some(value) => value.clone(),
            None => {
                match mapping.coerced_default() {
                    Some(default) => {
                        result.status = FieldStatus::Default;
                        result.output_value = Some(default);
                    }
                    None if mapping.is_required => {
                        result.status = FieldStatus::Error;
                        result.fatal = true;
                        result.error = Some(
                            Error::RequiredField {
                                path: mapping.source_path.clone(),
                            }
                            .to_string(),
                        );
                    }
                    None => {}
                }
                return finish(result, start);
            }
        };

        result.source_value = Some(value.clone());
        match self.apply(&mapping.transformation, &value, context).await {
            Ok(output) => {
                result.status = FieldStatus::Success;
                result.output_value = Some(output);
            }
            Err(e) => {
                log::debug!(
                    "Transformation '{}' failed for {}: {}",
                    mapping.transformation_type,
                    mapping.source_path,
                    e
                );
                result.error = Some(e.to_string());
                match mapping.coerced_default() {
                    Some(default) => {
                        result.status = FieldStatus::Default;
                        result.output_value = Some(default);
                    }
                    None => result.status = FieldStatus::Error,
                }
            }
        }
        finish(result, start)
    }

    /// Apply one transformation to a value
    pub async fn apply(
        &self,
        transformation: &Transformation,
        value: &Value,
        context: &Value,
    ) -> std::result::Result<Value, TransformationError> {
        match transformation {
            Transformation::Direct => Ok(value.clone()),
            Transformation::Uppercase => Ok(Value::String(to_text(value).to_uppercase())),
            Transformation::Lowercase => Ok(Value::String(to_text(value).to_lowercase())),
            Transformation::Trim => Ok(Value::String(to_text(value).trim().to_string())),
            Transformation::Split { delimiter, index } => {
                let text = to_text(value);
                Ok(index
                    .and_then(|i| text.split(delimiter.as_str()).nth(i))
                    .map(|part| Value::String(part.trim().to_string()))
                    .unwrap_or_else(|| value.clone()))
            }
            Transformation::Number => {
                numeric(value, "number").and_then(|n| finite(n, value))
            }
            Transformation::Boolean => Ok(Value::Bool(to_bool(value))),
            Transformation::String => Ok(Value::String(to_text(value))),
            Transformation::Static { value: fixed, data_type } => match data_type {
                Some(data_type) => data_type.coerce(fixed),
                None => Ok(fixed.clone()),
            },
            Transformation::Date { output_format } => {
                let date = parse_date(value)?;
                Ok(Value::String(output_format.format(&date)))
            }
            Transformation::Concat { fields, separator } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|field| path::get(context, field).map(to_text).unwrap_or_default())
                    .collect();
                Ok(Value::String(parts.join(separator)))
            }
            Transformation::Expression { expression } => {
                let vars = Variables::from_source(value, context);
                let n = expression::evaluate_arithmetic(expression, &vars)?;
                finite(n, value)
            }
            Transformation::Conditional {
                condition,
                true_value,
                false_value,
            } => {
                let vars = Variables::from_source(value, context);
                let branch = if expression::evaluate_condition(condition, &vars)? {
                    true_value
                } else {
                    false_value
                };
                Ok(branch.clone().unwrap_or_else(|| value.clone()))
            }
            Transformation::Lookup {
                table_key,
                not_found_value,
            } => {
                let key = to_text(value);
                let found = self
                    .lookups
                    .lookup(table_key, &key)
                    .await
                    .map_err(|e| TransformationError::Lookup {
                        table: table_key.clone(),
                        message: e.to_string(),
                    })?;
                Ok(match found {
                    Some(mapped) => mapped,
                    None => {
                        log::debug!("Lookup miss in '{}' for key '{}'", table_key, key);
                        not_found_value.clone().unwrap_or_else(|| value.clone())
                    }
                })
            }
            Transformation::Multiply { factor } => {
                let n = numeric(value, "multiply")?;
                finite(n * factor, value)
            }
            Transformation::Divide { divisor } => {
                if *divisor == 0.0 {
                    return Err(TransformationError::DivisionByZero {
                        operation: "divide".to_string(),
                    });
                }
                let n = numeric(value, "divide")?;
                finite(n / divisor, value)
            }
            Transformation::Round { decimals } => {
                let n = numeric(value, "round")?;
                let scale = 10f64.powi(*decimals as i32);
                finite((n * scale).round() / scale, value)
            }
            Transformation::PerUnit { unit_size } => {
                if *unit_size == 0.0 {
                    return Err(TransformationError::DivisionByZero {
                        operation: "per_unit".to_string(),
                    });
                }
                let n = numeric(value, "per_unit")?;
                finite(n / unit_size, value)
            }
        }
    }

    /// Run every field mapping of `mapping` against `source`
    ///
    /// Outputs of `success` and `default` fields are written to their target
    /// paths in a fresh object. With [`RequiredPolicy::Abort`], a required
    /// field with no value and no default stops the mapping.
    pub async fn execute_mapping(
        &self,
        mapping: &Mapping,
        source: &Value,
        policy: RequiredPolicy,
    ) -> Result<MappingResult> {
        let start = Instant::now();
        let mut output = Value::Object(Map::new());
        let mut fields = Vec::with_capacity(mapping.field_mappings.len());
        let (mut success, mut defaulted, mut skipped, mut errors) = (0, 0, 0, 0);

        for field in &mapping.field_mappings {
            let result = self.transform_field(field, source, source).await;

            if result.fatal && policy == RequiredPolicy::Abort {
                log::warn!(
                    "Mapping '{}' aborted: required field '{}' is missing",
                    mapping.id,
                    field.source_path
                );
                return Err(Error::RequiredField {
                    path: field.source_path.clone(),
                });
            }

            match result.status {
                FieldStatus::Success => success += 1,
                FieldStatus::Default => defaulted += 1,
                FieldStatus::Skipped => skipped += 1,
                FieldStatus::Error => errors += 1,
            }
            if result.produced_output() {
                if let Some(value) = &result.output_value {
                    path::set(&mut output, &field.target_path, value.clone());
                }
            }
            fields.push(result);
        }

        Ok(MappingResult {
            mapping_id: mapping.id.clone(),
            output,
            fields,
            success_count: success,
            default_count: defaulted,
            skipped_count: skipped,
            error_count: errors,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

fn finish(mut result: FieldResult, start: Instant) -> FieldResult {
    result.duration_us = start.elapsed().as_micros() as u64;
    result
}

fn numeric(value: &Value, operation: &str) -> std::result::Result<f64, TransformationError> {
    to_number(value).ok_or_else(|| TransformationError::TypeConversion {
        to: format!("number ({})", operation),
        value: value.to_string(),
    })
}

fn finite(n: f64, input: &Value) -> std::result::Result<Value, TransformationError> {
    number_value(n).ok_or_else(|| TransformationError::conversion("finite number", input))
}
