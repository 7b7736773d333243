//! Core types for the field transformation system
//!
//! Field mappings are authored as loose records (`transformationType` plus a
//! free-form `transformationConfig`). They are parsed once, at load time, into
//! a closed [`Transformation`] enum so that a missing required parameter is a
//! configuration error instead of a failure on every record.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use crate::expression::ExpressionError;
use crate::types::{number_value, FieldResult};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur during field transformations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformationError {
    /// Value could not be converted to the requested type
    #[error("Type conversion failed: cannot convert {value} to {to}")]
    TypeConversion { to: String, value: String },

    /// Value could not be parsed as a date
    #[error("Invalid date: {value}")]
    InvalidDate { value: String },

    /// Arithmetic transformation with a zero divisor
    #[error("Division by zero in {operation}")]
    DivisionByZero { operation: String },

    /// Invalid transformation configuration
    #[error("Invalid transformation configuration: {message}")]
    Configuration { message: String },

    /// Expression rejected or failed
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// Lookup resolver failure (unknown table, store unavailable)
    #[error("Lookup in table '{table}' failed: {message}")]
    Lookup { table: String, message: String },
}

impl TransformationError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        TransformationError::Configuration { message: message.into() }
    }

    pub(crate) fn conversion(to: &str, value: &Value) -> Self {
        TransformationError::TypeConversion {
            to: to.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<TransformationError> for crate::Error {
    fn from(err: TransformationError) -> Self {
        crate::Error::Transformation {
            message: err.to_string(),
            source: err,
        }
    }
}

/// Declared data type of a field, used to coerce default and static values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    #[serde(alias = "float", alias = "decimal")]
    Number,
    #[serde(alias = "int")]
    Integer,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "datetime")]
    Date,
    Object,
    Array,
    /// Anything else: values pass through unchanged
    #[serde(other)]
    Any,
}

impl DataType {
    /// Coerce a value to this type
    pub fn coerce(&self, value: &Value) -> Result<Value, TransformationError> {
        match self {
            DataType::String => Ok(Value::String(to_text(value))),
            DataType::Number => to_number(value)
                .and_then(number_value)
                .ok_or_else(|| TransformationError::conversion("number", value)),
            DataType::Integer => to_number(value)
                .and_then(|n| number_value(n.trunc()))
                .ok_or_else(|| TransformationError::conversion("integer", value)),
            DataType::Boolean => Ok(Value::Bool(to_bool(value))),
            DataType::Date => parse_date(value)
                .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))),
            DataType::Object => match value {
                Value::Object(_) => Ok(value.clone()),
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(parsed @ Value::Object(_)) => Ok(parsed),
                    _ => Err(TransformationError::conversion("object", value)),
                },
                Value::Null => Ok(Value::Object(Map::new())),
                _ => Err(TransformationError::conversion("object", value)),
            },
            DataType::Array => match value {
                Value::Array(_) => Ok(value.clone()),
                Value::Null => Ok(Value::Array(Vec::new())),
                Value::String(s) => match serde_json::from_str::<Value>(s) {
                    Ok(parsed @ Value::Array(_)) => Ok(parsed),
                    _ => Ok(Value::Array(vec![value.clone()])),
                },
                other => Ok(Value::Array(vec![other.clone()])),
            },
            DataType::Any => Ok(value.clone()),
        }
    }
}

/// What a skipped field contributes to the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipBehavior {
    /// Leave the target path untouched
    #[default]
    Exclude,
    /// Write the default value, if one exists
    UseDefault,
}

/// Output formats of the `date` transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// `YYYY-MM-DD`
    #[default]
    IsoDate,
    /// `MM/DD/YYYY`
    UsDate,
    /// `DD/MM/YYYY`
    EuDate,
    /// ISO-8601 timestamp in UTC
    Timestamp,
    /// Milliseconds since the Unix epoch, as a string
    Epoch,
}

impl DateFormat {
    fn parse(name: &str) -> Result<Self, TransformationError> {
        match name.trim() {
            "YYYY-MM-DD" => Ok(DateFormat::IsoDate),
            "MM/DD/YYYY" => Ok(DateFormat::UsDate),
            "DD/MM/YYYY" => Ok(DateFormat::EuDate),
            "timestamp" | "iso" => Ok(DateFormat::Timestamp),
            "epoch" => Ok(DateFormat::Epoch),
            other => Err(TransformationError::configuration(format!(
                "unsupported date outputFormat '{}'",
                other
            ))),
        }
    }

    /// Render a parsed date
    pub fn format(&self, date: &DateTime<Utc>) -> String {
        match self {
            DateFormat::IsoDate => date.format("%Y-%m-%d").to_string(),
            DateFormat::UsDate => date.format("%m/%d/%Y").to_string(),
            DateFormat::EuDate => date.format("%d/%m/%Y").to_string(),
            DateFormat::Timestamp => date.to_rfc3339_opts(SecondsFormat::Millis, true),
            DateFormat::Epoch => date.timestamp_millis().to_string(),
        }
    }
}

/// A validated transformation, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum Transformation {
    Direct,
    Uppercase,
    Lowercase,
    Trim,
    /// `index` is `None` when configured below zero, which never matches
    Split { delimiter: String, index: Option<usize> },
    Number,
    Boolean,
    String,
    Static { value: Value, data_type: Option<DataType> },
    Date { output_format: DateFormat },
    Concat { fields: Vec<String>, separator: String },
    /// `expression` and `custom` kinds
    Expression { expression: String },
    Conditional {
        condition: String,
        true_value: Option<Value>,
        false_value: Option<Value>,
    },
    Lookup {
        table_key: String,
        not_found_value: Option<Value>,
    },
    Multiply { factor: f64 },
    Divide { divisor: f64 },
    Round { decimals: u32 },
    PerUnit { unit_size: f64 },
}

impl Transformation {
    /// Build a transformation from its kind name and free-form config
    ///
    /// Kind names are case-insensitive and accept `-` for `_`. Unknown kinds
    /// fall back to [`Transformation::Direct`] with a warning.
    pub fn from_config(kind: &str, config: &Value) -> Result<Self, TransformationError> {
        let normalized = kind.trim().to_ascii_lowercase().replace('-', "_");
        let transformation = match normalized.as_str() {
            "" | "direct" => Transformation::Direct,
            "uppercase" => Transformation::Uppercase,
            "lowercase" => Transformation::Lowercase,
            "trim" => Transformation::Trim,
            "split" => Transformation::Split {
                delimiter: config_str(config, "delimiter").unwrap_or(",").to_string(),
                index: match config_f64(config, "index")? {
                    Some(i) if i < 0.0 => None,
                    Some(i) => Some(i as usize),
                    None => Some(0),
                },
            },
            "number" => Transformation::Number,
            "boolean" => Transformation::Boolean,
            "string" => Transformation::String,
            "static" => Transformation::Static {
                value: config.get("value").cloned().unwrap_or(Value::Null),
                data_type: match config.get("dataType") {
                    Some(v) if !v.is_null() => Some(
                        serde_json::from_value(v.clone())
                            .map_err(|e| TransformationError::configuration(e.to_string()))?,
                    ),
                    _ => None,
                },
            },
            "date" => Transformation::Date {
                output_format: match config_str(config, "outputFormat").or_else(|| config_str(config, "format")) {
                    Some(name) => DateFormat::parse(name)?,
                    None => DateFormat::default(),
                },
            },
            "concat" => Transformation::Concat {
                fields: match config.get("fields") {
                    Some(Value::Array(items)) => items.iter().map(to_text).collect(),
                    Some(Value::String(s)) => s.split(',').map(|f| f.trim().to_string()).collect(),
                    None | Some(Value::Null) => Vec::new(),
                    Some(_) => return Err(TransformationError::configuration("concat fields must be an array")),
                },
                separator: config_str(config, "separator").unwrap_or(" ").to_string(),
            },
            "expression" | "custom" | "formula" => Transformation::Expression {
                expression: required_str(config, "expression", &normalized)?,
            },
            "conditional" => Transformation::Conditional {
                condition: required_str(config, "condition", &normalized)?,
                true_value: config.get("trueValue").cloned(),
                false_value: config.get("falseValue").cloned(),
            },
            "lookup" => Transformation::Lookup {
                table_key: required_str(config, "tableKey", &normalized)?,
                not_found_value: config.get("notFoundValue").filter(|v| !v.is_null()).cloned(),
            },
            "multiply" => Transformation::Multiply {
                factor: config_f64(config, "factor")?.unwrap_or(1.0),
            },
            "divide" => Transformation::Divide {
                divisor: config_f64(config, "divisor")?.unwrap_or(1.0),
            },
            "round" => Transformation::Round {
                decimals: config_f64(config, "decimals")?.map(|d| d.clamp(0.0, 15.0) as u32).unwrap_or(2),
            },
            "per_unit" | "perunit" => Transformation::PerUnit {
                unit_size: config_f64(config, "unitSize")?.unwrap_or(100.0),
            },
            other => {
                log::warn!("Unknown transformation type '{}', treating as direct", other);
                Transformation::Direct
            }
        };
        Ok(transformation)
    }
}

fn config_str<'a>(config: &'a Value, key: &str) -> Option<&'a str> {
    config.get(key).and_then(Value::as_str)
}

fn required_str(config: &Value, key: &str, kind: &str) -> Result<String, TransformationError> {
    match config_str(config, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
        _ => Err(TransformationError::configuration(format!(
            "'{}' transformation requires '{}'",
            kind, key
        ))),
    }
}

fn config_f64(config: &Value, key: &str) -> Result<Option<f64>, TransformationError> {
    match config.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => to_number(value).map(Some).ok_or_else(|| {
            TransformationError::configuration(format!("'{}' must be numeric, got {}", key, value))
        }),
    }
}

/// A single source-path to target-path directive
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawFieldMapping")]
pub struct FieldMapping {
    pub id: Option<String>,
    pub source_path: String,
    pub target_path: String,
    /// Kind name as authored, kept for audit records
    pub transformation_type: String,
    pub transformation: Transformation,
    pub is_required: bool,
    pub default_value: Option<Value>,
    pub data_type: Option<DataType>,
    pub skip_mapping: bool,
    pub skip_behavior: SkipBehavior,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFieldMapping {
    #[serde(default)]
    id: Option<String>,
    source_path: String,
    target_path: String,
    #[serde(default = "default_kind", alias = "type")]
    transformation_type: String,
    #[serde(default)]
    transformation_config: Value,
    #[serde(default)]
    is_required: bool,
    #[serde(default)]
    default_value: Option<Value>,
    #[serde(default)]
    data_type: Option<DataType>,
    #[serde(default)]
    skip_mapping: bool,
    #[serde(default)]
    skip_behavior: SkipBehavior,
}

fn default_kind() -> String {
    "direct".to_string()
}

impl TryFrom<RawFieldMapping> for FieldMapping {
    type Error = TransformationError;

    fn try_from(raw: RawFieldMapping) -> Result<Self, Self::Error> {
        let transformation = Transformation::from_config(&raw.transformation_type, &raw.transformation_config)
            .map_err(|e| match e {
                TransformationError::Configuration { message } => TransformationError::configuration(format!(
                    "field mapping {} -> {}: {}",
                    raw.source_path, raw.target_path, message
                )),
                other => other,
            })?;

        Ok(Self {
            id: raw.id,
            source_path: raw.source_path,
            target_path: raw.target_path,
            transformation_type: raw.transformation_type,
            transformation,
            is_required: raw.is_required,
            default_value: raw.default_value,
            data_type: raw.data_type,
            skip_mapping: raw.skip_mapping,
            skip_behavior: raw.skip_behavior,
        })
    }
}

impl FieldMapping {
    /// Create a mapping with the given transformation and no extras
    pub fn new(source_path: impl Into<String>, target_path: impl Into<String>, transformation: Transformation) -> Self {
        Self {
            id: None,
            source_path: source_path.into(),
            target_path: target_path.into(),
            transformation_type: kind_name(&transformation).to_string(),
            transformation,
            is_required: false,
            default_value: None,
            data_type: None,
            skip_mapping: false,
            skip_behavior: SkipBehavior::Exclude,
        }
    }

    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    pub fn skipped(mut self, behavior: SkipBehavior) -> Self {
        self.skip_mapping = true;
        self.skip_behavior = behavior;
        self
    }

    /// Default value coerced to the declared data type
    ///
    /// A default that cannot be coerced is used as authored.
    pub fn coerced_default(&self) -> Option<Value> {
        let default = self.default_value.as_ref()?;
        match self.data_type {
            Some(data_type) => match data_type.coerce(default) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!("Default for '{}' not coercible: {}", self.target_path, e);
                    Some(default.clone())
                }
            },
            None => Some(default.clone()),
        }
    }
}

fn kind_name(transformation: &Transformation) -> &'static str {
    match transformation {
        Transformation::Direct => "direct",
        Transformation::Uppercase => "uppercase",
        Transformation::Lowercase => "lowercase",
        Transformation::Trim => "trim",
        Transformation::Split { .. } => "split",
        Transformation::Number => "number",
        Transformation::Boolean => "boolean",
        Transformation::String => "string",
        Transformation::Static { .. } => "static",
        Transformation::Date { .. } => "date",
        Transformation::Concat { .. } => "concat",
        Transformation::Expression { .. } => "expression",
        Transformation::Conditional { .. } => "conditional",
        Transformation::Lookup { .. } => "lookup",
        Transformation::Multiply { .. } => "multiply",
        Transformation::Divide { .. } => "divide",
        Transformation::Round { .. } => "round",
        Transformation::PerUnit { .. } => "per_unit",
    }
}

/// Which side of an exchange a mapping applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingDirection {
    #[default]
    Request,
    Response,
}

/// An ordered group of field mappings for one direction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub direction: MappingDirection,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
}

fn default_true() -> bool {
    true
}

impl Mapping {
    pub fn new(id: impl Into<String>, direction: MappingDirection, field_mappings: Vec<FieldMapping>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            direction,
            is_active: true,
            field_mappings,
        }
    }
}

/// What to do when a required field has neither a value nor a default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredPolicy {
    /// Stop the mapping with [`crate::Error::RequiredField`]
    #[default]
    Abort,
    /// Record the field error and keep going
    Continue,
}

/// Result of running every field of a [`Mapping`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingResult {
    pub mapping_id: String,
    pub output: Value,
    pub fields: Vec<FieldResult>,
    pub success_count: usize,
    pub default_count: usize,
    pub skipped_count: usize,
    pub error_count: usize,
    pub duration_ms: u64,
}

/// String form of a value: strings verbatim, `null` as empty
pub fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric form of a value, if one exists
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Boolean form of a value
///
/// Strings are true when they read as an affirmative (`true`, `yes`, `y`,
/// `1`, `on`); numbers when non-zero; arrays and objects are always true.
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1" | "on"
        ),
        Value::Null => false,
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Parse a date from a string or epoch milliseconds
pub fn parse_date(value: &Value) -> Result<DateTime<Utc>, TransformationError> {
    let invalid = || TransformationError::InvalidDate { value: to_text(value) };

    if let Value::Number(n) = value {
        let millis = n.as_f64().ok_or_else(invalid)? as i64;
        return Utc.timestamp_millis_opt(millis).single().ok_or_else(invalid);
    }

    let text = value.as_str().ok_or_else(invalid)?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    for pattern in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, pattern) {
            if let Some(naive) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }
    }
    if let Ok(millis) = text.parse::<i64>() {
        if let Some(dt) = Utc.timestamp_millis_opt(millis).single() {
            return Ok(dt);
        }
    }
    Err(invalid())
}
