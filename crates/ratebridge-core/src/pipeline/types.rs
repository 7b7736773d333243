//! Pipeline records: steps, routing rules and the pipeline itself
//!
//! Step configuration is free-form in stored records. It is parsed into a
//! typed [`StepKind`] when the record is loaded, so a `call_system` step
//! without a system code fails at load time rather than mid-run.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use crate::http::CallConfig;
use crate::rules::ConditionalRule;
use crate::transform::{Mapping, MappingDirection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_true() -> bool {
    true
}

/// One `{sourceField, tableKey, targetField}` triple of an `enrich` step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichLookup {
    pub source_field: String,
    pub table_key: String,
    pub target_field: String,
}

/// Typed step behavior
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    /// Pass-through; records the configured schema reference
    Validate { schema: Option<String> },
    /// Run request-direction mappings over the context
    MapRequest,
    /// Run request-phase rules over the context
    ApplyRules,
    /// Call an external system and store the reply at `response`
    CallSystem(CallConfig),
    /// Run response-direction mappings from `response` into the context
    MapResponse,
    /// Run response-phase rules over `response`
    ApplyResponseRules,
    /// Resolve lookups into the context
    Enrich { lookups: Vec<EnrichLookup> },
    /// Store a static reply at `response`
    MockResponse { response: Value },
    /// Unknown step type; fails when executed
    Unsupported { step_type: String },
}

impl StepKind {
    /// Parse a step type name and its config
    pub fn from_config(step_type: &str, config: &Value) -> Result<Self, String> {
        let kind = match step_type.trim().to_ascii_lowercase().as_str() {
            "validate" => StepKind::Validate {
                schema: config
                    .get("schema")
                    .or_else(|| config.get("schemaId"))
                    .and_then(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Null => None,
                        other => Some(other.to_string()),
                    }),
            },
            "map_request" | "transform" => StepKind::MapRequest,
            "apply_rules" | "execute_rules" => StepKind::ApplyRules,
            "call_system" => {
                let call: CallConfig = serde_json::from_value(config.clone())
                    .map_err(|e| format!("invalid call_system config: {}", e))?;
                if call.system.trim().is_empty() {
                    return Err("call_system requires a 'system' code".to_string());
                }
                StepKind::CallSystem(call)
            }
            "map_response" | "transform_response" => StepKind::MapResponse,
            "apply_response_rules" => StepKind::ApplyResponseRules,
            "enrich" => {
                let lookups = match config {
                    Value::Array(_) => config.clone(),
                    _ => config.get("lookups").cloned().unwrap_or(Value::Array(Vec::new())),
                };
                let lookups: Vec<EnrichLookup> = serde_json::from_value(lookups)
                    .map_err(|e| format!("invalid enrich config: {}", e))?;
                StepKind::Enrich { lookups }
            }
            "mock_response" => StepKind::MockResponse {
                response: config.get("response").cloned().unwrap_or_else(|| config.clone()),
            },
            other => {
                log::warn!("Unknown step type '{}', the step will fail if executed", other);
                StepKind::Unsupported {
                    step_type: other.to_string(),
                }
            }
        };
        Ok(kind)
    }

    /// Canonical step type name used in audit records
    pub fn type_name(&self) -> &str {
        match self {
            StepKind::Validate { .. } => "validate",
            StepKind::MapRequest => "map_request",
            StepKind::ApplyRules => "apply_rules",
            StepKind::CallSystem(_) => "call_system",
            StepKind::MapResponse => "map_response",
            StepKind::ApplyResponseRules => "apply_response_rules",
            StepKind::Enrich { .. } => "enrich",
            StepKind::MockResponse { .. } => "mock_response",
            StepKind::Unsupported { step_type } => step_type,
        }
    }
}

/// One ordered stage of a pipeline
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPipelineStep")]
pub struct PipelineStep {
    pub step_order: i32,
    pub name: String,
    pub kind: StepKind,
    pub is_active: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPipelineStep {
    #[serde(default)]
    step_order: i32,
    #[serde(alias = "type")]
    step_type: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    config: Value,
    #[serde(default = "default_true")]
    is_active: bool,
}

impl TryFrom<RawPipelineStep> for PipelineStep {
    type Error = String;

    fn try_from(raw: RawPipelineStep) -> Result<Self, Self::Error> {
        let kind = StepKind::from_config(&raw.step_type, &raw.config)
            .map_err(|e| format!("step {} ({}): {}", raw.step_order, raw.step_type, e))?;
        Ok(Self {
            step_order: raw.step_order,
            name: raw.name.unwrap_or_else(|| kind.type_name().to_string()),
            kind,
            is_active: raw.is_active,
        })
    }
}

impl PipelineStep {
    pub fn new(step_order: i32, kind: StepKind) -> Self {
        Self {
            step_order,
            name: kind.type_name().to_string(),
            kind,
            is_active: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// Matching predicate used to auto-select a pipeline
///
/// Criteria left unset are wildcards.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(default)]
    pub product_line: Option<String>,
    #[serde(default)]
    pub source_system: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl RoutingRule {
    pub fn for_product_line(product_line: impl Into<String>) -> Self {
        Self {
            product_line: Some(product_line.into()),
            is_active: true,
            ..Self::default()
        }
    }

    pub fn source_system(mut self, source_system: impl Into<String>) -> Self {
        self.source_system = Some(source_system.into());
        self
    }

    pub fn transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Routing criteria of an inbound request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub product_line: Option<String>,
    pub source_system: Option<String>,
    pub transaction_type: Option<String>,
}

impl RouteRequest {
    pub fn new(product_line: impl Into<String>, source_system: impl Into<String>) -> Self {
        Self {
            product_line: Some(product_line.into()),
            source_system: Some(source_system.into()),
            transaction_type: None,
        }
    }

    pub fn with_transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }
}

/// Steps, routing rules, mappings and rules of one integration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub steps: Vec<PipelineStep>,
    #[serde(default)]
    pub routing_rules: Vec<RoutingRule>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
    #[serde(default)]
    pub rules: Vec<ConditionalRule>,
}

impl Pipeline {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: None,
            is_active: true,
            steps: Vec::new(),
            routing_rules: Vec::new(),
            mappings: Vec::new(),
            rules: Vec::new(),
        }
    }

    pub fn with_step(mut self, step: PipelineStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_route(mut self, rule: RoutingRule) -> Self {
        self.routing_rules.push(rule);
        self
    }

    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    pub fn with_rule(mut self, rule: ConditionalRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Active steps by ascending `stepOrder`; ties keep definition order
    pub fn active_steps(&self) -> Vec<&PipelineStep> {
        let mut steps: Vec<&PipelineStep> = self.steps.iter().filter(|s| s.is_active).collect();
        steps.sort_by_key(|s| s.step_order);
        steps
    }

    /// Active mappings of one direction, in definition order
    pub fn mappings_for(&self, direction: MappingDirection) -> impl Iterator<Item = &Mapping> {
        self.mappings
            .iter()
            .filter(move |m| m.is_active && m.direction == direction)
    }

    pub fn active_routes(&self) -> impl Iterator<Item = &RoutingRule> {
        self.routing_rules.iter().filter(|r| r.is_active)
    }
}
