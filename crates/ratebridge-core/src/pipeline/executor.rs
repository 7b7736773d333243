//! Pipeline execution
//!
//! A run threads one context through the active steps of a pipeline in
//! ascending `stepOrder`. The first failing step stops the run; the result
//! carries every completed step plus the failed one. A failed step leaves
//! the context as it was before that step, earlier steps are not undone.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::routing::{self, RouteMatch};
use super::types::{EnrichLookup, Pipeline, PipelineStep, RouteRequest, StepKind};
use crate::config::{ConfigBundle, ConfigProvider};
use crate::error::{Error, Result};
use crate::http::{CallConfig, SystemInvoker};
use crate::lookup::LookupResolver;
use crate::path;
use crate::rules::{RuleEvaluator, RuleScope};
use crate::transform::types::to_text;
use crate::transform::{MappingDirection, RequiredPolicy, TransformationEngine};
use crate::types::{ExecutionResult, StepResult, StepStatus};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};

/// Context key holding the latest external-system reply
pub const RESPONSE_KEY: &str = "response";

/// Runs pipelines against inbound payloads
pub struct PipelineExecutor {
    config: Arc<dyn ConfigProvider>,
    lookups: Arc<dyn LookupResolver>,
    engine: TransformationEngine,
    rules: RuleEvaluator,
    invoker: SystemInvoker,
}

impl PipelineExecutor {
    pub fn new(config: Arc<dyn ConfigProvider>, lookups: Arc<dyn LookupResolver>, invoker: SystemInvoker) -> Self {
        Self {
            config,
            engine: TransformationEngine::new(lookups.clone()),
            lookups,
            rules: RuleEvaluator::new(),
            invoker,
        }
    }

    /// Executor serving pipelines, systems and lookups from one bundle
    pub fn from_bundle(bundle: ConfigBundle, invoker: SystemInvoker) -> Self {
        let bundle = Arc::new(bundle);
        Self::new(bundle.clone(), bundle, invoker)
    }

    /// Execute the pipeline `pipeline_id` against `input`
    ///
    /// Unknown or inactive pipelines are errors; step failures are reported
    /// in the returned [`ExecutionResult`].
    pub async fn execute(&self, pipeline_id: &str, input: Value) -> Result<ExecutionResult> {
        let pipeline = self
            .config
            .pipeline(pipeline_id)
            .await?
            .ok_or_else(|| Error::PipelineNotFound {
                pipeline_id: pipeline_id.to_string(),
            })?;
        if !pipeline.is_active {
            return Err(Error::PipelineInactive {
                pipeline_id: pipeline_id.to_string(),
            });
        }
        Ok(self.execute_pipeline(&pipeline, input).await)
    }

    /// Select the best-matching active pipeline for `request`
    pub async fn route(&self, request: &RouteRequest) -> Result<Option<RouteMatch>> {
        let pipelines = self.config.pipelines().await?;
        Ok(routing::select(&pipelines, request))
    }

    /// Route, then execute the selected pipeline
    pub async fn execute_routed(&self, request: &RouteRequest, input: Value) -> Result<ExecutionResult> {
        let selected = self.route(request).await?.ok_or_else(|| Error::RouteNotFound {
            product_line: request.product_line.clone(),
            source_system: request.source_system.clone(),
            transaction_type: request.transaction_type.clone(),
        })?;
        info!(pipeline_id = %selected.pipeline_id, score = selected.score, "request routed");
        self.execute(&selected.pipeline_id, input).await
    }

    /// Run every active step of `pipeline`, stopping at the first failure
    pub async fn execute_pipeline(&self, pipeline: &Pipeline, input: Value) -> ExecutionResult {
        let span = info_span!("pipeline", pipeline_id = %pipeline.id);
        async move {
            let start = Instant::now();
            let mut context = input.clone();
            let mut steps = Vec::new();

            for step in pipeline.active_steps() {
                let step_start = Instant::now();
                let mut working = context.clone();
                let outcome = self
                    .run_step(pipeline, step, &mut working)
                    .instrument(info_span!("step", step = %step.name, order = step.step_order))
                    .await;
                let duration_ms = step_start.elapsed().as_millis() as u64;

                match outcome {
                    Ok(details) => {
                        debug!(step = %step.name, duration_ms, "step completed");
                        context = working;
                        steps.push(step_result(step, StepStatus::Success, duration_ms, None, details));
                    }
                    Err(err) => {
                        warn!(step = %step.name, duration_ms, error = %err, "step failed, stopping pipeline");
                        let message = err.to_string();
                        steps.push(step_result(
                            step,
                            StepStatus::Failed,
                            duration_ms,
                            Some(message.clone()),
                            Value::Null,
                        ));
                        return ExecutionResult {
                            success: false,
                            pipeline_id: pipeline.id.clone(),
                            input,
                            output: context,
                            steps,
                            duration_ms: start.elapsed().as_millis() as u64,
                            error: Some(format!(
                                "Step {} '{}' ({}) failed: {}",
                                step.step_order,
                                step.name,
                                step.kind.type_name(),
                                message
                            )),
                            error_category: Some(err.category()),
                        };
                    }
                }
            }

            let duration_ms = start.elapsed().as_millis() as u64;
            info!(steps = steps.len(), duration_ms, "pipeline completed");
            ExecutionResult {
                success: true,
                pipeline_id: pipeline.id.clone(),
                input,
                output: context,
                steps,
                duration_ms,
                error: None,
                error_category: None,
            }
        }
        .instrument(span)
        .await
    }

    async fn run_step(&self, pipeline: &Pipeline, step: &PipelineStep, context: &mut Value) -> Result<Value> {
        match &step.kind {
            StepKind::Validate { schema } => Ok(json!({"schema": schema, "enforced": false})),
            StepKind::MapRequest => self.map_request(pipeline, context).await,
            StepKind::ApplyRules => Ok(self.apply_rules(pipeline, context, RuleScope::Request)),
            StepKind::CallSystem(call) => self.call_system(call, context).await,
            StepKind::MapResponse => self.map_response(pipeline, context).await,
            StepKind::ApplyResponseRules => Ok(self.apply_response_rules(pipeline, context)),
            StepKind::Enrich { lookups } => self.enrich(lookups, context).await,
            StepKind::MockResponse { response } => {
                path::set(context, RESPONSE_KEY, response.clone());
                Ok(json!({"mocked": true}))
            }
            StepKind::Unsupported { step_type } => {
                Err(Error::configuration(format!("Unsupported step type '{}'", step_type)))
            }
        }
    }

    async fn map_request(&self, pipeline: &Pipeline, context: &mut Value) -> Result<Value> {
        let mut reports = Vec::new();
        for mapping in pipeline.mappings_for(MappingDirection::Request) {
            if mapping.field_mappings.is_empty() {
                reports.push(json!({"mappingId": mapping.id, "skipped": "no field mappings"}));
                continue;
            }
            let result = self.engine.execute_mapping(mapping, context, RequiredPolicy::Abort).await?;
            reports.push(mapping_report(&result));
            ensure_object(context);
            path::merge(context, result.output);
        }
        Ok(json!({"mappings": reports}))
    }

    async fn map_response(&self, pipeline: &Pipeline, context: &mut Value) -> Result<Value> {
        let mut reports = Vec::new();
        for mapping in pipeline.mappings_for(MappingDirection::Response) {
            if mapping.field_mappings.is_empty() {
                reports.push(json!({"mappingId": mapping.id, "skipped": "no field mappings"}));
                continue;
            }
            let source = path::get(context, RESPONSE_KEY).cloned().unwrap_or(Value::Null);
            let result = self.engine.execute_mapping(mapping, &source, RequiredPolicy::Abort).await?;
            reports.push(mapping_report(&result));
            ensure_object(context);
            path::merge(context, result.output);
        }
        Ok(json!({"mappings": reports}))
    }

    fn apply_rules(&self, pipeline: &Pipeline, context: &mut Value, phase: RuleScope) -> Value {
        let result = self.rules.execute(&pipeline.rules, context, phase);
        let details = rules_report(&result);
        *context = result.data;
        details
    }

    fn apply_response_rules(&self, pipeline: &Pipeline, context: &mut Value) -> Value {
        let response = path::get(context, RESPONSE_KEY).cloned().unwrap_or(Value::Null);
        let result = self.rules.execute(&pipeline.rules, &response, RuleScope::Response);
        let details = rules_report(&result);
        path::set(context, RESPONSE_KEY, result.data);
        details
    }

    async fn call_system(&self, call: &CallConfig, context: &mut Value) -> Result<Value> {
        let system = self
            .config
            .system(&call.system)
            .await?
            .ok_or_else(|| Error::SystemNotFound {
                code: call.system.clone(),
            })?;

        let outcome = self.invoker.invoke(&system, call, context).await?;
        path::set(context, RESPONSE_KEY, outcome.response);
        Ok(json!({
            "system": system.code,
            "format": system.format.to_string(),
            "url": outcome.url,
            "status": outcome.status,
            "durationMs": outcome.duration_ms,
        }))
    }

    async fn enrich(&self, lookups: &[EnrichLookup], context: &mut Value) -> Result<Value> {
        let mut enriched = Vec::new();
        let mut skipped = Vec::new();
        let mut misses = Vec::new();

        for lookup in lookups {
            let Some(source) = path::get_present(context, &lookup.source_field) else {
                skipped.push(lookup.source_field.clone());
                continue;
            };
            let key = to_text(source);
            match self.lookups.lookup(&lookup.table_key, &key).await? {
                Some(value) => {
                    path::set(context, &lookup.target_field, value);
                    enriched.push(lookup.target_field.clone());
                }
                None => {
                    log::debug!("Enrich miss: table '{}' has no key '{}'", lookup.table_key, key);
                    misses.push(json!({"table": lookup.table_key, "key": key}));
                }
            }
        }

        Ok(json!({"enriched": enriched, "skipped": skipped, "misses": misses}))
    }
}

fn ensure_object(context: &mut Value) {
    if !context.is_object() {
        *context = Value::Object(Map::new());
    }
}

fn step_result(
    step: &PipelineStep,
    status: StepStatus,
    duration_ms: u64,
    error: Option<String>,
    details: Value,
) -> StepResult {
    StepResult {
        step_order: step.step_order,
        name: step.name.clone(),
        step_type: step.kind.type_name().to_string(),
        status,
        duration_ms,
        error,
        details,
    }
}

fn mapping_report(result: &crate::transform::MappingResult) -> Value {
    json!({
        "mappingId": result.mapping_id,
        "successCount": result.success_count,
        "defaultCount": result.default_count,
        "skippedCount": result.skipped_count,
        "errorCount": result.error_count,
    })
}

fn rules_report(result: &crate::rules::RuleExecutionResult) -> Value {
    json!({
        "evaluated": result.evaluated,
        "appliedRules": result.applied_rules,
        "failures": result.failures,
    })
}
