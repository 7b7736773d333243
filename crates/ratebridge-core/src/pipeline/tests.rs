//! Tests for pipeline execution and routing
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::*;
use crate::config::ConfigBundle;
use crate::error::{Error, ErrorCategory};
use crate::http::{InvokerConfig, MockTransport, SystemInvoker};
use crate::types::StepStatus;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn bundle(pipelines: Value) -> ConfigBundle {
    ConfigBundle::from_json_str(
        &json!({
            "systems": [{"code": "rater", "baseUrl": "https://rater.example.com/api", "format": "json"}],
            "lookups": {"state-territory": {"CA": "T1"}},
            "pipelines": pipelines,
        })
        .to_string(),
    )
    .unwrap()
}

fn executor(pipelines: Value, transport: Arc<MockTransport>) -> PipelineExecutor {
    let invoker = SystemInvoker::new(transport, InvokerConfig::default());
    PipelineExecutor::from_bundle(bundle(pipelines), invoker)
}

fn step(order: i32, step_type: &str, config: Value) -> Value {
    json!({"stepOrder": order, "stepType": step_type, "config": config})
}

fn quote_pipeline() -> Value {
    json!([{
        "id": "gl-quote",
        "routingRules": [{"productLine": "GL", "sourceSystem": "gw"}],
        "mappings": [
            {"id": "req", "direction": "request", "fieldMappings": [
                {"sourcePath": "quoteNumber", "targetPath": "policy.id", "transformationType": "direct"},
                {"sourcePath": "premium", "targetPath": "rating.total", "transformationType": "number"}
            ]},
            {"id": "resp", "direction": "response", "fieldMappings": [
                {"sourcePath": "premium", "targetPath": "quote.premium", "transformationType": "number"}
            ]}
        ],
        "rules": [
            {"name": "high-value", "scope": "request",
             "conditions": [{"fieldPath": "rating.total", "operator": ">", "value": 1000}],
             "actions": [{"actionType": "set", "targetField": "rating.tier", "value": "high"}]},
            {"name": "surcharge", "scope": "response",
             "conditions": [{"fieldPath": "status", "operator": "equals", "value": "ok"}],
             "actions": [{"actionType": "multiply", "targetField": "premium", "value": 2}]}
        ],
        "steps": [
            step(1, "map_request", Value::Null),
            step(2, "apply_rules", Value::Null),
            step(3, "call_system", json!({"system": "rater", "path": "rate"})),
            step(4, "apply_response_rules", Value::Null),
            step(5, "map_response", Value::Null),
            step(6, "enrich", json!({"lookups": [
                {"sourceField": "state", "tableKey": "state-territory", "targetField": "territory"}
            ]}))
        ]
    }])
}

fn quote_input() -> Value {
    json!({"quoteNumber": "Q-1", "premium": "1200.50", "state": "CA"})
}

#[tokio::test]
async fn test_full_quote_flow() {
    let transport = Arc::new(MockTransport::new().respond_json(200, &json!({"premium": 950, "status": "ok"})));
    let executor = executor(quote_pipeline(), transport.clone());

    let result = executor.execute("gl-quote", quote_input()).await.unwrap();

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(
        result.output,
        json!({
            "premium": "1200.50",
            "quoteNumber": "Q-1",
            "state": "CA",
            "policy": {"id": "Q-1"},
            "rating": {"tier": "high", "total": 1200.5},
            "response": {"premium": 1900, "status": "ok"},
            "quote": {"premium": 1900},
            "territory": "T1"
        })
    );
    assert_eq!(result.input, quote_input());

    let kinds: Vec<&str> = result.steps.iter().map(|s| s.step_type.as_str()).collect();
    assert_eq!(
        kinds,
        vec!["map_request", "apply_rules", "call_system", "apply_response_rules", "map_response", "enrich"]
    );

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "https://rater.example.com/api/rate");
    assert_eq!(
        serde_json::from_str::<Value>(&sent[0].body).unwrap(),
        json!({
            "premium": "1200.50",
            "quoteNumber": "Q-1",
            "state": "CA",
            "policy": {"id": "Q-1"},
            "rating": {"tier": "high", "total": 1200.5}
        })
    );
}

#[tokio::test]
async fn test_failing_step_stops_the_pipeline() {
    let pipelines = json!([{
        "id": "p",
        "steps": [
            step(1, "mock_response", json!({"response": {"ok": true}})),
            step(2, "call_system", json!({"system": "unregistered"})),
            step(3, "enrich", json!({"lookups": [
                {"sourceField": "state", "tableKey": "state-territory", "targetField": "territory"}
            ]})),
            step(4, "validate", Value::Null)
        ]
    }]);
    let transport = Arc::new(MockTransport::new());
    let result = executor(pipelines, transport.clone())
        .execute("p", json!({"state": "CA"}))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.steps[0].status, StepStatus::Success);
    assert_eq!(result.steps[1].status, StepStatus::Failed);
    assert_eq!(result.failed_step().map(|s| s.step_order), Some(2));
    assert_eq!(result.error_category, Some(ErrorCategory::Configuration));
    assert!(result.error.unwrap().contains("External system not found: unregistered"));
    assert_eq!(result.output, json!({"state": "CA", "response": {"ok": true}}));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_inactive_steps_are_not_reported() {
    let mut skipped = step(2, "mock_response", json!({"response": 1}));
    skipped["isActive"] = json!(false);
    let pipelines = json!([{
        "id": "p",
        "steps": [step(3, "validate", json!({"schema": "acord-gl"})), skipped, step(1, "validate", Value::Null)]
    }]);

    let result = executor(pipelines, Arc::new(MockTransport::new()))
        .execute("p", json!({}))
        .await
        .unwrap();

    assert!(result.success);
    let orders: Vec<i32> = result.steps.iter().map(|s| s.step_order).collect();
    assert_eq!(orders, vec![1, 3]);
    assert_eq!(result.steps[1].details, json!({"schema": "acord-gl", "enforced": false}));
    assert_eq!(result.output, json!({}));
}

#[tokio::test]
async fn test_required_field_fails_map_step_and_keeps_context() {
    let pipelines = json!([{
        "id": "p",
        "mappings": [
            {"id": "first", "direction": "request", "fieldMappings": [
                {"sourcePath": "a", "targetPath": "mapped.a"}
            ]},
            {"id": "second", "direction": "request", "fieldMappings": [
                {"sourcePath": "missing", "targetPath": "mapped.b", "isRequired": true}
            ]}
        ],
        "steps": [step(1, "map_request", Value::Null), step(2, "validate", Value::Null)]
    }]);

    let result = executor(pipelines, Arc::new(MockTransport::new()))
        .execute("p", json!({"a": 1}))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.error_category, Some(ErrorCategory::Data));
    assert_eq!(result.output, json!({"a": 1}));
}

#[tokio::test]
async fn test_empty_mapping_is_noted_and_skipped() {
    let pipelines = json!([{
        "id": "p",
        "mappings": [{"id": "empty", "direction": "request", "fieldMappings": []}],
        "steps": [step(1, "transform", Value::Null)]
    }]);

    let result = executor(pipelines, Arc::new(MockTransport::new()))
        .execute("p", json!({"a": 1}))
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(
        result.steps[0].details,
        json!({"mappings": [{"mappingId": "empty", "skipped": "no field mappings"}]})
    );
}

#[tokio::test]
async fn test_enrich_records_misses_and_skips() {
    let pipelines = json!([{
        "id": "p",
        "steps": [step(1, "enrich", json!({"lookups": [
            {"sourceField": "state", "tableKey": "state-territory", "targetField": "territory"},
            {"sourceField": "county", "tableKey": "state-territory", "targetField": "countyCode"}
        ]}))]
    }]);

    let result = executor(pipelines, Arc::new(MockTransport::new()))
        .execute("p", json!({"state": "ZZ"}))
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.output, json!({"state": "ZZ"}));
    assert_eq!(
        result.steps[0].details,
        json!({"enriched": [], "skipped": ["county"], "misses": [{"table": "state-territory", "key": "ZZ"}]})
    );
}

#[tokio::test]
async fn test_enrich_from_unknown_table_fails() {
    let pipelines = json!([{
        "id": "p",
        "steps": [step(1, "enrich", json!({"lookups": [
            {"sourceField": "state", "tableKey": "nope", "targetField": "x"}
        ]}))]
    }]);

    let result = executor(pipelines, Arc::new(MockTransport::new()))
        .execute("p", json!({"state": "CA"}))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.error_category, Some(ErrorCategory::Configuration));
}

#[tokio::test]
async fn test_transport_failure_fails_call_step() {
    let transport = Arc::new(MockTransport::new().respond_json(500, &json!({"message": "rating engine down"})));
    let pipelines = json!([{
        "id": "p",
        "steps": [step(1, "call_system", json!({"system": "rater"})), step(2, "validate", Value::Null)]
    }]);

    let result = executor(pipelines, transport).execute("p", json!({})).await.unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.error_category, Some(ErrorCategory::Transport));
    assert!(result.steps[0].error.as_deref().unwrap_or_default().contains("rating engine down"));
}

#[tokio::test]
async fn test_call_timeout_fails_step_and_stops_pipeline() {
    let transport = Arc::new(
        MockTransport::new()
            .with_delay(std::time::Duration::from_millis(500))
            .respond_json(200, &json!({"premium": 1})),
    );
    let pipelines = json!([{
        "id": "p",
        "steps": [
            step(1, "call_system", json!({"system": "rater", "timeoutMs": 20})),
            step(2, "mock_response", json!({"response": {"premium": 2}}))
        ]
    }]);

    let result = executor(pipelines, transport.clone())
        .execute("p", json!({"state": "CA"}))
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.steps.len(), 1);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(result.error_category, Some(ErrorCategory::Transport));
    assert!(result.steps[0].error.as_deref().unwrap_or_default().contains("timed out"));
    assert_eq!(result.output, json!({"state": "CA"}));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_unsupported_step_fails_when_reached() {
    let pipelines = json!([{"id": "p", "steps": [step(1, "teleport", Value::Null)]}]);
    let result = executor(pipelines, Arc::new(MockTransport::new()))
        .execute("p", json!({}))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.steps[0].step_type, "teleport");
}

#[tokio::test]
async fn test_unknown_and_inactive_pipelines() {
    let pipelines = json!([{"id": "off", "isActive": false}]);
    let executor = executor(pipelines, Arc::new(MockTransport::new()));

    assert!(matches!(
        executor.execute("ghost", json!({})).await,
        Err(Error::PipelineNotFound { .. })
    ));
    assert!(matches!(
        executor.execute("off", json!({})).await,
        Err(Error::PipelineInactive { .. })
    ));
}

#[tokio::test]
async fn test_execute_routed() {
    let transport = Arc::new(MockTransport::new().respond_json(200, &json!({"premium": 100})));
    let executor = executor(quote_pipeline(), transport);

    let request = RouteRequest::new("gl", "GW");
    let selected = executor.route(&request).await.unwrap().unwrap();
    assert_eq!(selected, RouteMatch { pipeline_id: "gl-quote".into(), score: 15 });

    let result = executor.execute_routed(&request, quote_input()).await.unwrap();
    assert_eq!(result.pipeline_id, "gl-quote");

    let err = executor
        .execute_routed(&RouteRequest::new("WC", "gw"), json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RouteNotFound { .. }));
}
