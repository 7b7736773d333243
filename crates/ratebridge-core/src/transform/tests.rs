//! Tests for the field transformation system
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::*;
use crate::error::Error;
use crate::lookup::InMemoryLookup;
use crate::types::FieldStatus;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;

fn engine() -> TransformationEngine {
    let lookups = InMemoryLookup::new().with_table(
        "state-territory",
        [("CA", json!("T-01")), ("NY", json!("T-02"))],
    );
    TransformationEngine::new(Arc::new(lookups))
}

fn field(kind: &str, config: Value) -> FieldMapping {
    serde_json::from_value(json!({
        "sourcePath": "value",
        "targetPath": "out",
        "transformationType": kind,
        "transformationConfig": config,
    }))
    .unwrap()
}

async fn run(kind: &str, config: Value, value: Value) -> crate::types::FieldResult {
    let source = json!({"value": value, "premium": 1000, "fee": 25, "first": "Ada", "last": "Lovelace"});
    engine().transform_field(&field(kind, config), &source, &source).await
}

async fn output(kind: &str, config: Value, value: Value) -> Value {
    let result = run(kind, config, value).await;
    assert_eq!(result.status, FieldStatus::Success, "error: {:?}", result.error);
    result.output_value.unwrap()
}

#[tokio::test]
async fn test_direct_passthrough() {
    assert_eq!(output("direct", json!({}), json!({"a": [1, 2]})).await, json!({"a": [1, 2]}));
}

#[tokio::test]
async fn test_string_normalization() {
    assert_eq!(output("uppercase", json!({}), json!("ca")).await, json!("CA"));
    assert_eq!(output("lowercase", json!({}), json!("CA")).await, json!("ca"));
    assert_eq!(output("trim", json!({}), json!("  x  ")).await, json!("x"));
    assert_eq!(output("string", json!({}), json!(12.5)).await, json!("12.5"));
}

#[tokio::test]
async fn test_split() {
    assert_eq!(output("split", json!({}), json!("a, b ,c")).await, json!("a"));
    assert_eq!(
        output("split", json!({"delimiter": "|", "index": 1}), json!("x| y |z")).await,
        json!("y")
    );
    assert_eq!(
        output("split", json!({"index": 9}), json!("a,b")).await,
        json!("a,b")
    );
    assert_eq!(
        output("split", json!({"index": -1}), json!("a,b")).await,
        json!("a,b")
    );
}

#[tokio::test]
async fn test_number_and_boolean_coercion() {
    assert_eq!(output("number", json!({}), json!("1200.50")).await, json!(1200.5));
    assert_eq!(output("boolean", json!({}), json!("yes")).await, json!(true));
    assert_eq!(output("boolean", json!({}), json!(0)).await, json!(false));

    let result = run("number", json!({}), json!("abc")).await;
    assert_eq!(result.status, FieldStatus::Error);
    assert!(result.error.unwrap().contains("Type conversion"));
}

#[tokio::test]
async fn test_static_ignores_source() {
    assert_eq!(
        output("static", json!({"value": "42", "dataType": "number"}), json!("ignored")).await,
        json!(42)
    );
    assert_eq!(output("static", json!({"value": "GL"}), json!(1)).await, json!("GL"));
}

#[tokio::test]
async fn test_date_formats() {
    let value = json!("2024-03-07");
    assert_eq!(output("date", json!({}), value.clone()).await, json!("2024-03-07"));
    assert_eq!(output("date", json!({"outputFormat": "MM/DD/YYYY"}), value.clone()).await, json!("03/07/2024"));
    assert_eq!(output("date", json!({"outputFormat": "DD/MM/YYYY"}), value.clone()).await, json!("07/03/2024"));
    assert_eq!(
        output("date", json!({"outputFormat": "timestamp"}), value.clone()).await,
        json!("2024-03-07T00:00:00.000Z")
    );
    assert_eq!(output("date", json!({"outputFormat": "epoch"}), value).await, json!("1709769600000"));

    let result = run("date", json!({}), json!("not a date")).await;
    assert_eq!(result.status, FieldStatus::Error);
}

#[tokio::test]
async fn test_concat_reads_context_fields() {
    assert_eq!(
        output("concat", json!({"fields": ["first", "last"]}), json!("x")).await,
        json!("Ada Lovelace")
    );
    assert_eq!(
        output("concat", json!({"fields": ["first", "missing", "last"], "separator": "-"}), json!(1)).await,
        json!("Ada--Lovelace")
    );
}

#[tokio::test]
async fn test_expression_and_custom() {
    assert_eq!(
        output("expression", json!({"expression": "value * 2 + fee"}), json!(100)).await,
        json!(225)
    );
    assert_eq!(
        output("custom", json!({"expression": "premium / 4"}), json!(0)).await,
        json!(250)
    );
}

#[tokio::test]
async fn test_unsafe_expression_is_a_field_error() {
    let result = run("expression", json!({"expression": "value; process.exit(1)"}), json!(1)).await;
    assert_eq!(result.status, FieldStatus::Error);
    assert!(result.error.unwrap().contains("Unsafe expression"));
}

#[tokio::test]
async fn test_conditional_branches() {
    let config = json!({"condition": "value > 500", "trueValue": "HIGH", "falseValue": "LOW"});
    assert_eq!(output("conditional", config.clone(), json!(900)).await, json!("HIGH"));
    assert_eq!(output("conditional", config, json!(100)).await, json!("LOW"));

    let no_false = json!({"condition": "value > 500", "trueValue": "HIGH"});
    assert_eq!(output("conditional", no_false, json!(100)).await, json!(100));
}

#[tokio::test]
async fn test_lookup_hit_and_fallbacks() {
    let config = json!({"tableKey": "state-territory"});
    assert_eq!(output("lookup", config.clone(), json!("CA")).await, json!("T-01"));
    assert_eq!(output("lookup", config, json!("ZZ")).await, json!("ZZ"));
    assert_eq!(
        output("lookup", json!({"tableKey": "state-territory", "notFoundValue": "UNKNOWN"}), json!("ZZ")).await,
        json!("UNKNOWN")
    );
}

#[tokio::test]
async fn test_lookup_in_unknown_table_fails_field() {
    let result = run("lookup", json!({"tableKey": "nope"}), json!("CA")).await;
    assert_eq!(result.status, FieldStatus::Error);
}

#[tokio::test]
async fn test_arithmetic_kinds() {
    assert_eq!(output("multiply", json!({"factor": 1.5}), json!("10")).await, json!(15));
    assert_eq!(output("divide", json!({"divisor": 4}), json!(10)).await, json!(2.5));
    assert_eq!(output("round", json!({}), json!(2.34567)).await, json!(2.35));
    assert_eq!(output("round", json!({"decimals": 0}), json!(2.5)).await, json!(3));
    assert_eq!(output("per_unit", json!({}), json!(250000)).await, json!(2500));
    assert_eq!(output("per_unit", json!({"unitSize": 1000}), json!(2500)).await, json!(2.5));
}

#[tokio::test]
async fn test_divide_by_zero_never_returns_infinity() {
    let result = run("divide", json!({"divisor": 0}), json!(10)).await;
    assert_eq!(result.status, FieldStatus::Error);
    assert!(result.output_value.is_none());
    assert!(result.error.unwrap().contains("Division by zero"));
}

#[tokio::test]
async fn test_unknown_kind_acts_as_direct() {
    assert_eq!(output("reverse_polish", json!({}), json!("abc")).await, json!("abc"));
}

#[test]
fn test_missing_required_config_fails_at_load() {
    let err = serde_json::from_value::<FieldMapping>(json!({
        "sourcePath": "a",
        "targetPath": "b",
        "transformationType": "lookup",
    }))
    .unwrap_err();
    assert!(err.to_string().contains("tableKey"));

    assert!(serde_json::from_value::<FieldMapping>(json!({
        "sourcePath": "a",
        "targetPath": "b",
        "transformationType": "expression",
        "transformationConfig": {"expression": "  "},
    }))
    .is_err());
}

#[tokio::test]
async fn test_missing_value_resolution() {
    let engine = engine();
    let source = json!({"present": 1, "nothing": null});

    let skipped = FieldMapping::new("absent", "x", Transformation::Direct);
    assert_eq!(engine.transform_field(&skipped, &source, &source).await.status, FieldStatus::Skipped);

    let defaulted = FieldMapping::new("nothing", "x", Transformation::Direct)
        .with_default(json!("7"))
        .with_data_type(DataType::Number);
    let result = engine.transform_field(&defaulted, &source, &source).await;
    assert_eq!(result.status, FieldStatus::Default);
    assert_eq!(result.output_value, Some(json!(7)));

    let required = FieldMapping::new("absent", "x", Transformation::Direct).required();
    let result = engine.transform_field(&required, &source, &source).await;
    assert_eq!(result.status, FieldStatus::Error);
    assert!(result.fatal);
}

#[tokio::test]
async fn test_failed_transformation_falls_back_to_default() {
    let engine = engine();
    let source = json!({"premium": "n/a"});
    let mapping = FieldMapping::new("premium", "total", Transformation::Number).with_default(json!(0));
    let result = engine.transform_field(&mapping, &source, &source).await;
    assert_eq!(result.status, FieldStatus::Default);
    assert_eq!(result.output_value, Some(json!(0)));
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_skip_behaviors() {
    let engine = engine();
    let source = json!({"a": 1});

    let excluded = FieldMapping::new("a", "b", Transformation::Direct)
        .with_default(json!(5))
        .skipped(SkipBehavior::Exclude);
    assert_eq!(engine.transform_field(&excluded, &source, &source).await.status, FieldStatus::Skipped);

    let use_default = FieldMapping::new("a", "b", Transformation::Direct)
        .with_default(json!(5))
        .skipped(SkipBehavior::UseDefault);
    let result = engine.transform_field(&use_default, &source, &source).await;
    assert_eq!(result.status, FieldStatus::Default);
    assert_eq!(result.output_value, Some(json!(5)));
}

#[tokio::test]
async fn test_execute_mapping_quote_scenario() {
    let mapping: Mapping = serde_json::from_value(json!({
        "id": "quote-request",
        "direction": "request",
        "fieldMappings": [
            {"sourcePath": "quoteNumber", "targetPath": "policy.id", "transformationType": "direct"},
            {"sourcePath": "premium", "targetPath": "rating.total", "transformationType": "number"},
            {"sourcePath": "agent", "targetPath": "policy.agent"}
        ]
    }))
    .unwrap();

    let source = json!({"quoteNumber": "Q-1", "premium": "1200.50"});
    let result = engine()
        .execute_mapping(&mapping, &source, RequiredPolicy::Abort)
        .await
        .unwrap();

    assert_eq!(result.output, json!({"policy": {"id": "Q-1"}, "rating": {"total": 1200.5}}));
    assert_eq!(result.success_count, 2);
    assert_eq!(result.skipped_count, 1);
    assert_eq!(result.fields.len(), 3);
}

#[tokio::test]
async fn test_required_policy() {
    let mapping = Mapping::new(
        "m",
        MappingDirection::Request,
        vec![
            FieldMapping::new("policyNumber", "id", Transformation::Direct).required(),
            FieldMapping::new("state", "state", Transformation::Uppercase),
        ],
    );
    let source = json!({"state": "ca"});

    let err = engine()
        .execute_mapping(&mapping, &source, RequiredPolicy::Abort)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RequiredField { ref path } if path == "policyNumber"));

    let result = engine()
        .execute_mapping(&mapping, &source, RequiredPolicy::Continue)
        .await
        .unwrap();
    assert_eq!(result.error_count, 1);
    assert_eq!(result.output, json!({"state": "CA"}));
}
