//! End-to-end pipeline tests driven by a YAML configuration bundle
//!
//! These tests load a bundle from disk, run pipelines through the public
//! API and replay external-system replies through the mock transport.

use pretty_assertions::assert_eq;
use ratebridge_core::http::{InboundResponse, MockTransport};
use ratebridge_core::{
    ConfigBundle, ErrorCategory, InvokerConfig, PipelineExecutor, RouteRequest, StepStatus, SystemInvoker,
};
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;

const BUNDLE: &str = r#"
systems:
  - code: legacy-rater
    name: Legacy SOAP rater
    baseUrl: http://rater.internal/services
    format: soap
    headers:
      X-Client: ratebridge

lookups:
  state-territory:
    CA: "T-01"
    NY: "T-02"
  class-codes:
    "91111": Contractor

pipelines:
  - id: gl-quote
    name: GL quote via legacy rater
    routingRules:
      - productLine: GL
      - productLine: GL
        sourceSystem: guidewire
        priority: 1
    mappings:
      - id: gl-request
        direction: request
        fieldMappings:
          - sourcePath: quote.number
            targetPath: rateRequest.quoteId
            transformationType: direct
            isRequired: true
          - sourcePath: quote.state
            targetPath: rateRequest.territory
            transformationType: lookup
            transformationConfig:
              tableKey: state-territory
          - sourcePath: quote.effective
            targetPath: rateRequest.effectiveDate
            transformationType: date
            transformationConfig:
              outputFormat: MM/DD/YYYY
          - sourcePath: quote.exposure
            targetPath: rateRequest.units
            transformationType: per_unit
            transformationConfig:
              unitSize: 1000
      - id: gl-response
        direction: response
        fieldMappings:
          - sourcePath: RateResponse.premium
            targetPath: result.premium
            transformationType: round
            transformationConfig:
              decimals: 2
          - sourcePath: RateResponse.status
            targetPath: result.status
            transformationType: uppercase
    rules:
      - name: minimum-premium
        scope: response
        conditions:
          - fieldPath: RateResponse.premium
            operator: "<"
            value: 500
        actions:
          - actionType: set
            targetField: RateResponse.premium
            value: 500
    steps:
      - stepOrder: 1
        stepType: validate
        config:
          schema: acord-gl-quote
      - stepOrder: 2
        stepType: transform
      - stepOrder: 3
        stepType: call_system
        config:
          system: legacy-rater
          path: /rating
          operation: RateRequest
          payloadPath: rateRequest
      - stepOrder: 4
        stepType: apply_response_rules
      - stepOrder: 5
        stepType: transform_response
      - stepOrder: 6
        stepType: enrich
        config:
          lookups:
            - sourceField: quote.classCode
              tableKey: class-codes
              targetField: result.classDescription

  - id: wc-demo
    routingRules:
      - productLine: WC
        transactionType: new_business
    steps:
      - stepOrder: 1
        stepType: mock_response
        config:
          response:
            premium: 1234
      - stepOrder: 2
        stepType: map_response
    mappings:
      - id: wc-response
        direction: response
        fieldMappings:
          - sourcePath: premium
            targetPath: premium
            transformationType: number
"#;

fn load_bundle() -> ConfigBundle {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().expect("temp file");
    file.write_all(BUNDLE.as_bytes()).expect("write bundle");
    ConfigBundle::from_file(file.path()).expect("bundle loads")
}

fn soap_reply(premium: &str) -> InboundResponse {
    let body = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
  <soap:Body>
    <RateResponse><premium>{}</premium><status>ok</status></RateResponse>
  </soap:Body>
</soap:Envelope>"#,
        premium
    );
    InboundResponse::new(200, "text/xml; charset=utf-8", body)
}

fn quote() -> Value {
    json!({
        "quote": {
            "number": "Q-1001",
            "state": "CA",
            "effective": "2025-03-01",
            "exposure": 250000,
            "classCode": "91111"
        }
    })
}

#[tokio::test]
async fn test_gl_quote_through_soap_rater() {
    let bundle = load_bundle();
    assert!(bundle.diagnostics().is_empty(), "{:?}", bundle.diagnostics());

    let transport = Arc::new(MockTransport::new().respond(soap_reply("812.456")));
    let executor = PipelineExecutor::from_bundle(bundle, SystemInvoker::new(transport.clone(), InvokerConfig::default()));

    let result = executor.execute("gl-quote", quote()).await.expect("pipeline runs");
    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.steps.len(), 6);
    assert!(result.steps.iter().all(|s| s.status == StepStatus::Success));

    assert_eq!(
        result.output["rateRequest"],
        json!({"quoteId": "Q-1001", "territory": "T-01", "effectiveDate": "03/01/2025", "units": 250})
    );
    assert_eq!(
        result.output["result"],
        json!({"premium": 812.46, "status": "OK", "classDescription": "Contractor"})
    );

    let sent = transport.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "http://rater.internal/services/rating");
    assert_eq!(sent[0].headers.get("X-Client").map(String::as_str), Some("ratebridge"));
    assert_eq!(sent[0].headers.get("SOAPAction").map(String::as_str), Some("\"RateRequest\""));
    assert!(sent[0].body.contains("<soapenv:Body><RateRequest>"));
    assert!(sent[0].body.contains("<effectiveDate>03/01/2025</effectiveDate>"));
    assert!(!sent[0].body.contains("<quote>"));
}

#[tokio::test]
async fn test_response_rules_apply_minimum_premium() {
    let transport = Arc::new(MockTransport::new().respond(soap_reply("120")));
    let executor = PipelineExecutor::from_bundle(load_bundle(), SystemInvoker::new(transport, InvokerConfig::default()));

    let result = executor.execute("gl-quote", quote()).await.expect("pipeline runs");
    assert!(result.success);
    assert_eq!(result.output["result"]["premium"], json!(500));
    assert_eq!(result.steps[3].details["appliedRules"][0]["name"], json!("minimum-premium"));
}

#[tokio::test]
async fn test_missing_required_quote_number_stops_at_transform() {
    let transport = Arc::new(MockTransport::new());
    let executor = PipelineExecutor::from_bundle(load_bundle(), SystemInvoker::new(transport.clone(), InvokerConfig::default()));

    let result = executor
        .execute("gl-quote", json!({"quote": {"state": "CA"}}))
        .await
        .expect("pipeline runs");

    assert!(!result.success);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.error_category, Some(ErrorCategory::Data));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_routing_selects_most_specific_pipeline() {
    let executor = PipelineExecutor::from_bundle(
        load_bundle(),
        SystemInvoker::new(Arc::new(MockTransport::new()), InvokerConfig::default()),
    );

    let selected = executor
        .route(&RouteRequest::new("GL", "guidewire"))
        .await
        .unwrap()
        .expect("route found");
    assert_eq!(selected.pipeline_id, "gl-quote");
    assert_eq!(selected.score, 16);

    let result = executor
        .execute_routed(
            &RouteRequest::new("WC", "portal").with_transaction_type("new_business"),
            json!({"insured": "Acme"}),
        )
        .await
        .expect("routed run");
    assert_eq!(result.pipeline_id, "wc-demo");
    assert_eq!(result.output, json!({"insured": "Acme", "premium": 1234, "response": {"premium": 1234}}));

    let unspecified = executor
        .route(&RouteRequest::new("WC", "portal"))
        .await
        .unwrap()
        .expect("transaction type left open still routes");
    assert_eq!(unspecified.pipeline_id, "wc-demo");
    assert_eq!(unspecified.score, 10);

    assert!(executor
        .route(&RouteRequest::new("WC", "portal").with_transaction_type("renewal"))
        .await
        .unwrap()
        .is_none());
}
