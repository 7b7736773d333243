//! Scored pipeline routing
//!
//! Every active routing rule of every active pipeline is scored against the
//! request: 10 for a matching product line, 5 for a matching source system,
//! 3 for a matching transaction type, plus the rule's own priority. A rule
//! criterion that contradicts a value the request specifies disqualifies the
//! rule. A criterion either side leaves unset adds nothing and disqualifies
//! nothing. Comparison ignores case.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::types::{Pipeline, RouteRequest, RoutingRule};
use serde::Serialize;
use std::ops::Deref;

const PRODUCT_LINE_SCORE: i32 = 10;
const SOURCE_SYSTEM_SCORE: i32 = 5;
const TRANSACTION_TYPE_SCORE: i32 = 3;

/// The selected pipeline and how it won
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMatch {
    pub pipeline_id: String,
    pub score: i32,
}

/// Score one rule, `None` when it contradicts the request
pub fn score(rule: &RoutingRule, request: &RouteRequest) -> Option<i32> {
    let mut total = rule.priority;
    for (expected, actual, weight) in [
        (&rule.product_line, &request.product_line, PRODUCT_LINE_SCORE),
        (&rule.source_system, &request.source_system, SOURCE_SYSTEM_SCORE),
        (&rule.transaction_type, &request.transaction_type, TRANSACTION_TYPE_SCORE),
    ] {
        let Some(expected) = expected.as_deref().filter(|e| !e.trim().is_empty()) else {
            continue;
        };
        match actual.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(actual) if actual.eq_ignore_ascii_case(expected.trim()) => total += weight,
            Some(_) => return None,
            None => {}
        }
    }
    Some(total)
}

/// Pick the best-scoring pipeline; the first of equal scores wins
pub fn select<P>(pipelines: &[P], request: &RouteRequest) -> Option<RouteMatch>
where
    P: Deref<Target = Pipeline>,
{
    let mut best: Option<RouteMatch> = None;
    for pipeline in pipelines.iter().filter(|p| p.is_active) {
        for rule in pipeline.active_routes() {
            let Some(candidate) = score(rule, request) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| candidate > b.score) {
                best = Some(RouteMatch {
                    pipeline_id: pipeline.id.clone(),
                    score: candidate,
                });
            }
        }
    }

    match &best {
        Some(m) => log::debug!("Routed {:?} to pipeline '{}' (score {})", request, m.pipeline_id, m.score),
        None => log::debug!("No pipeline routes {:?}", request),
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pipeline(id: &str, rule: RoutingRule) -> Arc<Pipeline> {
        Arc::new(Pipeline::new(id).with_route(rule))
    }

    #[test]
    fn test_more_specific_rule_wins() {
        let pipelines = vec![
            pipeline("gl-generic", RoutingRule::for_product_line("GL")),
            pipeline("gl-guidewire", RoutingRule::for_product_line("GL").source_system("gw")),
        ];
        let request = RouteRequest::new("GL", "gw").with_transaction_type("any");

        let selected = select(&pipelines, &request).unwrap();
        assert_eq!(selected.pipeline_id, "gl-guidewire");
        assert_eq!(selected.score, 15);
    }

    #[test]
    fn test_contradicting_rule_is_disqualified() {
        let pipelines = vec![pipeline("wc", RoutingRule::for_product_line("WC"))];
        assert_eq!(select(&pipelines, &RouteRequest::new("GL", "gw")), None);
    }

    #[test]
    fn test_ties_keep_first_match() {
        let pipelines = vec![
            pipeline("first", RoutingRule::for_product_line("GL")),
            pipeline("second", RoutingRule::for_product_line("gl")),
        ];
        let selected = select(&pipelines, &RouteRequest::new("GL", "x")).unwrap();
        assert_eq!(selected.pipeline_id, "first");
    }

    #[test]
    fn test_priority_breaks_specificity() {
        let pipelines = vec![
            pipeline("specific", RoutingRule::for_product_line("GL").source_system("gw")),
            pipeline("boosted", RoutingRule::for_product_line("GL").priority(6)),
        ];
        let selected = select(&pipelines, &RouteRequest::new("GL", "gw")).unwrap();
        assert_eq!(selected.pipeline_id, "boosted");
        assert_eq!(selected.score, 16);
    }

    #[test]
    fn test_inactive_pipelines_and_rules_are_ignored() {
        let mut inactive = Pipeline::new("off").with_route(RoutingRule::for_product_line("GL"));
        inactive.is_active = false;
        let mut rule = RoutingRule::for_product_line("GL");
        rule.is_active = false;
        let pipelines = vec![Arc::new(inactive), pipeline("rule-off", rule)];
        assert_eq!(select(&pipelines, &RouteRequest::new("GL", "gw")), None);
    }

    #[test]
    fn test_unspecified_request_criterion_does_not_disqualify() {
        let rule = RoutingRule::for_product_line("GL").transaction_type("renewal");
        assert_eq!(score(&rule, &RouteRequest::new("GL", "gw")), Some(10));
        assert_eq!(
            score(&rule, &RouteRequest::new("GL", "gw").with_transaction_type("RENEWAL")),
            Some(13)
        );
        assert_eq!(
            score(&rule, &RouteRequest::new("GL", "gw").with_transaction_type("new_business")),
            None
        );
    }

    #[test]
    fn test_fully_qualified_rule_routes_request_without_transaction_type() {
        let pipelines = vec![pipeline(
            "gl-gw-new",
            RoutingRule::for_product_line("GL")
                .source_system("gw")
                .transaction_type("new_business"),
        )];

        let selected = select(&pipelines, &RouteRequest::new("GL", "gw"));
        assert_eq!(selected.as_ref().map(|m| m.score), Some(15));
        assert_eq!(selected.map(|m| m.pipeline_id), Some("gl-gw-new".to_string()));
    }
}
