//! Route command handler

use super::utils::load_bundle;
use crate::cli::RouteArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::OutputWriter;
use ratebridge_core::pipeline::routing;
use ratebridge_core::{Error as CoreError, Pipeline, RouteMatch, RouteRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// One scored routing rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    pipeline_id: String,
    rule: usize,
    score: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteReport {
    request: RouteRequest,
    selected: Option<RouteMatch>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    candidates: Vec<Candidate>,
}

/// Handle the route command
#[instrument(skip(config, output))]
pub async fn handle_route(args: RouteArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let bundle = load_bundle(config, output)?;

    let mut request = RouteRequest::new(args.product_line.as_str(), args.source_system.as_str());
    if let Some(transaction_type) = &args.transaction_type {
        request = request.with_transaction_type(transaction_type.as_str());
    }

    let selected = routing::select(bundle.pipeline_list(), &request);
    let candidates = if args.all {
        score_candidates(bundle.pipeline_list(), &request)
    } else {
        Vec::new()
    };

    match &selected {
        Some(m) => output.success(&format!("✓ Routed to pipeline '{}' (score {})", m.pipeline_id, m.score))?,
        None => output.warning("No active pipeline matches this request")?,
    }

    if output.format() == crate::cli::OutputFormat::Human {
        if !candidates.is_empty() {
            output.section("Candidates")?;
            let rows = candidates
                .iter()
                .map(|c| {
                    vec![
                        c.pipeline_id.clone(),
                        c.rule.to_string(),
                        c.score.map_or_else(|| "no match".to_string(), |s| s.to_string()),
                    ]
                })
                .collect();
            output.table(&["Pipeline", "Rule", "Score"], rows)?;
        }
    } else {
        output.data(&RouteReport {
            request: request.clone(),
            selected: selected.clone(),
            candidates,
        })?;
    }

    match selected {
        Some(_) => Ok(()),
        None => Err(CoreError::RouteNotFound {
            product_line: request.product_line,
            source_system: request.source_system,
            transaction_type: request.transaction_type,
        }
        .into()),
    }
}

/// Score every active rule of every active pipeline, in bundle order
fn score_candidates(pipelines: &[Arc<Pipeline>], request: &RouteRequest) -> Vec<Candidate> {
    pipelines
        .iter()
        .filter(|p| p.is_active)
        .flat_map(|pipeline| {
            pipeline.active_routes().enumerate().map(move |(index, rule)| Candidate {
                pipeline_id: pipeline.id.clone(),
                rule: index + 1,
                score: routing::score(rule, request),
            })
        })
        .collect()
}
