//! Validate command handler

use super::utils::load_bundle;
use crate::cli::{OutputFormat, ValidateArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use ratebridge_core::ConfigBundle;
use serde::Serialize;
use tracing::instrument;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PipelineSummary {
    id: String,
    name: String,
    active: bool,
    steps: Vec<String>,
    routes: usize,
    mappings: usize,
    rules: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemSummary {
    code: String,
    format: String,
    base_url: String,
    active: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TableSummary {
    name: String,
    entries: usize,
}

/// What a bundle contains, plus its cross-reference diagnostics
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BundleSummary {
    pipelines: Vec<PipelineSummary>,
    systems: Vec<SystemSummary>,
    lookup_tables: Vec<TableSummary>,
    mappings: Vec<String>,
    diagnostics: Vec<String>,
}

impl BundleSummary {
    fn from_bundle(bundle: &ConfigBundle) -> Self {
        let pipelines = bundle
            .pipeline_list()
            .iter()
            .map(|p| PipelineSummary {
                id: p.id.clone(),
                name: p.name.clone(),
                active: p.is_active,
                steps: p
                    .active_steps()
                    .iter()
                    .map(|s| format!("{}:{}", s.step_order, s.kind.type_name()))
                    .collect(),
                routes: p.active_routes().count(),
                mappings: p.mappings.len(),
                rules: p.rules.len(),
            })
            .collect();

        let mut systems: Vec<SystemSummary> = bundle
            .systems()
            .map(|s| SystemSummary {
                code: s.code.clone(),
                format: s.format.to_string(),
                base_url: s.base_url.clone(),
                active: s.is_active,
            })
            .collect();
        systems.sort_by(|a, b| a.code.cmp(&b.code));

        let mut lookup_tables: Vec<TableSummary> = bundle
            .lookups()
            .table_names()
            .map(|name| TableSummary {
                name: name.to_string(),
                entries: bundle.lookups().table_len(name).unwrap_or(0),
            })
            .collect();
        lookup_tables.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            pipelines,
            systems,
            lookup_tables,
            mappings: bundle.mapping_ids().into_iter().map(str::to_string).collect(),
            diagnostics: bundle.diagnostics(),
        }
    }
}

/// Handle the validate command
#[instrument(skip(config, output))]
pub async fn handle_validate(args: ValidateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let bundle = load_bundle(config, output)?;
    let summary = BundleSummary::from_bundle(&bundle);

    if output.format() == OutputFormat::Human {
        write_human(&summary, output)?;
    } else {
        output.data(&summary)?;
    }

    if summary.diagnostics.is_empty() {
        output.success("✓ Bundle is valid")?;
        Ok(())
    } else if args.strict {
        Err(Error::Diagnostics {
            count: summary.diagnostics.len(),
        })
    } else {
        output.warning(&format!(
            "Bundle loaded with {} diagnostic(s); use --strict to fail on them",
            summary.diagnostics.len()
        ))?;
        Ok(())
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}

fn write_human(summary: &BundleSummary, output: &mut OutputWriter) -> Result<()> {
    output.section("Pipelines")?;
    let rows = summary
        .pipelines
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                yes_no(p.active),
                p.steps.join(", "),
                p.routes.to_string(),
                p.mappings.to_string(),
                p.rules.to_string(),
            ]
        })
        .collect();
    output.table(&["Id", "Active", "Steps", "Routes", "Mappings", "Rules"], rows)?;

    if !summary.systems.is_empty() {
        output.section("External Systems")?;
        let rows = summary
            .systems
            .iter()
            .map(|s| vec![s.code.clone(), s.format.clone(), s.base_url.clone(), yes_no(s.active)])
            .collect();
        output.table(&["Code", "Format", "Base URL", "Active"], rows)?;
    }

    if !summary.lookup_tables.is_empty() {
        output.section("Lookup Tables")?;
        let rows = summary
            .lookup_tables
            .iter()
            .map(|t| vec![t.name.clone(), t.entries.to_string()])
            .collect();
        output.table(&["Table", "Entries"], rows)?;
    }

    // load_bundle already printed each diagnostic as a warning
    Ok(())
}
