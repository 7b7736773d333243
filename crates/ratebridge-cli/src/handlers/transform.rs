//! Transform command handler

use super::utils::{load_bundle, read_input, save_value};
use crate::cli::TransformArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use ratebridge_core::{CachedLookup, ConfigBundle, MappingResult, RequiredPolicy, TransformationEngine};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};

/// Handle the transform command
#[instrument(skip(config, output), fields(mapping = %args.mapping))]
pub async fn handle_transform(args: TransformArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let bundle = load_bundle(config, output)?;
    let input = read_input(&args.input)?;

    let policy = if args.continue_on_missing {
        RequiredPolicy::Continue
    } else {
        RequiredPolicy::Abort
    };
    let result = run_mapping(bundle, &args.mapping, &input, policy, config).await?;
    info!(
        success = result.success_count,
        defaulted = result.default_count,
        errors = result.error_count,
        "Mapping applied"
    );

    if let Some(path) = &args.save_to {
        save_value(path, &result.output)?;
        output.mapping_result(&MappingResult { output: Value::Null, ..result }, args.fields)?;
        output.success(&format!("✓ Output saved to {}", path.display()))?;
    } else {
        output.mapping_result(&result, args.fields)?;
    }
    Ok(())
}

/// Apply mapping `mapping_id` from `bundle` to `input`
async fn run_mapping(
    bundle: ConfigBundle,
    mapping_id: &str,
    input: &Value,
    policy: RequiredPolicy,
    config: &Config,
) -> Result<MappingResult> {
    let mapping = bundle
        .find_mapping(mapping_id)
        .cloned()
        .ok_or_else(|| Error::MappingNotFound {
            id: mapping_id.to_string(),
            available: bundle.mapping_ids().into_iter().map(str::to_string).collect(),
        })?;

    let bundle = Arc::new(bundle);
    let engine = if config.cache.enabled {
        TransformationEngine::new(Arc::new(CachedLookup::new(bundle, &config.cache)))
    } else {
        TransformationEngine::new(bundle)
    };
    Ok(engine.execute_mapping(&mapping, input, policy).await?)
}
