//! Run command handler

use super::utils::{build_executor, load_bundle, read_input, save_value};
use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use ratebridge_core::{ExecutionResult, PipelineExecutor, RouteRequest};
use serde_json::Value;
use tracing::{debug, info, instrument, Instrument};

/// Handle the run command
#[instrument(skip(config, output), fields(input = %args.input.display()))]
pub async fn handle_run(args: RunArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let timer = Timer::with_details("run_command", &format!("input: {}", args.input.display()));

    let bundle = load_bundle(config, output)?;
    let input = read_input(&args.input)?;
    debug!("Input document loaded");
    let executor = build_executor(bundle, config)?;

    match &args.pipeline {
        Some(pipeline_id) => output.info(&format!("Running pipeline '{}'", pipeline_id))?,
        None => output.info("Routing request to the best-matching pipeline")?,
    }

    let result = execute(&executor, &args, input).instrument(timer.span().clone()).await?;
    info!(
        pipeline_id = %result.pipeline_id,
        success = result.success,
        steps = result.steps.len(),
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "Pipeline run finished"
    );

    if let Some(path) = &args.save_to {
        save_value(path, &result.output)?;
        output.execution_result(&ExecutionResult { output: Value::Null, ..result.clone() }, args.steps)?;
        output.success(&format!("✓ Output saved to {}", path.display()))?;
    } else {
        output.execution_result(&result, args.steps)?;
    }

    if result.success {
        Ok(())
    } else {
        Err(Error::PipelineFailed {
            pipeline_id: result.pipeline_id.clone(),
            message: result.error.clone().unwrap_or_else(|| "step failed".to_string()),
        })
    }
}

async fn execute(executor: &PipelineExecutor, args: &RunArgs, input: Value) -> Result<ExecutionResult> {
    if let Some(pipeline_id) = &args.pipeline {
        return Ok(executor.execute(pipeline_id, input).await?);
    }

    let request = route_request(args)?;
    Ok(executor.execute_routed(&request, input).await?)
}

fn route_request(args: &RunArgs) -> Result<RouteRequest> {
    match (&args.product_line, &args.source_system) {
        (Some(product_line), Some(source_system)) => {
            let mut request = RouteRequest::new(product_line.as_str(), source_system.as_str());
            if let Some(transaction_type) = &args.transaction_type {
                request = request.with_transaction_type(transaction_type.as_str());
            }
            Ok(request)
        }
        _ => Err(Error::invalid_args(
            "either --pipeline or both --product-line and --source-system are required",
        )),
    }
}
