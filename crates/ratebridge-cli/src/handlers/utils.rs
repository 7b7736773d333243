//! Shared utilities for command handlers

use crate::config::Config;
use crate::error::{Error, ErrorContext, Result};
use crate::output::OutputWriter;
use ratebridge_core::{CachedConfigProvider, ConfigBundle, ConfigProvider, PipelineExecutor, SystemInvoker};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Load the configuration bundle named on the command line or in settings
///
/// Bundle diagnostics are reported as warnings; they do not stop loading.
pub fn load_bundle(config: &Config, output: &mut OutputWriter) -> Result<ConfigBundle> {
    let path = config.bundle_path()?;
    if !path.exists() {
        return Err(Error::FileNotFound { path });
    }

    let bundle = ConfigBundle::from_file(&path)?;
    output.debug(&format!(
        "Loaded bundle {} ({} pipelines)",
        path.display(),
        bundle.pipeline_list().len()
    ))?;
    for diagnostic in bundle.diagnostics() {
        tracing::warn!(bundle = %path.display(), "{}", diagnostic);
        output.warning(&diagnostic)?;
    }
    Ok(bundle)
}

/// Read an input document, choosing JSON or YAML by extension
pub fn read_input(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let is_yaml = matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed: std::result::Result<Value, String> = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| Error::InvalidFormat {
        path: path.to_path_buf(),
        expected: if is_yaml { "YAML" } else { "JSON" }.to_string(),
        reason,
    })
}

/// Build an executor over `bundle`, honoring the cache and HTTP settings
pub fn build_executor(bundle: ConfigBundle, config: &Config) -> Result<PipelineExecutor> {
    let invoker = SystemInvoker::with_reqwest(config.http.clone())?;
    let bundle = Arc::new(bundle);

    let provider: Arc<dyn ConfigProvider> = if config.cache.enabled {
        Arc::new(CachedConfigProvider::new(bundle.clone(), &config.cache))
    } else {
        bundle.clone()
    };
    Ok(PipelineExecutor::new(provider, bundle, invoker))
}

/// Write a value as pretty JSON, or YAML when the file name asks for it
pub fn save_value(path: &Path, value: &Value) -> Result<()> {
    let content = match path.extension().and_then(|s| s.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::to_string(value)?,
        _ => serde_json::to_string_pretty(value)?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
