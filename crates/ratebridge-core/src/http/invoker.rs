//! External-system invocation
//!
//! Serializes a context to the target system's wire format, performs the
//! outbound call through a [`SystemTransport`] and decodes the reply.
//!
//! Copyright (c) 2025 RateBridge Team
//! Licensed under the Apache-2.0 license

use super::error::HttpError;
use super::transport::{OutboundRequest, ReqwestTransport, SystemTransport};
use crate::error::{Error, Result};
use crate::format::{decode_response, WireFormat};
use crate::path;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

static ENV_PATTERN: OnceLock<Regex> = OnceLock::new();

fn default_true() -> bool {
    true
}

/// A registered external rating or policy system
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalSystem {
    pub code: String,
    #[serde(default)]
    pub name: Option<String>,
    pub base_url: String,
    #[serde(default)]
    pub format: WireFormat,
    /// Header values may reference environment variables as `${ENV:NAME}`
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl ExternalSystem {
    pub fn new(code: impl Into<String>, base_url: impl Into<String>, format: WireFormat) -> Self {
        Self {
            code: code.into(),
            name: None,
            base_url: base_url.into(),
            format,
            headers: HashMap::new(),
            is_active: true,
            timeout_ms: None,
        }
    }
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_operation() -> String {
    "Request".to_string()
}

/// Per-step outbound call settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallConfig {
    /// Code of the registered system to call
    #[serde(alias = "systemCode")]
    pub system: String,
    /// Appended to the system's base URL
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_method")]
    pub method: String,
    /// SOAP operation or XML root element
    #[serde(default = "default_operation")]
    pub operation: String,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Send only this sub-tree of the context
    #[serde(default)]
    pub payload_path: Option<String>,
}

impl CallConfig {
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            path: None,
            method: default_method(),
            operation: default_operation(),
            timeout_ms: None,
            headers: HashMap::new(),
            payload_path: None,
        }
    }
}

/// Timeouts and identity for outbound calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InvokerConfig {
    /// Total time allowed for one call, unless the step or system overrides it
    pub request_timeout_secs: u64,
    /// Time allowed to establish a connection
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("ratebridge/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl InvokerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::configuration("Request timeout cannot be zero"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(Error::configuration("Connect timeout cannot be zero"));
        }
        if self.connect_timeout_secs > self.request_timeout_secs {
            return Err(Error::configuration(
                "Connect timeout cannot exceed request timeout",
            ));
        }
        Ok(())
    }
}

/// Decoded reply of an outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationOutcome {
    pub response: Value,
    pub status: u16,
    pub url: String,
    pub duration_ms: u64,
}

/// Performs outbound calls to registered systems
#[derive(Clone)]
pub struct SystemInvoker {
    transport: Arc<dyn SystemTransport>,
    config: InvokerConfig,
}

impl std::fmt::Debug for SystemInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemInvoker").field("config", &self.config).finish()
    }
}

impl SystemInvoker {
    pub fn new(transport: Arc<dyn SystemTransport>, config: InvokerConfig) -> Self {
        Self { transport, config }
    }

    /// Invoker backed by a real HTTP client
    pub fn with_reqwest(config: InvokerConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Send `context` to `system` and decode the reply
    ///
    /// The context's `response` key is never part of the payload. Non-2xx
    /// replies, timeouts and connection failures are returned as
    /// [`Error::Http`].
    pub async fn invoke(
        &self,
        system: &ExternalSystem,
        call: &CallConfig,
        context: &Value,
    ) -> Result<InvocationOutcome> {
        if !system.is_active {
            return Err(Error::SystemInactive {
                code: system.code.clone(),
            });
        }

        let payload = outbound_payload(context, call.payload_path.as_deref());
        let body = system.format.encode(&payload, &call.operation)?;
        let url = join_url(&system.base_url, call.path.as_deref())?;
        let headers = build_headers(system, call)?;
        let timeout = call
            .timeout_ms
            .or(system.timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.request_timeout());

        let request = OutboundRequest {
            method: call.method.to_ascii_uppercase(),
            url: url.clone(),
            headers,
            body,
            timeout,
        };

        debug!(system = %system.code, url = %url, method = %request.method, "sending outbound request");
        let started = Instant::now();
        let sent = tokio::time::timeout(timeout, self.transport.send(request)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                warn!(system = %system.code, duration_ms, error = %err, "outbound request failed");
                return Err(err.into());
            }
            Err(_) => {
                warn!(system = %system.code, duration_ms, "outbound request timed out");
                return Err(HttpError::timeout(timeout).into());
            }
        };

        if !response.is_success() {
            let err = HttpError::from_status(response.status, &response.body, response.retry_after());
            warn!(system = %system.code, status = response.status, duration_ms, "external system rejected request");
            return Err(err.into());
        }

        let decoded = decode_response(&response.body, response.content_type(), system.format)?;
        info!(system = %system.code, status = response.status, duration_ms, "external system responded");

        Ok(InvocationOutcome {
            response: decoded,
            status: response.status,
            url,
            duration_ms,
        })
    }
}

fn outbound_payload(context: &Value, payload_path: Option<&str>) -> Value {
    let mut payload = match payload_path {
        Some(p) => path::get(context, p).cloned().unwrap_or(Value::Null),
        None => context.clone(),
    };
    if payload_path.is_none() {
        if let Value::Object(map) = &mut payload {
            map.remove("response");
        }
    }
    payload
}

/// Append `path` to `base`, keeping exactly one slash between them
fn join_url(base: &str, path: Option<&str>) -> Result<String> {
    let joined = match path.map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => format!("{}/{}", base.trim_end_matches('/'), p.trim_start_matches('/')),
        None => base.to_string(),
    };
    let url = Url::parse(&joined).map_err(|e| Error::Configuration {
        message: format!("Invalid system URL '{}': {}", joined, e),
        source: Some(e.into()),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url.to_string()),
        other => Err(Error::configuration(format!(
            "Unsupported URL scheme '{}' in '{}'",
            other, joined
        ))),
    }
}

fn build_headers(system: &ExternalSystem, call: &CallConfig) -> Result<BTreeMap<String, String>> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), system.format.content_type().to_string());
    headers.insert("Accept".to_string(), system.format.content_type().to_string());
    if system.format == WireFormat::Soap {
        headers.insert("SOAPAction".to_string(), format!("\"{}\"", call.operation));
    }
    // Step headers override system headers
    for (name, value) in system.headers.iter().chain(call.headers.iter()) {
        headers.insert(name.clone(), expand_env_vars(value)?);
    }
    Ok(headers)
}

/// Replace `${ENV:NAME}` references with environment variable values
pub fn expand_env_vars(value: &str) -> Result<String> {
    let re = ENV_PATTERN
        .get_or_init(|| Regex::new(r"\$\{ENV:([^}]+)\}").expect("Valid regex pattern"));

    let mut result = value.to_string();
    for cap in re.captures_iter(value) {
        let var_name = &cap[1];
        let env_value = std::env::var(var_name).map_err(|_| {
            Error::configuration(format!("Environment variable not found: {}", var_name))
        })?;
        result = result.replace(&cap[0], &env_value);
    }
    Ok(result)
}
