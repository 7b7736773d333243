//! RateBridge Core - configuration-driven mapping and pipeline engine
//!
//! This crate maps inbound policy and quote payloads between schemas, applies
//! business rules, calls external rating systems and maps their replies back,
//! all driven by configuration records rather than per-product code.
//!
//! # Main Components
//!
//! - **Path Accessor**: dot and JSONPath-style access into untyped records
//! - **Expression Evaluator**: a restricted arithmetic/boolean language
//! - **Transformation Engine**: per-field transformations with audit records
//! - **Rule Evaluator**: AND-combined conditions with ordered actions
//! - **Format Adapter**: JSON, XML and SOAP at system boundaries
//! - **Pipeline Executor**: fail-fast step sequencing and scored routing
//!
//! # Example
//!
//! ```no_run
//! use ratebridge_core::{ConfigBundle, InvokerConfig, PipelineExecutor, Result, SystemInvoker};
//! use serde_json::json;
//!
//! async fn example() -> Result<()> {
//!     let bundle = ConfigBundle::from_file("bundle.yaml")?;
//!     let invoker = SystemInvoker::with_reqwest(InvokerConfig::default())?;
//!     let executor = PipelineExecutor::from_bundle(bundle, invoker);
//!
//!     let result = executor.execute("gl-quote", json!({"quoteNumber": "Q-1"})).await?;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod expression;
pub mod format;
pub mod http;
pub mod lookup;
pub mod path;
pub mod pipeline;
pub mod rules;
pub mod transform;
pub mod types;

// Re-export main types for convenience
pub use error::{Error, ErrorCategory, Result};
pub use types::{ExecutionResult, FieldResult, FieldStatus, StepResult, StepStatus};

pub use config::{CacheConfig, CachedConfigProvider, ConfigBundle, ConfigProvider};
pub use expression::ExpressionError;
pub use format::WireFormat;
pub use http::{CallConfig, ExternalSystem, HttpError, InvokerConfig, SystemInvoker, SystemTransport};
pub use lookup::{CachedLookup, InMemoryLookup, LookupResolver};
pub use pipeline::{Pipeline, PipelineExecutor, PipelineStep, RouteMatch, RouteRequest, RoutingRule, StepKind};
pub use rules::{ConditionalRule, RuleEvaluator, RuleExecutionResult, RuleScope};
pub use transform::{
    FieldMapping, Mapping, MappingDirection, MappingResult, RequiredPolicy, Transformation,
    TransformationEngine, TransformationError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
